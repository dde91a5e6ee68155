use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::interfaces::broadcast_addresses;

/// Maximum number of request rounds before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Time spent collecting responses after each round of requests.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

const MAX_DATAGRAM: usize = 1024;

/// Searches the network for consoles speaking one discovery protocol.
#[derive(Debug, Clone)]
pub struct Discoverer<C> {
    config: C,
    remote_host: Option<Ipv4Addr>,
    local_address: Option<Ipv4Addr>,
    attempts: u32,
    interval: Duration,
}

impl<C: DiscoveryConfig> Discoverer<C> {
    /// Broadcast on every interface.
    pub fn new(config: C) -> Self {
        Self {
            config,
            remote_host: None,
            local_address: None,
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }

    /// Unicast requests to one host instead of broadcasting.
    pub fn with_remote_host(mut self, host: Ipv4Addr) -> Self {
        self.remote_host = Some(host);
        self
    }

    /// Bind to one local interface. Without a remote host, requests then go
    /// to `255.255.255.255`, which leaves through that interface.
    pub fn with_local_address(mut self, address: Ipv4Addr) -> Self {
        self.local_address = Some(address);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn destinations(&self) -> Result<Vec<Ipv4Addr>> {
        if let Some(host) = self.remote_host {
            return Ok(vec![host]);
        }
        if self.local_address.is_some() {
            return Ok(vec![Ipv4Addr::BROADCAST]);
        }
        Ok(broadcast_addresses()?)
    }

    /// Send requests and collect responses.
    ///
    /// Each round waits the full interval so several consoles can answer.
    /// Stops after the first round that produced a response. Returns
    /// distinct responses in arrival order; an empty result means nothing
    /// answered.
    pub async fn search(&self) -> Result<Vec<C::Response>> {
        let destinations = self.destinations()?;
        let local = SocketAddrV4::new(
            self.local_address.unwrap_or(Ipv4Addr::UNSPECIFIED),
            self.config.local_port(),
        );
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| DiscoveryError::Bind {
                addr: local,
                source,
            })?;
        socket.set_broadcast(true)?;
        debug!(%local, ?destinations, "starting discovery");

        let mut responses = Vec::new();
        let mut buf = [0u8; MAX_DATAGRAM];
        for attempt in 1..=self.attempts {
            for host in &destinations {
                let target = SocketAddrV4::new(*host, self.config.remote_port());
                trace!(%target, attempt, "sending discovery request");
                if let Err(err) = socket.send_to(self.config.request(), target).await {
                    warn!(%target, error = %err, "failed to send discovery request");
                }
            }

            let deadline = Instant::now() + self.interval;
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((len, from)) => self.collect(&buf[..len], from, &mut responses),
                        Err(err) => debug!(error = %err, "discovery receive failed"),
                    },
                }
            }

            if !responses.is_empty() {
                break;
            }
        }

        debug!(found = responses.len(), "discovery finished");
        Ok(responses)
    }

    fn collect(&self, datagram: &[u8], from: SocketAddr, responses: &mut Vec<C::Response>) {
        if !self.config.matches(datagram) {
            trace!(%from, len = datagram.len(), "ignoring unrelated datagram");
            return;
        }
        match self.config.decode(datagram) {
            Ok(response) => {
                if !responses.contains(&response) {
                    debug!(%from, ?response, "console responded");
                    responses.push(response);
                }
            }
            Err(err) => warn!(%from, error = %err, "failed to decode discovery response"),
        }
    }
}

/// Resolve a host name or dotted-quad string to an IPv4 address.
pub async fn resolve_host(host: &str) -> Result<Ipv4Addr> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|err| DiscoveryError::Resolve {
            host: host.to_owned(),
            reason: err.to_string(),
        })?;
    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| DiscoveryError::Resolve {
            host: host.to_owned(),
            reason: "no IPv4 address".to_owned(),
        })
}
