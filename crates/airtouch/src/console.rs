use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use airtouch_conn::{Connection, ConnectionConfig, ConnectionError};
use airtouch_discovery::{
    resolve_host, ConsoleDiscovery, ConsoleInfo, Discoverer, DiscoveryError,
};
use airtouch_frame::Generation;
use airtouch_message::{GroupNames, GroupSelector, Message, ZoneStatus};
use tracing::{info, warn};

/// Search for consoles of both generations at once.
///
/// With `host`, requests go only to that host; otherwise they are broadcast.
/// A generation whose search fails is logged and skipped; the error is
/// returned only if every search failed.
pub async fn discover(host: Option<&str>) -> Result<Vec<Console>, DiscoveryError> {
    let remote = match host {
        Some(host) => Some(resolve_host(host).await?),
        None => None,
    };
    let (at4, at5) = tokio::join!(
        search(ConsoleDiscovery::new(Generation::AirTouch4), remote),
        search(ConsoleDiscovery::new(Generation::AirTouch5), remote),
    );

    let mut consoles = Vec::new();
    let mut failures = Vec::new();
    for (generation, result) in [(Generation::AirTouch4, at4), (Generation::AirTouch5, at5)] {
        match result {
            Ok(found) => consoles.extend(found.into_iter().map(Console::from_info)),
            Err(err) => {
                warn!(%generation, error = %err, "console discovery failed");
                failures.push(err);
            }
        }
    }
    if failures.len() == Generation::ALL.len() {
        if let Some(err) = failures.pop() {
            return Err(err);
        }
    }
    Ok(consoles)
}

/// Search for consoles of one generation with an explicit discovery
/// protocol (ports included).
pub async fn discover_generation(
    config: ConsoleDiscovery,
    host: Option<Ipv4Addr>,
) -> Result<Vec<ConsoleInfo>, DiscoveryError> {
    search(config, host).await
}

async fn search(
    config: ConsoleDiscovery,
    host: Option<Ipv4Addr>,
) -> Result<Vec<ConsoleInfo>, DiscoveryError> {
    let discoverer = Discoverer::new(config);
    match host {
        Some(host) => discoverer.with_remote_host(host).search().await,
        None => discoverer.search().await,
    }
}

/// One console and its connection.
#[derive(Debug)]
pub struct Console {
    info: ConsoleInfo,
    connection: Connection,
}

impl Console {
    /// A discovered console, reached on its generation's default port.
    pub fn from_info(info: ConsoleInfo) -> Self {
        let port = info.generation.default_port();
        Self::new(info, port, ConnectionConfig::default())
    }

    pub fn new(info: ConsoleInfo, port: u16, config: ConnectionConfig) -> Self {
        let addr = SocketAddr::V4(SocketAddrV4::new(info.host, port));
        let connection = Connection::new(addr, info.generation, config);
        Self { info, connection }
    }

    /// A console at a known address that was not discovered.
    pub fn at(host: Ipv4Addr, generation: Generation, port: u16, config: ConnectionConfig) -> Self {
        let info = ConsoleInfo {
            generation,
            host,
            console_id: String::new(),
            airtouch_id: String::new(),
            name: host.to_string(),
        };
        Self::new(info, port, config)
    }

    pub fn info(&self) -> &ConsoleInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn host(&self) -> Ipv4Addr {
        self.info.host
    }

    pub fn generation(&self) -> Generation {
        self.info.generation
    }

    /// Send, subscribe and watch state through this.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Connect and request the console's initial state.
    pub async fn try_init(&self) -> Result<(), ConnectionError> {
        self.connection.connect().await?;
        for request in initial_requests(self.info.generation) {
            self.connection.send(&request).await?;
        }
        info!(name = %self.info.name, host = %self.info.host, "console initialised");
        Ok(())
    }

    /// Like [`Console::try_init`], logging the failure and returning
    /// whether the console is ready.
    pub async fn init(&self) -> bool {
        match self.try_init().await {
            Ok(()) => true,
            Err(err) => {
                warn!(name = %self.info.name, host = %self.info.host, error = %err, "console initialisation failed");
                false
            }
        }
    }

    pub async fn shutdown(&self) {
        self.connection.shutdown().await;
    }
}

fn initial_requests(generation: Generation) -> Vec<Message> {
    match generation {
        Generation::AirTouch4 => vec![GroupNames::Request(GroupSelector::All).into()],
        Generation::AirTouch5 => vec![ZoneStatus::Request.into()],
    }
}
