//! What to send when searching and how to read the answers.

use std::fmt;
use std::hash::Hash;
use std::net::Ipv4Addr;

use airtouch_frame::Generation;

use crate::error::{DiscoveryError, Result};

pub const AIRTOUCH4_DISCOVERY_PORT: u16 = 49004;
pub const AIRTOUCH5_DISCOVERY_PORT: u16 = 49005;

const AIRTOUCH4_REQUEST: &[u8] = b"HF-A11ASSISTHREAD";
const AIRTOUCH5_REQUEST: &[u8] = b"::REQUEST-POLYAIRE-AIRTOUCH-DEVICE-INFO:;";

/// A discovery protocol: the request datagram, the ports, and how to
/// recognise and decode responses.
pub trait DiscoveryConfig: Send + Sync {
    type Response: Clone + Eq + Hash + fmt::Debug + Send;

    fn request(&self) -> &[u8];

    /// Port the consoles listen on.
    fn remote_port(&self) -> u16;

    /// Port the discovery socket binds to; 0 picks any free port.
    fn local_port(&self) -> u16;

    /// Whether a datagram looks like a response. Non-matching datagrams,
    /// including our own looped-back broadcast, are ignored silently.
    fn matches(&self, datagram: &[u8]) -> bool;

    fn decode(&self, datagram: &[u8]) -> Result<Self::Response>;
}

/// A console that answered discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConsoleInfo {
    pub generation: Generation,
    pub host: Ipv4Addr,
    pub console_id: String,
    pub airtouch_id: String,
    pub name: String,
}

/// Discovery protocol for one console generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleDiscovery {
    generation: Generation,
    remote_port: u16,
    local_port: u16,
}

impl ConsoleDiscovery {
    /// Uses the generation's well-known port on both ends.
    pub fn new(generation: Generation) -> Self {
        let port = match generation {
            Generation::AirTouch4 => AIRTOUCH4_DISCOVERY_PORT,
            Generation::AirTouch5 => AIRTOUCH5_DISCOVERY_PORT,
        };
        Self {
            generation,
            remote_port: port,
            local_port: port,
        }
    }

    pub fn with_remote_port(mut self, port: u16) -> Self {
        self.remote_port = port;
        self
    }

    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = port;
        self
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    fn marker(&self) -> &'static str {
        match self.generation {
            Generation::AirTouch4 => "AirTouch4",
            Generation::AirTouch5 => "AirTouch5",
        }
    }

    fn field_count(&self) -> usize {
        match self.generation {
            Generation::AirTouch4 => 4,
            Generation::AirTouch5 => 5,
        }
    }
}

fn fields(datagram: &[u8]) -> Option<Vec<&str>> {
    let text = std::str::from_utf8(datagram).ok()?;
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    Some(text.split(',').map(str::trim).collect())
}

impl DiscoveryConfig for ConsoleDiscovery {
    type Response = ConsoleInfo;

    fn request(&self) -> &[u8] {
        match self.generation {
            Generation::AirTouch4 => AIRTOUCH4_REQUEST,
            Generation::AirTouch5 => AIRTOUCH5_REQUEST,
        }
    }

    fn remote_port(&self) -> u16 {
        self.remote_port
    }

    fn local_port(&self) -> u16 {
        self.local_port
    }

    fn matches(&self, datagram: &[u8]) -> bool {
        if datagram == self.request() {
            return false;
        }
        fields(datagram)
            .is_some_and(|f| f.len() == self.field_count() && f[2] == self.marker())
    }

    fn decode(&self, datagram: &[u8]) -> Result<ConsoleInfo> {
        let fields = fields(datagram)
            .filter(|f| f.len() == self.field_count())
            .ok_or_else(|| {
                DiscoveryError::Decode(String::from_utf8_lossy(datagram).into_owned())
            })?;
        let host = fields[0]
            .parse::<Ipv4Addr>()
            .map_err(|err| DiscoveryError::Decode(format!("bad console address {:?}: {err}", fields[0])))?;
        let name = match self.generation {
            Generation::AirTouch4 => "AirTouch 4".to_owned(),
            Generation::AirTouch5 => fields[4].to_owned(),
        };

        Ok(ConsoleInfo {
            generation: self.generation,
            host,
            console_id: fields[1].to_owned(),
            airtouch_id: fields[3].to_owned(),
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn airtouch5_response() {
        let config = ConsoleDiscovery::new(Generation::AirTouch5);
        let datagram = b"192.168.1.50,A1B2C3,AirTouch5,12345678,Living Room";
        assert!(config.matches(datagram));
        assert_eq!(
            config.decode(datagram).unwrap(),
            ConsoleInfo {
                generation: Generation::AirTouch5,
                host: Ipv4Addr::new(192, 168, 1, 50),
                console_id: "A1B2C3".into(),
                airtouch_id: "12345678".into(),
                name: "Living Room".into(),
            }
        );
    }

    #[test]
    fn airtouch4_response_gets_default_name() {
        let config = ConsoleDiscovery::new(Generation::AirTouch4);
        let datagram = b"10.0.0.7,dd:01,AirTouch4,2345\r\n";
        assert!(config.matches(datagram));
        let info = config.decode(datagram).unwrap();
        assert_eq!(info.host, Ipv4Addr::new(10, 0, 0, 7));
        assert_eq!(info.airtouch_id, "2345");
        assert_eq!(info.name, "AirTouch 4");
    }

    #[test]
    fn own_request_and_other_generation_are_ignored() {
        let at5 = ConsoleDiscovery::new(Generation::AirTouch5);
        assert!(!at5.matches(at5.request()));
        assert!(!at5.matches(b"10.0.0.7,dd:01,AirTouch4,2345"));
        assert!(!at5.matches(&[0xFF, 0xFE, 0x00]));

        let at4 = ConsoleDiscovery::new(Generation::AirTouch4);
        assert!(!at4.matches(b"192.168.1.50,A1B2C3,AirTouch5,12345678,Living Room"));
    }

    #[test]
    fn bad_address_is_a_decode_error() {
        let config = ConsoleDiscovery::new(Generation::AirTouch5);
        let err = config.decode(b"not-an-ip,A1,AirTouch5,1,Name").unwrap_err();
        assert!(matches!(err, DiscoveryError::Decode(_)));
    }

    #[test]
    fn well_known_ports() {
        assert_eq!(ConsoleDiscovery::new(Generation::AirTouch4).remote_port(), 49004);
        let config = ConsoleDiscovery::new(Generation::AirTouch5).with_local_port(0);
        assert_eq!(config.remote_port(), 49005);
        assert_eq!(config.local_port(), 0);
    }
}
