//! Find AirTouch consoles on the local network.
//!
//! Consoles answer a fixed UDP request with a comma-separated description
//! of themselves. A [`Discoverer`] sends the request (broadcast or to one
//! host), collects the answers for a short interval and returns every
//! distinct console that replied.

pub mod config;
pub mod discoverer;
pub mod error;
pub mod interfaces;

pub use config::{
    ConsoleDiscovery, ConsoleInfo, DiscoveryConfig, AIRTOUCH4_DISCOVERY_PORT,
    AIRTOUCH5_DISCOVERY_PORT,
};
pub use discoverer::{resolve_host, Discoverer, DEFAULT_ATTEMPTS, DEFAULT_INTERVAL};
pub use error::{DiscoveryError, Result};
pub use interfaces::{broadcast_address, broadcast_addresses};
