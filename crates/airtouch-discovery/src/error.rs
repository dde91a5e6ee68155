use std::net::SocketAddrV4;

/// Errors that can occur during console discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Failed to bind the discovery socket.
    #[error("failed to bind discovery socket to {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        source: std::io::Error,
    },

    /// A host name did not resolve to an IPv4 address.
    #[error("failed to resolve {host}: {reason}")]
    Resolve { host: String, reason: String },

    /// A discovery response matched but could not be decoded.
    #[error("invalid discovery response: {0}")]
    Decode(String),

    /// An I/O error occurred on the discovery socket.
    #[error("discovery I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
