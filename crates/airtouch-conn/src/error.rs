use std::net::SocketAddr;
use std::time::Duration;

/// Errors that can occur in connection operations.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The TCP connection could not be opened.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Opening the TCP connection took longer than the connect timeout.
    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout { addr: SocketAddr, timeout: Duration },

    /// The console accepted the connection but never answered.
    #[error("no response from console within {0:?}")]
    NoResponse(Duration),

    /// There is no open socket to write to.
    #[error("not connected")]
    NotConnected,

    /// The connection was shut down and cannot be reused.
    #[error("connection has been shut down")]
    Shutdown,

    /// Frame-level error while writing.
    #[error("frame error: {0}")]
    Frame(#[from] airtouch_frame::FrameError),

    /// The message could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] airtouch_message::EncodeError),
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
