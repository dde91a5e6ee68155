use std::fmt;
use std::io;

use airtouch::conn::ConnectionError;
use airtouch::discovery::DiscoveryError;
use airtouch::frame::FrameError;
use airtouch::message::EncodeError;

// Exit codes; 64 and up follow sysexits/coreutils where one fits.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn connection_error(context: &str, err: ConnectionError) -> CliError {
    match err {
        ConnectionError::Connect { source, .. } => io_error(context, source),
        ConnectionError::ConnectTimeout { .. } | ConnectionError::NoResponse(_) => {
            CliError::new(TIMEOUT, format!("{context}: {err}"))
        }
        ConnectionError::Frame(err) => frame_error(context, err),
        ConnectionError::Encode(EncodeError::Unregistered(kind)) => CliError::new(
            USAGE,
            format!("{context}: {kind} is not supported by this console"),
        ),
        ConnectionError::Encode(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ConnectionError::NotConnected | ConnectionError::Shutdown => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

pub fn discovery_error(context: &str, err: DiscoveryError) -> CliError {
    match err {
        DiscoveryError::Bind { source, .. } | DiscoveryError::Io(source) => {
            io_error(context, source)
        }
        DiscoveryError::Resolve { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        DiscoveryError::Decode(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeouts_map_to_timeout_code() {
        let err = connection_error("connect failed", ConnectionError::NoResponse(Duration::from_secs(1)));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("connect failed: "));
    }

    #[test]
    fn refused_connection_is_a_failure() {
        let err = connection_error(
            "connect failed",
            ConnectionError::Connect {
                addr: "127.0.0.1:9005".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
        );
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn unresolvable_host_is_a_usage_error() {
        let err = discovery_error(
            "discovery failed",
            DiscoveryError::Resolve {
                host: "nowhere".into(),
                reason: "no IPv4 address".into(),
            },
        );
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn busy_discovery_port_is_a_transport_error() {
        let err = discovery_error(
            "discovery failed",
            DiscoveryError::Bind {
                addr: "0.0.0.0:49005".parse().unwrap(),
                source: io::Error::from(io::ErrorKind::AddrInUse),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
    }
}
