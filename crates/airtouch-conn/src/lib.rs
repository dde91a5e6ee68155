//! Managed TCP connections to AirTouch consoles.
//!
//! A [`Connection`] owns the socket to one console. It frames and encodes
//! outgoing messages, decodes incoming ones and hands them to subscribed
//! handlers in arrival order. A heartbeat keeps the session alive; when the
//! console goes quiet or the socket drops, the connection reopens it with
//! exponential backoff and tells subscribers if it gives up.

pub mod config;
pub mod connection;
pub mod connector;
pub mod dispatch;
pub mod error;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionState};
pub use connector::{connect, connect_with_config, open_stream};
pub use dispatch::{ConnectionEvent, Subscription, SubscriptionId};
pub use error::{ConnectionError, Result};
