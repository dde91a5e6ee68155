//! Talk to Polyaire AirTouch 4 and AirTouch 5 air-conditioning consoles.
//!
//! Find consoles with [`discover`], then [`Console::init`] to connect and
//! request their initial state. Decoded messages reach handlers registered
//! through [`Console::connection`].
//!
//! # Crate Structure
//!
//! - [`frame`]: link-layer framing and checksums
//! - [`message`]: typed messages, sub-headers and the codec registry
//! - [`conn`]: managed TCP connection with heartbeat and reconnect
//! - [`discovery`]: UDP discovery of consoles

mod console;

pub use console::{discover, discover_generation, Console};

/// Re-export frame types.
pub mod frame {
    pub use airtouch_frame::*;
}

/// Re-export message types.
pub mod message {
    pub use airtouch_message::*;
}

/// Re-export connection types.
pub mod conn {
    pub use airtouch_conn::*;
}

/// Re-export discovery types.
pub mod discovery {
    pub use airtouch_discovery::*;
}
