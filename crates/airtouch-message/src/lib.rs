//! Typed AirTouch messages and the codecs that map them to frame payloads.
//!
//! A frame payload starts with a sub-header whose shape depends on the frame
//! category. The [`Registry`] picks the codec for a `(category, message id)`
//! pair and turns payloads into [`Message`] values and back.
//!
//! # Example
//!
//! ```
//! use airtouch_frame::Generation;
//! use airtouch_message::{Message, Registry};
//!
//! let registry = Registry::shared(Generation::AirTouch5);
//! let encoded = registry.encode(&Message::heartbeat()).unwrap();
//! let decoded = registry.decode(encoded.category, &encoded.payload).unwrap();
//! assert_eq!(decoded, Some(Message::heartbeat()));
//! ```

pub mod codec;
pub(crate) mod encoding;
pub mod error;
pub mod header;
pub mod message;
pub mod messages;
pub mod registry;

pub use codec::MessageCodec;
pub use error::{DecodeError, EncodeError, RegistryError, Result};
pub use header::{ControlStatusSubHeader, ExtendedSubHeader, RepeatLayout, SubHeader};
pub use message::{Message, MessageKind, Variant};
pub use messages::*;
pub use registry::{Encoded, Registry, RegistryBuilder};
