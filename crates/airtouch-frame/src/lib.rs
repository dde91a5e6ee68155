//! Outer link-layer framing for AirTouch consoles.
//!
//! Every console message travels inside an envelope of:
//! - A sync marker (`55 55` on AirTouch 4, `55 55 55 AA` on AirTouch 5)
//! - A 2-byte address, 1-byte sequence number and 1-byte category
//! - A 2-byte big-endian payload length
//! - A trailing CRC-16/MODBUS over everything after the sync marker
//!
//! Callers hand in a buffer and get complete, checksum-verified frames back.

pub mod codec;
pub mod error;
pub mod format;
#[cfg(feature = "async")]
pub mod framed;

pub use codec::{crc16, decode_frame, encode_frame, Frame, CHECKSUM_SIZE, ENVELOPE_SIZE};
pub use error::{FrameError, Result};
pub use format::{
    category_name, request_address, FrameFormat, Generation, ADDRESS_EXTENDED_REQUEST,
    ADDRESS_EXTENDED_RESPONSE, ADDRESS_REQUEST, ADDRESS_RESPONSE, AT4_CONTROL, AT4_STATUS,
    CONTROL_STATUS, DEFAULT_MAX_PAYLOAD, EXTENDED,
};
#[cfg(feature = "async")]
pub use framed::FrameCodec;
