//! Sub-headers prefixed to every frame payload.
//!
//! Two layouts exist. Extended messages carry a 16-bit id and a body length;
//! control-status messages carry an 8-bit id and describe their body as an
//! optional fixed part followed by `repeat_count` records of `repeat_length`
//! bytes each.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::encoding::ensure;

/// A sub-header family.
pub trait SubHeader: Sized + fmt::Debug + Send + Sync + 'static {
    /// Body shape a codec reports for one message.
    type Layout: Copy + fmt::Debug;

    /// Encoded size of the sub-header itself.
    const SIZE: usize;

    /// Build the header for a message with the given id and body layout.
    fn for_message(message_id: u16, layout: Self::Layout) -> Result<Self, EncodeError>;

    fn message_id(&self) -> u16;

    /// Number of body bytes that follow the header.
    fn body_len(&self) -> usize;

    /// Body length described by `layout`.
    fn layout_len(layout: &Self::Layout) -> usize;

    fn encode(&self, dst: &mut BytesMut);

    /// Decode a header from the front of `buf`, leaving the cursor on the body.
    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError>;
}

/// Header of the extended (category `0x1F`) family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedSubHeader {
    pub message_id: u16,
    /// Body length, i.e. the frame payload length minus this header.
    pub message_length: usize,
}

impl SubHeader for ExtendedSubHeader {
    type Layout = usize;

    const SIZE: usize = 2;

    fn for_message(message_id: u16, layout: usize) -> Result<Self, EncodeError> {
        Ok(Self {
            message_id,
            message_length: layout,
        })
    }

    fn message_id(&self) -> u16 {
        self.message_id
    }

    fn body_len(&self) -> usize {
        self.message_length
    }

    fn layout_len(layout: &usize) -> usize {
        *layout
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16(self.message_id);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        ensure(buf, Self::SIZE)?;
        let message_id = buf.get_u16();
        Ok(Self {
            message_id,
            message_length: buf.len(),
        })
    }
}

/// Body shape of a control-status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepeatLayout {
    pub non_repeat_length: usize,
    pub repeat_length: usize,
    pub repeat_count: usize,
}

impl RepeatLayout {
    /// A body with no bytes at all, used by "request all" messages.
    pub const EMPTY: RepeatLayout = RepeatLayout {
        non_repeat_length: 0,
        repeat_length: 0,
        repeat_count: 0,
    };

    /// `count` records of `size` bytes each.
    pub fn records(size: usize, count: usize) -> Self {
        Self {
            non_repeat_length: 0,
            repeat_length: size,
            repeat_count: count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repeat_length == 0 && self.repeat_count == 0
    }

    pub fn len(&self) -> usize {
        self.non_repeat_length
            .saturating_add(self.repeat_length.saturating_mul(self.repeat_count))
    }
}

/// Header of the control-status (category `0xC0`) family.
///
/// Wire layout: `id(1) pad(1) non_repeat_length(2) repeat_length(2)
/// repeat_count(2)`, integers big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlStatusSubHeader {
    pub message_id: u8,
    pub layout: RepeatLayout,
}

fn fit_u16(field: &'static str, value: usize) -> Result<u16, EncodeError> {
    u16::try_from(value).map_err(|_| EncodeError::FieldOutOfRange { field, value })
}

impl SubHeader for ControlStatusSubHeader {
    type Layout = RepeatLayout;

    const SIZE: usize = 8;

    fn for_message(message_id: u16, layout: RepeatLayout) -> Result<Self, EncodeError> {
        let message_id = u8::try_from(message_id).map_err(|_| EncodeError::FieldOutOfRange {
            field: "message id",
            value: usize::from(message_id),
        })?;
        fit_u16("non-repeat length", layout.non_repeat_length)?;
        fit_u16("repeat length", layout.repeat_length)?;
        fit_u16("repeat count", layout.repeat_count)?;
        Ok(Self { message_id, layout })
    }

    fn message_id(&self) -> u16 {
        u16::from(self.message_id)
    }

    fn body_len(&self) -> usize {
        self.layout.len()
    }

    fn layout_len(layout: &RepeatLayout) -> usize {
        layout.len()
    }

    fn encode(&self, dst: &mut BytesMut) {
        // Lengths were range-checked in `for_message`.
        dst.put_u8(self.message_id);
        dst.put_u8(0);
        dst.put_u16(self.layout.non_repeat_length as u16);
        dst.put_u16(self.layout.repeat_length as u16);
        dst.put_u16(self.layout.repeat_count as u16);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self, DecodeError> {
        ensure(buf, Self::SIZE)?;
        let message_id = buf.get_u8();
        buf.advance(1);
        let layout = RepeatLayout {
            non_repeat_length: usize::from(buf.get_u16()),
            repeat_length: usize::from(buf.get_u16()),
            repeat_count: usize::from(buf.get_u16()),
        };
        Ok(Self { message_id, layout })
    }
}
