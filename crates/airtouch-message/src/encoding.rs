//! Field helpers shared by the message codecs.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::DecodeError;

const TEMPERATURE_SCALE: f64 = 10.0;
/// Raw offset of a measured zone temperature.
const TEMPERATURE_OFFSET: f64 = 500.0;
/// Raw offset of a zone set point (subtracted).
const SET_POINT_OFFSET: f64 = 100.0;

/// Fail with `Truncated` unless `buf` holds at least `needed` bytes.
pub(crate) fn ensure(buf: &[u8], needed: usize) -> Result<(), DecodeError> {
    if buf.len() < needed {
        return Err(DecodeError::Truncated {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

pub(crate) fn get_u8(buf: &mut &[u8]) -> Result<u8, DecodeError> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

/// Split `len` bytes off the front of `buf`.
pub(crate) fn take<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    ensure(buf, len)?;
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

#[inline]
pub(crate) fn bit(byte: u8, index: u8) -> bool {
    byte & (1 << index) != 0
}

#[inline]
pub(crate) fn flag(value: bool, index: u8) -> u8 {
    u8::from(value) << index
}

/// Longest prefix of `value` that fits in `max` bytes without splitting a char.
pub(crate) fn truncate_utf8(value: &str, max: usize) -> &str {
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

/// Write `value` as a NUL-padded field of exactly `width` bytes.
pub(crate) fn put_padded_str(value: &str, width: usize, dst: &mut BytesMut) {
    let value = truncate_utf8(value, width);
    dst.put_slice(value.as_bytes());
    dst.put_bytes(0, width - value.len());
}

/// Read a NUL-padded field, stopping at the first NUL.
pub(crate) fn padded_str(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

pub(crate) fn decode_temperature(raw: u16) -> f64 {
    (f64::from(raw) - TEMPERATURE_OFFSET) / TEMPERATURE_SCALE
}

pub(crate) fn encode_temperature(celsius: f64) -> u16 {
    (celsius * TEMPERATURE_SCALE + TEMPERATURE_OFFSET)
        .round()
        .clamp(0.0, f64::from(u16::MAX)) as u16
}

pub(crate) fn decode_set_point(raw: u8) -> f64 {
    (f64::from(raw) + SET_POINT_OFFSET) / TEMPERATURE_SCALE
}

/// `0xFF` is reserved for "no set point", so encoded values stop at `0xFE`.
pub(crate) fn encode_set_point(celsius: f64) -> u8 {
    (celsius * TEMPERATURE_SCALE - SET_POINT_OFFSET)
        .round()
        .clamp(0.0, 254.0) as u8
}
