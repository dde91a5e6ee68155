use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{FrameError, Result};
use crate::format::{request_address, FrameFormat};

/// Envelope after the sync marker: address (2) + sequence (1) + category (1) + length (2).
pub const ENVELOPE_SIZE: usize = 6;

/// Trailing CRC-16 size.
pub const CHECKSUM_SIZE: usize = 2;

const STUFF_RUN: usize = 3;
const STUFF_BYTE: u8 = 0x55;

/// A framed console message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Source/destination address pair.
    pub address: u16,
    /// Sequence number echoed by the console in its reply.
    pub sequence: u8,
    /// Outer message category.
    pub category: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(address: u16, sequence: u8, category: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            sequence,
            category,
            payload: payload.into(),
        }
    }

    /// Create a request frame, picking the address from the category.
    pub fn request(sequence: u8, category: u8, payload: impl Into<Bytes>) -> Self {
        Self::new(request_address(category), sequence, category, payload)
    }

    /// CRC of this frame as it will appear on the wire.
    ///
    /// Fails if the payload length does not fit the 16-bit length field.
    pub fn checksum(&self) -> Result<u16> {
        let mut content = BytesMut::with_capacity(ENVELOPE_SIZE + self.payload.len());
        put_envelope(self, &mut content)?;
        Ok(crc16(&content))
    }
}

/// CRC-16/MODBUS (reflected poly 0xA001, init 0xFFFF).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Encode a frame into the wire format.
///
/// Wire format (multi-byte fields big-endian):
/// ```text
/// ┌──────────┬─────────┬──────────┬──────────┬──────────┬───────────┬─────────┐
/// │ Sync     │ Address │ Sequence │ Category │ Length   │ Payload   │ CRC16   │
/// │ (2B/4B)  │ (2B)    │ (1B)     │ (1B)     │ (2B)     │ (Length)  │ (2B)    │
/// └──────────┴─────────┴──────────┴──────────┴──────────┴───────────┴─────────┘
/// ```
/// The CRC covers address through payload. When the format uses stuffing,
/// everything after the sync marker is stuffed after the CRC is computed.
pub fn encode_frame(frame: &Frame, format: &FrameFormat, dst: &mut BytesMut) -> Result<()> {
    let max = format.max_payload_size.min(u16::MAX as usize);
    if frame.payload.len() > max {
        return Err(FrameError::PayloadTooLarge {
            size: frame.payload.len(),
            max,
        });
    }

    let mut content =
        BytesMut::with_capacity(ENVELOPE_SIZE + frame.payload.len() + CHECKSUM_SIZE);
    put_envelope(frame, &mut content)?;
    let crc = crc16(&content);
    content.put_u16(crc);

    dst.reserve(format.sync.len() + content.len() + content.len() / STUFF_RUN);
    dst.put_slice(format.sync);
    if format.stuffing {
        stuff(&content, dst);
    } else {
        dst.put_slice(&content);
    }
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// Bytes before the first sync marker are discarded. A corrupt frame consumes
/// only the first byte of its sync marker so the next call resumes scanning at
/// the next plausible sync point.
pub fn decode_frame(src: &mut BytesMut, format: &FrameFormat) -> Result<Option<Frame>> {
    let sync = format.sync;
    match find_sync(src, sync) {
        Some(0) => {}
        Some(offset) => {
            debug!(discarded = offset, "discarding bytes before sync marker");
            src.advance(offset);
        }
        None => {
            let keep = partial_sync_len(src, sync);
            let discard = src.len() - keep;
            if discard > 0 {
                debug!(discarded = discard, "discarding bytes without sync marker");
                src.advance(discard);
            }
            return Ok(None);
        }
    }

    let body = &src[sync.len()..];
    let Some((envelope, _)) = unstuff(body, ENVELOPE_SIZE, format.stuffing) else {
        return Ok(None); // Need more data
    };

    let payload_len = u16::from_be_bytes([envelope[4], envelope[5]]) as usize;
    if payload_len > format.max_payload_size {
        src.advance(1);
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: format.max_payload_size,
        });
    }

    let total = ENVELOPE_SIZE + payload_len + CHECKSUM_SIZE;
    let Some((content, consumed)) = unstuff(body, total, format.stuffing) else {
        return Ok(None); // Need more data
    };

    let expected = crc16(&content[..total - CHECKSUM_SIZE]);
    let actual = u16::from_be_bytes([content[total - 2], content[total - 1]]);
    if expected != actual {
        src.advance(1);
        return Err(FrameError::ChecksumMismatch {
            expected,
            actual,
            raw: content.freeze(),
        });
    }

    src.advance(sync.len() + consumed);

    let mut content = content.freeze();
    let address = content.get_u16();
    let sequence = content.get_u8();
    let category = content.get_u8();
    content.advance(2);
    let payload = content.split_to(payload_len);

    Ok(Some(Frame {
        address,
        sequence,
        category,
        payload,
    }))
}

fn put_envelope(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let len = u16::try_from(frame.payload.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: frame.payload.len(),
        max: u16::MAX as usize,
    })?;
    dst.put_u16(frame.address);
    dst.put_u8(frame.sequence);
    dst.put_u8(frame.category);
    dst.put_u16(len);
    dst.put_slice(&frame.payload);
    Ok(())
}

fn stuff(content: &[u8], dst: &mut BytesMut) {
    let mut run = 0usize;
    for &byte in content {
        dst.put_u8(byte);
        if byte == STUFF_BYTE {
            run += 1;
            if run == STUFF_RUN {
                dst.put_u8(0x00);
                run = 0;
            }
        } else {
            run = 0;
        }
    }
}

/// Collect `want` logical bytes from `raw`, removing stuffing.
///
/// Returns the bytes and the number of raw bytes consumed, or `None` when
/// `raw` does not hold enough data yet.
fn unstuff(raw: &[u8], want: usize, stuffing: bool) -> Option<(BytesMut, usize)> {
    if !stuffing {
        return (raw.len() >= want).then(|| (BytesMut::from(&raw[..want]), want));
    }

    let mut out = BytesMut::with_capacity(want);
    let mut run = 0usize;
    let mut pos = 0usize;
    while out.len() < want {
        let byte = *raw.get(pos)?;
        pos += 1;
        out.put_u8(byte);
        if byte != STUFF_BYTE {
            run = 0;
            continue;
        }
        run += 1;
        if run == STUFF_RUN {
            run = 0;
            // Tolerate a missing stuffing byte; the CRC decides.
            if *raw.get(pos)? == 0x00 {
                pos += 1;
            }
        }
    }
    Some((out, pos))
}

fn find_sync(src: &[u8], sync: &[u8]) -> Option<usize> {
    src.windows(sync.len()).position(|window| window == sync)
}

/// Length of the longest suffix of `src` that is a proper prefix of `sync`.
fn partial_sync_len(src: &[u8], sync: &[u8]) -> usize {
    (1..sync.len())
        .rev()
        .find(|&len| src.len() >= len && src[src.len() - len..] == sync[..len])
        .unwrap_or(0)
}
