//! `tokio_util::codec` adapter over [`decode_frame`] / [`encode_frame`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::codec::{decode_frame, encode_frame, Frame};
use crate::error::FrameError;
use crate::format::FrameFormat;

/// Stream codec for console frames.
///
/// Frame-local failures (checksum mismatch, implausible length) are logged
/// and skipped; only I/O errors end the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    format: FrameFormat,
}

impl FrameCodec {
    pub fn new(format: FrameFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> &FrameFormat {
        &self.format
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            match decode_frame(src, &self.format) {
                Err(err) if err.is_frame_local() => {
                    warn!(error = ?err, "discarding corrupt frame");
                }
                other => return other,
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let frame = self.decode(src)?;
        if frame.is_none() && !src.is_empty() {
            debug!(remaining = src.len(), "discarding partial frame at end of stream");
            src.clear();
        }
        Ok(frame)
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        encode_frame(&item, &self.format, dst)
    }
}
