use bytes::Bytes;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The trailing CRC does not match the frame contents.
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    ChecksumMismatch {
        expected: u16,
        actual: u16,
        /// Raw (unstuffed) frame bytes following the sync marker.
        raw: Bytes,
    },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Frame-local errors only affect a single frame; the stream may continue.
    pub fn is_frame_local(&self) -> bool {
        !matches!(self, FrameError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
