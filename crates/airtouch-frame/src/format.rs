//! Console generations and their outer frame formats.
//!
//! Both generations share the same envelope layout and differ only in the
//! sync marker and in whether byte stuffing is applied after it.

use std::fmt;

/// Extended message category (one 16-bit identified sub-message).
pub const EXTENDED: u8 = 0x1F;

/// AirTouch 5 control/status category (fixed prefix + repeated records).
pub const CONTROL_STATUS: u8 = 0xC0;

/// AirTouch 4 control command category.
pub const AT4_CONTROL: u8 = 0x2C;

/// AirTouch 4 status category.
pub const AT4_STATUS: u8 = 0x2D;

/// Address used for requests in standard categories.
pub const ADDRESS_REQUEST: u16 = 0x80B0;

/// Address used for requests in the extended category.
pub const ADDRESS_EXTENDED_REQUEST: u16 = 0x90B0;

/// Address the console uses when answering standard requests.
pub const ADDRESS_RESPONSE: u16 = 0xB080;

/// Address the console uses when answering extended requests.
pub const ADDRESS_EXTENDED_RESPONSE: u16 = 0xB090;

/// Default maximum payload size. Console messages are small; anything
/// larger is a corrupt length field.
pub const DEFAULT_MAX_PAYLOAD: usize = 4 * 1024;

/// Returns the request address for an outer category.
pub fn request_address(category: u8) -> u16 {
    if category == EXTENDED {
        ADDRESS_EXTENDED_REQUEST
    } else {
        ADDRESS_REQUEST
    }
}

/// Returns a human-readable name for an outer category.
pub fn category_name(category: u8) -> &'static str {
    match category {
        EXTENDED => "EXTENDED",
        CONTROL_STATUS => "CONTROL_STATUS",
        AT4_CONTROL => "CONTROL",
        AT4_STATUS => "STATUS",
        _ => "UNKNOWN",
    }
}

/// Console hardware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    AirTouch4,
    AirTouch5,
}

impl Generation {
    /// All supported generations.
    pub const ALL: [Generation; 2] = [Generation::AirTouch4, Generation::AirTouch5];

    /// Outer frame format spoken by this generation.
    pub fn format(self) -> FrameFormat {
        match self {
            Generation::AirTouch4 => FrameFormat::AIRTOUCH4,
            Generation::AirTouch5 => FrameFormat::AIRTOUCH5,
        }
    }

    /// TCP port the console listens on.
    pub fn default_port(self) -> u16 {
        match self {
            Generation::AirTouch4 => 9004,
            Generation::AirTouch5 => 9005,
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::AirTouch4 => f.write_str("AirTouch4"),
            Generation::AirTouch5 => f.write_str("AirTouch5"),
        }
    }
}

/// Describes the sync marker and stuffing rules of one wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    /// Sync marker preceding every frame.
    pub sync: &'static [u8],
    /// Insert `0x00` after every run of three `0x55` bytes following the sync marker.
    pub stuffing: bool,
    /// Maximum accepted payload size in bytes.
    pub max_payload_size: usize,
}

impl FrameFormat {
    pub const AIRTOUCH4: FrameFormat = FrameFormat {
        sync: &[0x55, 0x55],
        stuffing: false,
        max_payload_size: DEFAULT_MAX_PAYLOAD,
    };

    pub const AIRTOUCH5: FrameFormat = FrameFormat {
        sync: &[0x55, 0x55, 0x55, 0xAA],
        stuffing: true,
        max_payload_size: DEFAULT_MAX_PAYLOAD,
    };

    /// Override the maximum payload size.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self::AIRTOUCH5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_requests_use_extended_address() {
        assert_eq!(request_address(EXTENDED), ADDRESS_EXTENDED_REQUEST);
        assert_eq!(request_address(CONTROL_STATUS), ADDRESS_REQUEST);
        assert_eq!(request_address(AT4_CONTROL), ADDRESS_REQUEST);
    }

    #[test]
    fn generation_formats() {
        assert_eq!(Generation::AirTouch4.format().sync, &[0x55, 0x55]);
        assert!(!Generation::AirTouch4.format().stuffing);
        assert_eq!(Generation::AirTouch5.format().sync, &[0x55, 0x55, 0x55, 0xAA]);
        assert!(Generation::AirTouch5.format().stuffing);
        assert_eq!(Generation::AirTouch4.default_port(), 9004);
        assert_eq!(Generation::AirTouch5.default_port(), 9005);
    }

    #[test]
    fn names() {
        assert_eq!(category_name(EXTENDED), "EXTENDED");
        assert_eq!(category_name(0x42), "UNKNOWN");
        assert_eq!(Generation::AirTouch5.to_string(), "AirTouch5");
    }
}
