//! AC error information (AirTouch 5, extended id `0xFF10`).

use bytes::{BufMut, BytesMut};

use crate::codec::MessageCodec;
use crate::encoding::{get_u8, take, truncate_utf8};
use crate::error::DecodeError;
use crate::header::ExtendedSubHeader;

pub const MESSAGE_ID: u16 = 0xFF10;

/// Request or report of the last error on one AC unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcErrorInformation {
    Request {
        ac_number: u8,
    },
    Report {
        ac_number: u8,
        /// `None` when the unit has no error.
        error_info: Option<String>,
    },
}

impl AcErrorInformation {
    pub fn ac_number(&self) -> u8 {
        match self {
            AcErrorInformation::Request { ac_number }
            | AcErrorInformation::Report { ac_number, .. } => *ac_number,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcErrorInformationCodec;

fn error_text(info: &Option<String>) -> &str {
    truncate_utf8(info.as_deref().unwrap_or_default(), usize::from(u8::MAX))
}

impl MessageCodec<ExtendedSubHeader> for AcErrorInformationCodec {
    type Message = AcErrorInformation;

    fn layout(&self, message: &AcErrorInformation) -> usize {
        match message {
            AcErrorInformation::Request { .. } => 1,
            AcErrorInformation::Report { error_info, .. } => 2 + error_text(error_info).len(),
        }
    }

    fn encode(&self, _header: &ExtendedSubHeader, message: &AcErrorInformation, dst: &mut BytesMut) {
        dst.put_u8(message.ac_number());
        if let AcErrorInformation::Report { error_info, .. } = message {
            let text = error_text(error_info);
            dst.put_u8(text.len() as u8);
            dst.put_slice(text.as_bytes());
        }
    }

    fn decode(
        &self,
        buf: &mut &[u8],
        header: &ExtendedSubHeader,
    ) -> Result<AcErrorInformation, DecodeError> {
        let ac_number = get_u8(buf)?;
        if header.message_length == 1 {
            return Ok(AcErrorInformation::Request { ac_number });
        }

        let len = usize::from(get_u8(buf)?);
        let text = std::str::from_utf8(take(buf, len)?)
            .map_err(|_| DecodeError::InvalidText {
                message_id: MESSAGE_ID,
            })?;
        Ok(AcErrorInformation::Report {
            ac_number,
            error_info: (!text.is_empty()).then(|| text.to_owned()),
        })
    }
}
