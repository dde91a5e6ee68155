//! Console version (extended id `0xFF30`), shared by both generations.
//!
//! The request doubles as the connection heartbeat.

use bytes::{BufMut, BytesMut};

use crate::codec::MessageCodec;
use crate::encoding::{get_u8, take, truncate_utf8};
use crate::error::DecodeError;
use crate::header::ExtendedSubHeader;

pub const MESSAGE_ID: u16 = 0xFF30;

const VERSION_SEPARATOR: &str = "|";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleVersion {
    Request,
    Report {
        update_available: bool,
        versions: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleVersionCodec;

fn joined(versions: &[String]) -> String {
    let mut text = versions.join(VERSION_SEPARATOR);
    let len = truncate_utf8(&text, usize::from(u8::MAX)).len();
    text.truncate(len);
    text
}

impl MessageCodec<ExtendedSubHeader> for ConsoleVersionCodec {
    type Message = ConsoleVersion;

    fn layout(&self, message: &ConsoleVersion) -> usize {
        match message {
            ConsoleVersion::Request => 0,
            ConsoleVersion::Report { versions, .. } => 2 + joined(versions).len(),
        }
    }

    fn encode(&self, _header: &ExtendedSubHeader, message: &ConsoleVersion, dst: &mut BytesMut) {
        if let ConsoleVersion::Report {
            update_available,
            versions,
        } = message
        {
            let text = joined(versions);
            dst.put_u8(u8::from(*update_available));
            dst.put_u8(text.len() as u8);
            dst.put_slice(text.as_bytes());
        }
    }

    fn decode(
        &self,
        buf: &mut &[u8],
        header: &ExtendedSubHeader,
    ) -> Result<ConsoleVersion, DecodeError> {
        if header.message_length == 0 {
            return Ok(ConsoleVersion::Request);
        }
        let update_available = get_u8(buf)? != 0;
        let len = usize::from(get_u8(buf)?);
        let text = std::str::from_utf8(take(buf, len)?).map_err(|_| DecodeError::InvalidText {
            message_id: MESSAGE_ID,
        })?;
        let versions = text
            .split(VERSION_SEPARATOR)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
            .collect();
        Ok(ConsoleVersion::Report {
            update_available,
            versions,
        })
    }
}
