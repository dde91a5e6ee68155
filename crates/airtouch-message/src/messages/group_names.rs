//! Group names (AirTouch 4, extended id `0xFF12`).

use std::collections::BTreeMap;

use bytes::{BufMut, BytesMut};

use crate::codec::MessageCodec;
use crate::encoding::{padded_str, put_padded_str, take};
use crate::error::DecodeError;
use crate::header::ExtendedSubHeader;

pub const MESSAGE_ID: u16 = 0xFF12;

/// Width of a NUL-padded name field.
pub const GROUP_NAME_LENGTH: usize = 8;
const RECORD_SIZE: usize = 1 + GROUP_NAME_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupSelector {
    All,
    Group(u8),
}

/// Group names request or report.
///
/// Report names longer than [`GROUP_NAME_LENGTH`] bytes are truncated on
/// encode. An empty report encodes the same as `Request(GroupSelector::All)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupNames {
    Request(GroupSelector),
    Report(BTreeMap<u8, String>),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupNamesCodec;

impl MessageCodec<ExtendedSubHeader> for GroupNamesCodec {
    type Message = GroupNames;

    fn layout(&self, message: &GroupNames) -> usize {
        match message {
            GroupNames::Request(GroupSelector::All) => 0,
            GroupNames::Request(GroupSelector::Group(_)) => 1,
            GroupNames::Report(names) => RECORD_SIZE * names.len(),
        }
    }

    fn encode(&self, _header: &ExtendedSubHeader, message: &GroupNames, dst: &mut BytesMut) {
        match message {
            GroupNames::Request(GroupSelector::All) => {}
            GroupNames::Request(GroupSelector::Group(group)) => dst.put_u8(*group),
            GroupNames::Report(names) => {
                for (group, name) in names {
                    dst.put_u8(*group);
                    put_padded_str(name, GROUP_NAME_LENGTH, dst);
                }
            }
        }
    }

    fn decode(&self, buf: &mut &[u8], header: &ExtendedSubHeader) -> Result<GroupNames, DecodeError> {
        let length = header.message_length;
        match length {
            0 => return Ok(GroupNames::Request(GroupSelector::All)),
            1 => {
                let group = take(buf, 1)?[0];
                return Ok(GroupNames::Request(GroupSelector::Group(group)));
            }
            _ => {}
        }
        if length % RECORD_SIZE != 0 {
            return Err(DecodeError::LengthMismatch {
                message_id: MESSAGE_ID,
                length,
                record_size: RECORD_SIZE,
            });
        }

        let mut names = BTreeMap::new();
        for _ in 0..length / RECORD_SIZE {
            let record = take(buf, RECORD_SIZE)?;
            names.insert(record[0], padded_str(&record[1..]));
        }
        Ok(GroupNames::Report(names))
    }
}
