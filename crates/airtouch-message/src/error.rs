use crate::message::MessageKind;

/// Errors raised while decoding a sub-message.
///
/// All of these are frame-local: the offending frame is dropped and the
/// stream carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ends before the declared length.
    #[error("truncated sub-message (needed {needed} bytes, {available} available)")]
    Truncated { needed: usize, available: usize },

    /// The body is not a whole number of records.
    #[error("message {message_id:#06x}: length {length} is not a multiple of the record size ({record_size})")]
    LengthMismatch {
        message_id: u16,
        length: usize,
        record_size: usize,
    },

    /// A repeated-record header disagrees with the known record size.
    #[error("message {message_id:#06x}: repeat length ({actual}) != record size ({expected})")]
    RecordSize {
        message_id: u16,
        expected: usize,
        actual: usize,
    },

    /// A coded value is outside its closed enumeration.
    #[error("invalid {field} value {value:#04x}")]
    InvalidEnumValue { field: &'static str, value: u8 },

    /// A text field is not valid UTF-8.
    #[error("message {message_id:#06x}: text is not valid UTF-8")]
    InvalidText { message_id: u16 },
}

/// Errors raised while encoding a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// No codec is registered for this message type.
    #[error("no codec registered for {0:?} messages")]
    Unregistered(MessageKind),

    /// A sub-header field cannot represent the value.
    #[error("{field} ({value}) does not fit in the sub-header")]
    FieldOutOfRange { field: &'static str, value: usize },
}

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The (category, message id) pair is already taken.
    #[error("codec already registered for category {category:#04x} message {message_id:#06x}")]
    Duplicate { category: u8, message_id: u16 },

    /// The message type already has a codec.
    #[error("{0:?} messages already have a codec")]
    DuplicateKind(MessageKind),

    /// The category is already used by the other sub-header family.
    #[error("category {0:#04x} already uses a different sub-header")]
    CategoryConflict(u8),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
