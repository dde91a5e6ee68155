use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use airtouch_frame::{Frame, Generation, CONTROL_STATUS, EXTENDED};
use bytes::{Bytes, BytesMut};
use tracing::{debug, error, trace};

use crate::codec::MessageCodec;
use crate::error::{DecodeError, EncodeError, RegistryError};
use crate::header::{ControlStatusSubHeader, ExtendedSubHeader, SubHeader};
use crate::message::{Message, MessageKind, Variant};
use crate::messages::{
    ac_error_info, console_version, group_names, zone_status, AcErrorInformationCodec,
    ConsoleVersionCodec, GroupNamesCodec, ZoneStatusCodec,
};

/// Type-erased view of a [`MessageCodec`].
trait ErasedCodec<H>: Send + Sync {
    fn decode(&self, buf: &mut &[u8], header: &H) -> Result<Message, DecodeError>;

    fn encode(&self, message: &Message, message_id: u16, dst: &mut BytesMut)
        -> Result<(), EncodeError>;
}

struct Erased<C>(C);

impl<H, C> ErasedCodec<H> for Erased<C>
where
    H: SubHeader,
    C: MessageCodec<H>,
{
    fn decode(&self, buf: &mut &[u8], header: &H) -> Result<Message, DecodeError> {
        self.0.decode(buf, header).map(Variant::into_message)
    }

    fn encode(
        &self,
        message: &Message,
        message_id: u16,
        dst: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        let message = C::Message::from_message(message)
            .ok_or(EncodeError::Unregistered(message.kind()))?;
        let header = H::for_message(message_id, self.0.layout(message))?;
        dst.reserve(H::SIZE + header.body_len());
        header.encode(dst);
        self.0.encode(&header, message, dst);
        Ok(())
    }
}

/// Codecs sharing one category, keyed by message id.
struct CodecTable<H> {
    codecs: HashMap<u16, Box<dyn ErasedCodec<H>>>,
}

impl<H> Default for CodecTable<H> {
    fn default() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }
}

impl<H: SubHeader> CodecTable<H> {
    fn decode(&self, category: u8, payload: &[u8]) -> Result<Option<Message>, DecodeError> {
        let mut cursor = payload;
        let header = H::decode(&mut cursor)?;
        let message_id = header.message_id();
        let Some(codec) = self.codecs.get(&message_id) else {
            debug!(category, message_id, "ignoring message without a registered codec");
            return Ok(None);
        };

        let body_len = header.body_len();
        if cursor.len() < body_len {
            return Err(DecodeError::Truncated {
                needed: body_len,
                available: cursor.len(),
            });
        }
        let mut body = &cursor[..body_len];
        let message = codec.decode(&mut body, &header)?;
        let unread = body.len() + (cursor.len() - body_len);
        if unread > 0 {
            trace!(category, message_id, unread, "sub-message left bytes unread");
        }
        Ok(Some(message))
    }
}

/// A message encoded as a frame payload, ready to be framed under `category`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub category: u8,
    pub payload: Bytes,
}

impl Encoded {
    /// Wrap as an outgoing request frame.
    pub fn into_frame(self, sequence: u8) -> Frame {
        Frame::request(sequence, self.category, self.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CodecKey {
    category: u8,
    message_id: u16,
}

/// Builds a [`Registry`]. Registrations are append-only.
#[derive(Default)]
pub struct RegistryBuilder {
    extended: HashMap<u8, CodecTable<ExtendedSubHeader>>,
    control_status: HashMap<u8, CodecTable<ControlStatusSubHeader>>,
    kinds: HashMap<MessageKind, CodecKey>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec whose messages use the extended sub-header.
    pub fn extended<C>(mut self, category: u8, message_id: u16, codec: C) -> Result<Self, RegistryError>
    where
        C: MessageCodec<ExtendedSubHeader>,
    {
        if self.control_status.contains_key(&category) {
            return Err(RegistryError::CategoryConflict(category));
        }
        self.claim::<C::Message>(category, message_id)?;
        let table = self.extended.entry(category).or_default();
        insert(table, message_id, codec);
        Ok(self)
    }

    /// Register a codec whose messages use the control-status sub-header.
    pub fn control_status<C>(
        mut self,
        category: u8,
        message_id: u8,
        codec: C,
    ) -> Result<Self, RegistryError>
    where
        C: MessageCodec<ControlStatusSubHeader>,
    {
        if self.extended.contains_key(&category) {
            return Err(RegistryError::CategoryConflict(category));
        }
        let message_id = u16::from(message_id);
        self.claim::<C::Message>(category, message_id)?;
        let table = self.control_status.entry(category).or_default();
        insert(table, message_id, codec);
        Ok(self)
    }

    fn claim<V: Variant>(&mut self, category: u8, message_id: u16) -> Result<(), RegistryError> {
        if self.kinds.contains_key(&V::KIND) {
            return Err(RegistryError::DuplicateKind(V::KIND));
        }
        let taken = self
            .extended
            .get(&category)
            .is_some_and(|t| t.codecs.contains_key(&message_id))
            || self
                .control_status
                .get(&category)
                .is_some_and(|t| t.codecs.contains_key(&message_id));
        if taken {
            return Err(RegistryError::Duplicate {
                category,
                message_id,
            });
        }
        self.kinds.insert(
            V::KIND,
            CodecKey {
                category,
                message_id,
            },
        );
        Ok(())
    }

    pub fn build(self) -> Registry {
        Registry {
            extended: self.extended,
            control_status: self.control_status,
            kinds: self.kinds,
        }
    }
}

fn insert<H, C>(table: &mut CodecTable<H>, message_id: u16, codec: C)
where
    H: SubHeader,
    C: MessageCodec<H>,
{
    table.codecs.insert(message_id, Box::new(Erased(codec)));
}

/// Immutable `(category, message id) → codec` table.
///
/// Lookups take `&self`, so one registry can be shared by any number of
/// connections.
pub struct Registry {
    extended: HashMap<u8, CodecTable<ExtendedSubHeader>>,
    control_status: HashMap<u8, CodecTable<ControlStatusSubHeader>>,
    kinds: HashMap<MessageKind, CodecKey>,
}

/// The built-in tables never collide; an empty table stands in if one ever does.
fn builtin(generation: Generation, table: Result<Registry, RegistryError>) -> Registry {
    debug_assert!(table.is_ok(), "built-in {generation} codecs collide");
    table.unwrap_or_else(|err| {
        error!(%generation, error = %err, "built-in codec table is invalid");
        RegistryBuilder::new().build()
    })
}

static AIRTOUCH4: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::airtouch4()));
static AIRTOUCH5: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::airtouch5()));

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Process-wide built-in table for `generation`.
    pub fn shared(generation: Generation) -> Arc<Registry> {
        match generation {
            Generation::AirTouch4 => Arc::clone(&AIRTOUCH4),
            Generation::AirTouch5 => Arc::clone(&AIRTOUCH5),
        }
    }

    /// Built-in table for AirTouch 4 consoles.
    pub fn airtouch4() -> Registry {
        builtin(Generation::AirTouch4, Self::try_airtouch4())
    }

    /// Built-in table for AirTouch 5 consoles.
    pub fn airtouch5() -> Registry {
        builtin(Generation::AirTouch5, Self::try_airtouch5())
    }

    pub fn try_airtouch4() -> Result<Registry, RegistryError> {
        Ok(Self::builder()
            .extended(EXTENDED, group_names::MESSAGE_ID, GroupNamesCodec)?
            .extended(EXTENDED, console_version::MESSAGE_ID, ConsoleVersionCodec)?
            .build())
    }

    pub fn try_airtouch5() -> Result<Registry, RegistryError> {
        Ok(Self::builder()
            .control_status(CONTROL_STATUS, zone_status::MESSAGE_ID, ZoneStatusCodec)?
            .extended(EXTENDED, ac_error_info::MESSAGE_ID, AcErrorInformationCodec)?
            .extended(EXTENDED, console_version::MESSAGE_ID, ConsoleVersionCodec)?
            .build())
    }

    /// Decode a frame payload received under `category`.
    ///
    /// Returns `Ok(None)` when no codec is registered for the message.
    pub fn decode(&self, category: u8, payload: &[u8]) -> Result<Option<Message>, DecodeError> {
        if let Some(table) = self.extended.get(&category) {
            return table.decode(category, payload);
        }
        if let Some(table) = self.control_status.get(&category) {
            return table.decode(category, payload);
        }
        debug!(category, "ignoring frame with unknown category");
        Ok(None)
    }

    pub fn decode_frame(&self, frame: &Frame) -> Result<Option<Message>, DecodeError> {
        self.decode(frame.category, &frame.payload)
    }

    /// Encode `message` with its sub-header into a frame payload.
    pub fn encode(&self, message: &Message) -> Result<Encoded, EncodeError> {
        let kind = message.kind();
        let key = self.kinds.get(&kind).ok_or(EncodeError::Unregistered(kind))?;
        let mut payload = BytesMut::new();
        let encoded = match self.extended.get(&key.category) {
            Some(table) => table
                .codecs
                .get(&key.message_id)
                .map(|codec| codec.encode(message, key.message_id, &mut payload)),
            None => self
                .control_status
                .get(&key.category)
                .and_then(|table| table.codecs.get(&key.message_id))
                .map(|codec| codec.encode(message, key.message_id, &mut payload)),
        };
        encoded.ok_or(EncodeError::Unregistered(kind))??;

        Ok(Encoded {
            category: key.category,
            payload: payload.freeze(),
        })
    }

    pub fn has_codec(&self, kind: MessageKind) -> bool {
        self.kinds.contains_key(&kind)
    }

    /// Registered message kinds in a stable order.
    pub fn kinds(&self) -> Vec<MessageKind> {
        let mut kinds: Vec<MessageKind> = self.kinds.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
