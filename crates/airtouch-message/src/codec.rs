use bytes::BytesMut;

use crate::error::DecodeError;
use crate::header::SubHeader;
use crate::message::Variant;

/// Encodes and decodes the body of one message family under sub-header `H`.
///
/// `encode` writes exactly `size(message)` bytes and `decode` consumes the
/// body described by the header, leaving any surplus in the cursor.
pub trait MessageCodec<H: SubHeader>: Send + Sync + 'static {
    type Message: Variant;

    /// Body shape the encoder will produce for `message`.
    fn layout(&self, message: &Self::Message) -> H::Layout;

    /// Body length in bytes, excluding the sub-header.
    fn size(&self, message: &Self::Message) -> usize {
        H::layout_len(&self.layout(message))
    }

    fn encode(&self, header: &H, message: &Self::Message, dst: &mut BytesMut);

    fn decode(&self, buf: &mut &[u8], header: &H) -> Result<Self::Message, DecodeError>;
}
