//! Length prefixing of finished messages.

use crate::{
    state::{EncoderState, RESERVED_PREFIX},
    writer::Sink,
    EncodeError, Result,
};

/// Prefix the payload held by `state` with its length and hand the message
/// to `sink`.
///
/// The prefix is written right-aligned into the reserved space in front of
/// the payload, so the message goes out as one contiguous slice. The state
/// is emptied afterwards, whatever the outcome.
pub(crate) fn write_message<W: Sink + ?Sized>(
    sink: &mut W,
    state: &mut EncoderState,
    max_message_len: usize,
) -> Result<()> {
    let payload_len = state.payload_len();
    if payload_len >= max_message_len {
        state.reset();
        return Err(EncodeError::MessageTooLarge {
            len: payload_len,
            limit: max_message_len,
        });
    }

    let count = structex_varint::encode_uint_array(payload_len as u64);
    let offset = RESERVED_PREFIX - count.len();
    let buf = state.buffer_mut();
    buf[offset..RESERVED_PREFIX].copy_from_slice(count.as_bytes());

    let message = &buf[offset..];
    log::trace!(
        "write message of {} bytes: {}",
        payload_len,
        hex::encode(&message[..message.len().min(32)])
    );
    let written = sink.write_message(message);

    state.reset();
    written.map_err(EncodeError::from)
}
