//! Reader for the message stream the [`Encoder`](crate::Encoder) writes.
//!
//! It splits the stream into messages, rebuilds the descriptors and decodes
//! value bodies into a dynamic [`Value`] tree. It exists to inspect and
//! verify encoder output; it does not map values back onto Rust types.

use fnv::FnvHashMap;
use nom::{bytes::complete::take, IResult};

pub use self::{
    descriptor::{WireField, WireTag, WireType},
    error::{ParseError, ParseErrorKind, ReadError},
    value::Value,
};

mod descriptor;
pub mod error;
mod value;

pub type ParseResult<'a, T> = IResult<&'a [u8], T, ParseError<&'a [u8]>>;

pub fn uint(input: &[u8]) -> ParseResult<'_, u64> {
    match structex_varint::decode_uint(input) {
        Ok((value, used)) => Ok((&input[used..], value)),
        Err(e) => Err(nom::Err::Error(ParseError::new(input, ParseErrorKind::Varint(e)))),
    }
}

pub fn int(input: &[u8]) -> ParseResult<'_, i64> {
    let (remainder, folded) = uint(input)?;
    Ok((remainder, structex_varint::unfold_int(folded)))
}

/// Length prefixed byte string.
pub fn bytes(input: &[u8]) -> ParseResult<'_, &[u8]> {
    let (remainder, len) = uint(input)?;
    take(len as usize)(remainder)
}

/// Split one framed message off the front of `input`, returning its payload.
pub fn message(input: &[u8]) -> ParseResult<'_, &[u8]> {
    bytes(input)
}

/// A decoded message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Descriptor of the type with the given id.
    Type { id: i64, wire_type: WireType },
    /// A value of the type with the given id.
    Value { id: i64, value: Value },
}

#[derive(Debug, Default)]
pub struct Reader {
    types: FnvHashMap<i64, WireType>,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wire_type(&self, id: i64) -> Option<&WireType> {
        self.types.get(&id)
    }

    /// Read every message in `stream`.
    pub fn read_all(&mut self, stream: &[u8]) -> Result<Vec<Message>, ReadError> {
        let mut remainder = stream;
        let mut messages = Vec::new();
        while !remainder.is_empty() {
            let (rest, payload) = message(remainder)?;
            messages.push(self.read_payload(payload)?);
            remainder = rest;
        }
        Ok(messages)
    }

    /// Read the payload of one message, learning its type if it is a
    /// descriptor.
    pub fn read_payload(&mut self, payload: &[u8]) -> Result<Message, ReadError> {
        let (remainder, id) = int(payload)?;
        if id < 0 {
            let (remainder, wire_type) = descriptor::wire_type(remainder)?;
            ensure_consumed(remainder)?;
            log::trace!("read descriptor of type id {}", -id);
            self.types.insert(-id, wire_type.clone());
            Ok(Message::Type { id: -id, wire_type })
        } else {
            let (remainder, value) = self.value(id, remainder, None)?;
            ensure_consumed(remainder)?;
            Ok(Message::Value { id, value })
        }
    }
}

fn ensure_consumed(remainder: &[u8]) -> Result<(), ReadError> {
    if remainder.is_empty() {
        Ok(())
    } else {
        Err(ReadError::TrailingBytes(remainder.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_split() {
        let input = &b"\x03abc\x00\x01z"[..];
        let (rest, payload) = message(input).unwrap();
        assert_eq!(payload, b"abc");
        let (rest, payload) = message(rest).unwrap();
        assert_eq!(payload, b"");
        assert_eq!(rest, b"\x01z");
    }

    #[test]
    fn test_truncated_message() {
        let mut reader = Reader::new();
        assert_eq!(reader.read_all(b"\x05ab"), Err(ReadError::Incomplete));
        assert_eq!(reader.read_all(b"\xfe\x01"), Err(ReadError::Incomplete));
    }

    #[test]
    fn test_primitive_value() {
        let mut reader = Reader::new();
        let messages = reader.read_all(&[3, 6, 1, 2]).unwrap();
        assert_eq!(
            messages,
            vec![Message::Value {
                id: 3,
                value: Value::Uint(0x0102)
            }]
        );
    }

    #[test]
    fn test_unknown_type() {
        let mut reader = Reader::new();
        assert_eq!(
            reader.read_all(&[2, 0xff, 0x80]),
            Err(ReadError::Malformed(ParseErrorKind::UnknownType(64)))
        );
    }

    #[test]
    fn test_trailing_bytes() {
        let mut reader = Reader::new();
        assert_eq!(reader.read_all(&[4, 6, 1, 2, 9]), Err(ReadError::TrailingBytes(1)));
    }
}
