use nom::{bytes::complete::take, Err};

use super::{bytes, int, uint, ParseError, ParseErrorKind, ParseResult};
use crate::registry::{
    KIND_ARRAY, KIND_EXTERNAL, KIND_MAP, KIND_SLICE, KIND_STRUCT, TAG_COUNT_OF, TAG_NONE, TAG_SIZE_OF,
};

/// Type description as carried by a descriptor message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireType {
    Struct { name: String, fields: Vec<WireField> },
    Array { elem: i64, len: u64 },
    Slice { elem: i64 },
    Map { key: i64, elem: i64 },
    External { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireField {
    pub name: String,
    pub ty: i64,
    pub tag: Option<WireTag>,
}

/// Derived field tag, referring to its target by field index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireTag {
    CountOf(usize),
    SizeOf(usize),
}

fn string(input: &[u8]) -> ParseResult<'_, String> {
    let (remainder, raw) = bytes(input)?;
    match std::str::from_utf8(raw) {
        Ok(s) => Ok((remainder, s.to_string())),
        Err(_) => Err(Err::Failure(ParseError::new(input, ParseErrorKind::InvalidUtf8))),
    }
}

fn tag(input: &[u8]) -> ParseResult<'_, Option<WireTag>> {
    let (remainder, kind) = uint(input)?;
    match kind {
        TAG_NONE => Ok((remainder, None)),
        TAG_COUNT_OF => {
            let (remainder, index) = uint(remainder)?;
            Ok((remainder, Some(WireTag::CountOf(index as usize))))
        }
        TAG_SIZE_OF => {
            let (remainder, index) = uint(remainder)?;
            Ok((remainder, Some(WireTag::SizeOf(index as usize))))
        }
        other => Err(Err::Failure(ParseError::new(input, ParseErrorKind::UnknownTag(other)))),
    }
}

fn field(input: &[u8]) -> ParseResult<'_, WireField> {
    let (remainder, name) = string(input)?;
    let (remainder, ty) = int(remainder)?;
    let (remainder, tag) = tag(remainder)?;
    Ok((remainder, WireField { name, ty, tag }))
}

pub(super) fn wire_type(input: &[u8]) -> ParseResult<'_, WireType> {
    let (remainder, kind) = uint(input)?;
    match kind {
        KIND_STRUCT => {
            let (remainder, name) = string(remainder)?;
            let (mut remainder, count) = uint(remainder)?;
            let mut fields = Vec::new();
            for _ in 0..count {
                let (rest, f) = field(remainder)?;
                fields.push(f);
                remainder = rest;
            }
            Ok((remainder, WireType::Struct { name, fields }))
        }
        KIND_ARRAY => {
            let (remainder, elem) = int(remainder)?;
            let (remainder, len) = uint(remainder)?;
            Ok((remainder, WireType::Array { elem, len }))
        }
        KIND_SLICE => {
            let (remainder, elem) = int(remainder)?;
            Ok((remainder, WireType::Slice { elem }))
        }
        KIND_MAP => {
            let (remainder, key) = int(remainder)?;
            let (remainder, elem) = int(remainder)?;
            Ok((remainder, WireType::Map { key, elem }))
        }
        KIND_EXTERNAL => {
            let (remainder, name) = string(remainder)?;
            Ok((remainder, WireType::External { name }))
        }
        other => Err(Err::Failure(ParseError::new(input, ParseErrorKind::UnknownKind(other)))),
    }
}

/// Raw bytes of fixed length, used for external payloads.
pub(super) fn raw(input: &[u8], len: u64) -> ParseResult<'_, &[u8]> {
    take(len as usize)(input)
}
