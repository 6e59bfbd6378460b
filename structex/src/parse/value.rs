use nom::{
    number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, be_i8, be_u16, be_u32, be_u64, be_u8},
    Err,
};

use super::{
    descriptor::raw,
    uint, ParseError, ParseErrorKind, ParseResult, Reader, WireField, WireTag, WireType,
};
use crate::Primitive;

/// Decoded value body.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Uint(u64),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Struct(Vec<(String, Value)>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    External(Vec<u8>),
}

impl Value {
    /// Field of a struct value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }
}

impl Reader {
    /// Decode a body of type `id`. `count` is the element count supplied by
    /// a sibling count field, in which case no count prefix is present.
    pub(super) fn value<'a>(&self, id: i64, input: &'a [u8], count: Option<u64>) -> ParseResult<'a, Value> {
        if let Some(p) = Primitive::from_id(id) {
            return primitive(p, input, count);
        }
        let wire_type = self
            .types
            .get(&id)
            .ok_or_else(|| Err::Failure(ParseError::new(input, ParseErrorKind::UnknownType(id))))?;
        match wire_type {
            WireType::Struct { fields, .. } => {
                let mut remainder = input;
                let mut values: Vec<(String, Value)> = Vec::new();
                for index in 0..fields.len() {
                    let count = sibling_count(fields, &values, index, remainder)?;
                    let (rest, value) = self.value(fields[index].ty, remainder, count)?;
                    values.push((fields[index].name.clone(), value));
                    remainder = rest;
                }
                Ok((remainder, Value::Struct(values)))
            }
            WireType::Array { elem, len } => self.elements(*elem, input, *len),
            WireType::Slice { elem } => {
                let (remainder, n) = counted(input, count)?;
                self.elements(*elem, remainder, n)
            }
            WireType::Map { key, elem } => {
                let (mut remainder, n) = counted(input, count)?;
                let mut pairs = Vec::new();
                for _ in 0..n {
                    let (rest, k) = self.value(*key, remainder, None)?;
                    let (rest, v) = self.value(*elem, rest, None)?;
                    pairs.push((k, v));
                    remainder = rest;
                }
                Ok((remainder, Value::Map(pairs)))
            }
            WireType::External { .. } => {
                let (remainder, len) = uint(input)?;
                let (remainder, data) = raw(remainder, len)?;
                Ok((remainder, Value::External(data.to_vec())))
            }
        }
    }

    fn elements<'a>(&self, elem: i64, input: &'a [u8], n: u64) -> ParseResult<'a, Value> {
        let mut remainder = input;
        let mut items = Vec::new();
        for _ in 0..n {
            let (rest, item) = self.value(elem, remainder, None)?;
            items.push(item);
            remainder = rest;
        }
        Ok((remainder, Value::Array(items)))
    }
}

fn counted(input: &[u8], count: Option<u64>) -> ParseResult<'_, u64> {
    match count {
        Some(n) => Ok((input, n)),
        None => uint(input),
    }
}

/// Count for field `index` taken from an already decoded countOf sibling.
fn sibling_count<'a>(
    fields: &[WireField],
    decoded: &[(String, Value)],
    index: usize,
    input: &'a [u8],
) -> Result<Option<u64>, Err<ParseError<&'a [u8]>>> {
    let source = match fields.iter().position(|f| f.tag == Some(WireTag::CountOf(index))) {
        Some(source) => source,
        None => return Ok(None),
    };
    match decoded.get(source).and_then(|(_, v)| v.as_uint()) {
        Some(n) => Ok(Some(n)),
        None => Err(Err::Failure(ParseError::new(
            input,
            ParseErrorKind::MissingCount {
                field: fields[index].name.clone(),
            },
        ))),
    }
}

fn primitive(primitive: Primitive, input: &[u8], count: Option<u64>) -> ParseResult<'_, Value> {
    match primitive {
        Primitive::Bool => be_u8(input).map(|(r, v)| (r, Value::Bool(v != 0))),
        Primitive::U8 => be_u8(input).map(|(r, v)| (r, Value::Uint(v.into()))),
        Primitive::U16 => be_u16(input).map(|(r, v)| (r, Value::Uint(v.into()))),
        Primitive::U32 => be_u32(input).map(|(r, v)| (r, Value::Uint(v.into()))),
        Primitive::U64 => be_u64(input).map(|(r, v)| (r, Value::Uint(v))),
        Primitive::I8 => be_i8(input).map(|(r, v)| (r, Value::Int(v.into()))),
        Primitive::I16 => be_i16(input).map(|(r, v)| (r, Value::Int(v.into()))),
        Primitive::I32 => be_i32(input).map(|(r, v)| (r, Value::Int(v.into()))),
        Primitive::I64 => be_i64(input).map(|(r, v)| (r, Value::Int(v))),
        Primitive::F32 => be_f32(input).map(|(r, v)| (r, Value::Float(v.into()))),
        Primitive::F64 => be_f64(input).map(|(r, v)| (r, Value::Float(v))),
        Primitive::String => {
            let (remainder, n) = counted(input, count)?;
            let (remainder, data) = raw(remainder, n)?;
            match std::str::from_utf8(data) {
                Ok(s) => Ok((remainder, Value::String(s.to_string()))),
                Err(_) => Err(Err::Failure(ParseError::new(input, ParseErrorKind::InvalidUtf8))),
            }
        }
        Primitive::Bytes => {
            let (remainder, n) = counted(input, count)?;
            let (remainder, data) = raw(remainder, n)?;
            Ok((remainder, Value::Bytes(data.to_vec())))
        }
    }
}
