use nom::error::{ErrorKind, ParseError as NomParseError};
use structex_varint::VarintError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    Varint(VarintError),
    UnknownType(i64),
    UnknownKind(u64),
    UnknownTag(u64),
    /// A counted field was reached before the field carrying its count.
    MissingCount { field: String },
    InvalidUtf8,
    Nom(ErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError<I> {
    pub input: I,
    pub kind: ParseErrorKind,
    pub from: Option<Box<Self>>,
}

impl<I> ParseError<I> {
    pub fn new(input: I, kind: ParseErrorKind) -> Self {
        Self {
            input,
            kind,
            from: None,
        }
    }
}

impl<I> NomParseError<I> for ParseError<I> {
    fn from_error_kind(input: I, kind: ErrorKind) -> Self {
        Self {
            input,
            kind: ParseErrorKind::Nom(kind),
            from: None,
        }
    }

    fn append(input: I, kind: ErrorKind, other: Self) -> Self {
        Self {
            input,
            kind: ParseErrorKind::Nom(kind),
            from: Some(other.into()),
        }
    }
}

/// Failure to read a message stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("stream ends inside a message")]
    Incomplete,

    #[error("malformed message: {0:?}")]
    Malformed(ParseErrorKind),

    #[error("{0} bytes left over after the message body")]
    TrailingBytes(usize),
}

impl<I> From<nom::Err<ParseError<I>>> for ReadError {
    fn from(err: nom::Err<ParseError<I>>) -> Self {
        match err {
            nom::Err::Incomplete(_) => ReadError::Incomplete,
            nom::Err::Error(e) | nom::Err::Failure(e) => match e.kind {
                ParseErrorKind::Nom(ErrorKind::Eof)
                | ParseErrorKind::Varint(VarintError::UnexpectedEnd { .. }) => ReadError::Incomplete,
                kind => ReadError::Malformed(kind),
            },
        }
    }
}
