use std::{io, sync::Arc};

use thiserror::Error;

/// Errors raised while encoding.
///
/// The encoder keeps the first error it hits and hands out clones of it for
/// every later call, so the I/O error is shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum EncodeError {
    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("type {0} cannot be encoded")]
    UnencodableType(&'static str),

    #[error("message of {len} bytes is too big, limit is {limit} bytes")]
    MessageTooLarge { len: usize, limit: usize },

    #[error("failed to write message: {0}")]
    SinkWrite(#[source] Arc<io::Error>),

    #[error("malformed tag on field `{field}` of {ty}: {reason}")]
    MalformedTag {
        ty: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("derived value {value} of field `{field}` does not fit into {width} bytes")]
    DerivedOverflow {
        field: &'static str,
        value: u64,
        width: usize,
    },
}

impl From<io::Error> for EncodeError {
    fn from(err: io::Error) -> Self {
        EncodeError::SinkWrite(Arc::new(err))
    }
}

pub type Result<T, E = EncodeError> = std::result::Result<T, E>;
