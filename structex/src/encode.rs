//! The [`Encode`] trait and its implementations for std types.
//!
//! Fixed width primitives are written big-endian at their declared width.
//! Strings, byte slices, `Vec`s and maps carry a uvarint element count in
//! front of their elements, unless a sibling `count_of` field already
//! carries it (see [`Encode::encode_elements`]). Arrays never carry a count.

use crate::{shape::Shape, state::EncoderState, Result, TypeRef};

mod collection;
mod external;
mod pointer;
mod primitive;

pub use external::Marshal;

/// A type the encoder can describe and serialize.
///
/// Implement it with `#[derive(Encode)]` for structs; the std
/// implementations cover primitives, strings, arrays, `Vec`, maps and
/// pointer-like wrappers.
pub trait Encode {
    /// Identity the type is registered under.
    fn type_ref() -> TypeRef
    where
        Self: Sized;

    /// Structural description, asked for once per type and encoder.
    fn shape() -> Shape
    where
        Self: Sized;

    /// Append the body of `self` to `state`.
    fn encode(&self, state: &mut EncoderState) -> Result<()>;

    /// Exact number of bytes [`Encode::encode`] appends.
    fn encoded_len(&self) -> usize;

    /// Number of elements for arrays, slices, maps and strings.
    fn element_count(&self) -> Option<usize> {
        None
    }

    /// Body without the implicit element count.
    ///
    /// Used when a sibling field tagged `count_of` carries the count.
    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        self.encode(state)
    }

    /// Exact number of bytes [`Encode::encode_elements`] appends.
    fn elements_len(&self) -> usize {
        self.encoded_len()
    }

    /// Whether the value is an empty pointer that has nothing to encode.
    fn is_nil(&self) -> bool {
        false
    }
}
