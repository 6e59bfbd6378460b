//! Values of fields tagged `count_of` or `size_of`.
//!
//! A tagged field is never read for its stored value: at encode time the
//! value is computed from the sibling field the tag names and written at the
//! width of the tagged field's type. `#[derive(Encode)]` calls into this
//! module for every tagged field.

use crate::{state::EncoderState, Encode, EncodeError, Result};

/// Unsigned integer types that can carry a derived value.
pub trait DerivedValue: Encode + Sized {
    /// Bytes the value occupies on the wire.
    const WIDTH: usize;

    fn from_derived(value: u64) -> Option<Self>;
}

macro_rules! derived_value {
    ($($ty:ty => $width:expr),*) => {
        $(
            impl DerivedValue for $ty {
                const WIDTH: usize = $width;

                fn from_derived(value: u64) -> Option<Self> {
                    <$ty>::try_from(value).ok()
                }
            }
        )*
    };
}

derived_value!(u8 => 1, u16 => 2, u32 => 4, u64 => 8, usize => 8);

/// Number of elements currently held by `target`.
pub fn count_of<T: Encode + ?Sized>(
    target: &T,
    ty: &'static str,
    field: &'static str,
) -> Result<u64> {
    target
        .element_count()
        .map(|count| count as u64)
        .ok_or_else(|| EncodeError::MalformedTag {
            ty,
            field,
            reason: "count_of target has no element count".to_string(),
        })
}

/// Encoded byte length of `target`.
///
/// `counted` tells whether the target is itself the target of a `count_of`
/// sibling, in which case it is written without its own count.
pub fn size_of<T: Encode + ?Sized>(target: &T, counted: bool) -> u64 {
    let len = if counted {
        target.elements_len()
    } else {
        target.encoded_len()
    };
    len as u64
}

/// Write `value` at the width of `D`.
pub fn emit<D: DerivedValue>(state: &mut EncoderState, field: &'static str, value: u64) -> Result<()> {
    let derived = D::from_derived(value).ok_or(EncodeError::DerivedOverflow {
        field,
        value,
        width: D::WIDTH,
    })?;
    derived.encode(state)
}
