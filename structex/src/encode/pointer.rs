//! Pointer-like wrappers encode as the value they point to.

use std::{rc::Rc, sync::Arc};

use crate::{shape::Shape, state::EncoderState, Encode, EncodeError, Result, TypeRef};

macro_rules! transparent {
    ($($wrapper:ident),*) => {
        $(
            impl<T: Encode> Encode for $wrapper<T> {
                fn type_ref() -> TypeRef {
                    T::type_ref()
                }

                fn shape() -> Shape {
                    T::shape()
                }

                fn encode(&self, state: &mut EncoderState) -> Result<()> {
                    (**self).encode(state)
                }

                fn encoded_len(&self) -> usize {
                    (**self).encoded_len()
                }

                fn element_count(&self) -> Option<usize> {
                    (**self).element_count()
                }

                fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
                    (**self).encode_elements(state)
                }

                fn elements_len(&self) -> usize {
                    (**self).elements_len()
                }

                fn is_nil(&self) -> bool {
                    (**self).is_nil()
                }
            }
        )*
    };
}

transparent!(Box, Rc, Arc);

impl<T: Encode> Encode for &T {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }

    fn shape() -> Shape {
        T::shape()
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        (**self).encode(state)
    }

    fn encoded_len(&self) -> usize {
        (**self).encoded_len()
    }

    fn element_count(&self) -> Option<usize> {
        (**self).element_count()
    }

    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        (**self).encode_elements(state)
    }

    fn elements_len(&self) -> usize {
        (**self).elements_len()
    }

    fn is_nil(&self) -> bool {
        (**self).is_nil()
    }
}

/// `None` is a nil pointer: it cannot be encoded, neither at the top level
/// nor nested inside another value.
impl<T: Encode> Encode for Option<T> {
    fn type_ref() -> TypeRef {
        T::type_ref()
    }

    fn shape() -> Shape {
        T::shape()
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        match self {
            Some(value) => value.encode(state),
            None => Err(EncodeError::InvalidValue(format!(
                "cannot encode nil pointer to {}",
                T::type_ref().name()
            ))),
        }
    }

    fn encoded_len(&self) -> usize {
        self.as_ref().map_or(0, Encode::encoded_len)
    }

    fn element_count(&self) -> Option<usize> {
        self.as_ref().and_then(Encode::element_count)
    }

    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        match self {
            Some(value) => value.encode_elements(state),
            None => self.encode(state),
        }
    }

    fn elements_len(&self) -> usize {
        self.as_ref().map_or(0, Encode::elements_len)
    }

    fn is_nil(&self) -> bool {
        self.as_ref().map_or(true, Encode::is_nil)
    }
}
