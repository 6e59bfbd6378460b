use std::mem::size_of;

use crate::{
    shape::{Primitive, Shape},
    state::EncoderState,
    Encode, Result, TypeRef,
};

macro_rules! fixed_width {
    ($($ty:ty => $primitive:ident),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn type_ref() -> TypeRef {
                    TypeRef::of::<$ty>()
                }

                fn shape() -> Shape {
                    Shape::Primitive(Primitive::$primitive)
                }

                fn encode(&self, state: &mut EncoderState) -> Result<()> {
                    state.write_bytes(&self.to_be_bytes());
                    Ok(())
                }

                fn encoded_len(&self) -> usize {
                    size_of::<$ty>()
                }
            }
        )*
    };
}

fixed_width!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f32 => F32,
    f64 => F64,
);

// Pointer sized integers always take 8 bytes on the wire.
impl Encode for usize {
    fn type_ref() -> TypeRef {
        TypeRef::of::<usize>()
    }

    fn shape() -> Shape {
        Shape::Primitive(Primitive::U64)
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.write_bytes(&(*self as u64).to_be_bytes());
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        size_of::<u64>()
    }
}

impl Encode for isize {
    fn type_ref() -> TypeRef {
        TypeRef::of::<isize>()
    }

    fn shape() -> Shape {
        Shape::Primitive(Primitive::I64)
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.write_bytes(&(*self as i64).to_be_bytes());
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        size_of::<i64>()
    }
}

impl Encode for bool {
    fn type_ref() -> TypeRef {
        TypeRef::of::<bool>()
    }

    fn shape() -> Shape {
        Shape::Primitive(Primitive::Bool)
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.write_u8(u8::from(*self));
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        1
    }
}

impl Encode for String {
    fn type_ref() -> TypeRef {
        TypeRef::of::<String>()
    }

    fn shape() -> Shape {
        Shape::Primitive(Primitive::String)
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.encode_str(self);
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        structex_varint::uint_len(self.len() as u64) + self.len()
    }

    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        state.write_bytes(self.as_bytes());
        Ok(())
    }

    fn elements_len(&self) -> usize {
        self.len()
    }
}
