//! Structural description of encodable types.
//!
//! A [`Shape`] is what the encoder knows about a type: its kind and the
//! types it is built from. Shapes are produced by [`Encode::shape`] (usually
//! generated by `#[derive(Encode)]`) and are only asked for once per type by
//! the registry.

use std::{any::TypeId, fmt};

use crate::Encode;

/// Types with a fixed wire id that never get a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
}

impl Primitive {
    pub const ALL: [Primitive; 13] = [
        Primitive::Bool,
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::F32,
        Primitive::F64,
        Primitive::String,
        Primitive::Bytes,
    ];

    pub fn id(self) -> i64 {
        match self {
            Primitive::Bool => 1,
            Primitive::U8 => 2,
            Primitive::U16 => 3,
            Primitive::U32 => 4,
            Primitive::U64 => 5,
            Primitive::I8 => 6,
            Primitive::I16 => 7,
            Primitive::I32 => 8,
            Primitive::I64 => 9,
            Primitive::F32 => 10,
            Primitive::F64 => 11,
            Primitive::String => 12,
            Primitive::Bytes => 13,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.id() == id)
    }

    /// Byte width of fixed size primitives, `None` for length prefixed ones.
    pub fn width(self) -> Option<usize> {
        match self {
            Primitive::Bool | Primitive::U8 | Primitive::I8 => Some(1),
            Primitive::U16 | Primitive::I16 => Some(2),
            Primitive::U32 | Primitive::I32 | Primitive::F32 => Some(4),
            Primitive::U64 | Primitive::I64 | Primitive::F64 => Some(8),
            Primitive::String | Primitive::Bytes => None,
        }
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Bool => "bool",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::String => "string",
            Primitive::Bytes => "bytes",
        }
    }
}

/// Identity of an encodable type plus the way to inspect it.
///
/// Two refs are equal when they point at the same Rust type. Wrappers like
/// `Box<T>` hand out the ref of `T`, which makes `T` the canonical form they
/// are registered under.
#[derive(Clone, Copy)]
pub struct TypeRef {
    key: TypeId,
    name: &'static str,
    shape: fn() -> Shape,
}

impl TypeRef {
    pub fn of<T: Encode + 'static>() -> Self {
        Self::named::<T>(std::any::type_name::<T>())
    }

    pub fn named<T: Encode + 'static>(name: &'static str) -> Self {
        Self {
            key: TypeId::of::<T>(),
            name,
            shape: <T as Encode>::shape,
        }
    }

    pub fn key(&self) -> TypeId {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> Shape {
        (self.shape)()
    }

    pub(crate) fn is_byte(&self) -> bool {
        self.key == TypeId::of::<u8>()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Primitive(Primitive),
    Struct(StructShape),
    Array { elem: TypeRef, len: usize },
    Slice { elem: TypeRef },
    Map { key: TypeRef, elem: TypeRef },
    /// The type encodes itself into an opaque byte string.
    External { name: &'static str },
    /// Channel-like types. Ignored as struct fields, rejected everywhere else.
    Opaque { name: &'static str },
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Primitive(p) => p.name(),
            Shape::Struct(_) => "struct",
            Shape::Array { .. } => "array",
            Shape::Slice { .. } => "slice",
            Shape::Map { .. } => "map",
            Shape::External { .. } => "external",
            Shape::Opaque { .. } => "opaque",
        }
    }

    /// Whether a `count_of` tag may point at a field of this shape.
    pub fn is_countable(&self) -> bool {
        matches!(
            self,
            Shape::Array { .. }
                | Shape::Slice { .. }
                | Shape::Map { .. }
                | Shape::Primitive(Primitive::String)
                | Shape::Primitive(Primitive::Bytes)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructShape {
    pub name: &'static str,
    pub fields: Vec<FieldShape>,
}

impl StructShape {
    pub fn field(&self, name: &str) -> Option<(usize, &FieldShape)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldShape {
    pub name: &'static str,
    pub ty: TypeRef,
    pub tag: Option<FieldTag>,
}

impl FieldShape {
    pub fn new(name: &'static str, ty: TypeRef) -> Self {
        Self { name, ty, tag: None }
    }

    pub fn tagged(mut self, tag: FieldTag) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Marks a field whose value is computed from a sibling field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    /// Number of elements held by the named field.
    CountOf(&'static str),
    /// Encoded byte length of the named field.
    SizeOf(&'static str),
}

impl FieldTag {
    pub fn target(&self) -> &'static str {
        match self {
            FieldTag::CountOf(target) | FieldTag::SizeOf(target) => target,
        }
    }
}
