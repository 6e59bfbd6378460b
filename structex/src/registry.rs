//! Type ids and descriptor transmission.
//!
//! Every type an encoder meets gets an id: primitives use their fixed
//! [`Primitive::id`], everything else is numbered from [`FIRST_USER_ID`] in
//! the order the types are first met (the type itself, then its fields or
//! elements in declaration order). Ids are assigned when a type is first
//! inspected, so a descriptor can refer to nested types before their own
//! descriptors go out.
//!
//! A descriptor message starts with the negated type id followed by the
//! kind and the ids of the nested types:
//!
//! ```text
//! struct:   1 name field_count { name type_id tag }*
//!           tag = 0 | 1 target_index | 2 target_index
//! array:    2 elem_id len
//! slice:    3 elem_id
//! map:      4 key_id elem_id
//! external: 5 name
//! ```

use std::{any::TypeId, sync::Arc};

use fnv::FnvHashMap;

use crate::{
    frame,
    shape::{FieldTag, Primitive, Shape, StructShape, TypeRef},
    state::EncoderState,
    writer::Sink,
    EncodeError, Result,
};

/// First id handed out to a type that is not a primitive.
pub const FIRST_USER_ID: i64 = 64;

pub const KIND_STRUCT: u64 = 1;
pub const KIND_ARRAY: u64 = 2;
pub const KIND_SLICE: u64 = 3;
pub const KIND_MAP: u64 = 4;
pub const KIND_EXTERNAL: u64 = 5;

pub const TAG_NONE: u64 = 0;
pub const TAG_COUNT_OF: u64 = 1;
pub const TAG_SIZE_OF: u64 = 2;

#[derive(Debug)]
pub(crate) struct TypeInfo {
    /// `0` for opaque types, which never get an id.
    pub(crate) id: i64,
    pub(crate) name: &'static str,
    pub(crate) shape: Shape,
}

impl TypeInfo {
    fn is_opaque(&self) -> bool {
        matches!(self.shape, Shape::Opaque { .. })
    }
}

/// Per encoder table of inspected types and transmitted descriptors.
#[derive(Debug)]
pub(crate) struct TypeRegistry {
    infos: FnvHashMap<TypeId, Arc<TypeInfo>>,
    sent: FnvHashMap<TypeId, i64>,
    next_id: i64,
}

impl TypeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            infos: FnvHashMap::default(),
            sent: FnvHashMap::default(),
            next_id: FIRST_USER_ID,
        }
    }

    /// Id the type was registered under in the sent set.
    pub(crate) fn sent_id(&self, ty: &TypeRef) -> Option<i64> {
        self.sent.get(&ty.key()).copied()
    }

    pub(crate) fn sent_len(&self) -> usize {
        self.sent.len()
    }

    /// Inspect `ty` and everything it refers to, assigning ids on the way.
    ///
    /// Struct tags are validated here, so a bad tag fails before the first
    /// value of the struct is written. On failure every type inspected by
    /// this call is forgotten again and its ids are handed out anew.
    pub(crate) fn info(&mut self, ty: TypeRef) -> Result<Arc<TypeInfo>> {
        let next_id = self.next_id;
        let mut added = Vec::new();
        let result = self.inspect(ty, &mut added);
        if result.is_err() {
            for key in added {
                self.infos.remove(&key);
            }
            self.next_id = next_id;
        }
        result
    }

    fn inspect(&mut self, ty: TypeRef, added: &mut Vec<TypeId>) -> Result<Arc<TypeInfo>> {
        if let Some(info) = self.infos.get(&ty.key()) {
            return Ok(info.clone());
        }

        let shape = ty.shape();
        let id = match &shape {
            Shape::Primitive(p) => p.id(),
            Shape::Slice { elem } if elem.is_byte() => Primitive::Bytes.id(),
            Shape::Opaque { .. } => 0,
            _ => {
                let id = self.next_id;
                self.next_id += 1;
                log::debug!("assigned type id {} to {}", id, ty.name());
                id
            }
        };

        let info = Arc::new(TypeInfo {
            id,
            name: ty.name(),
            shape,
        });
        // Registered before descending so recursive types terminate.
        self.infos.insert(ty.key(), info.clone());
        added.push(ty.key());

        self.inspect_nested(&info, added)?;
        Ok(info)
    }

    fn inspect_nested(&mut self, info: &TypeInfo, added: &mut Vec<TypeId>) -> Result<()> {
        match &info.shape {
            Shape::Struct(s) => {
                for field in s.fields.iter() {
                    self.inspect(field.ty, added)?;
                }
                self.validate_tags(s)
            }
            Shape::Array { elem, .. } | Shape::Slice { elem } => self.element(*elem, added),
            Shape::Map { key, elem } => {
                self.element(*key, added)?;
                self.element(*elem, added)
            }
            Shape::Primitive(_) | Shape::External { .. } | Shape::Opaque { .. } => Ok(()),
        }
    }

    /// Element and key types must be encodable on their own.
    fn element(&mut self, ty: TypeRef, added: &mut Vec<TypeId>) -> Result<()> {
        let info = self.inspect(ty, added)?;
        if let Shape::Opaque { name } = info.shape {
            return Err(EncodeError::UnencodableType(name));
        }
        Ok(())
    }

    /// Info of a type inspected earlier.
    fn known(&self, ty: &TypeRef) -> Result<&Arc<TypeInfo>> {
        self.infos
            .get(&ty.key())
            .ok_or(EncodeError::UnencodableType(ty.name()))
    }

    fn validate_tags(&self, s: &StructShape) -> Result<()> {
        for field in s.fields.iter() {
            let tag = match field.tag {
                Some(tag) => tag,
                None => continue,
            };
            let malformed = |reason: String| EncodeError::MalformedTag {
                ty: s.name,
                field: field.name,
                reason,
            };

            match &self.known(&field.ty)?.shape {
                Shape::Primitive(p) if p.is_unsigned() => {}
                other => {
                    return Err(malformed(format!(
                        "derived field must be an unsigned integer, found {}",
                        other.kind_name()
                    )))
                }
            }

            let target = match s.field(tag.target()) {
                Some((_, target)) if target.name != field.name => target,
                Some(_) => return Err(malformed("field refers to itself".to_string())),
                None => return Err(malformed(format!("no sibling field named `{}`", tag.target()))),
            };
            let target_info = self.known(&target.ty)?;
            if target_info.is_opaque() {
                return Err(malformed(format!("`{}` is not encoded", target.name)));
            }
            if let FieldTag::CountOf(_) = tag {
                if !target_info.shape.is_countable() {
                    return Err(malformed(format!(
                        "`{}` is a {} and has no element count",
                        target.name,
                        target_info.shape.kind_name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Make sure the descriptor of `ty` has been transmitted and return the
    /// id a value of `ty` is announced with.
    ///
    /// Types that never get a descriptor of their own (primitives, byte
    /// slices) are still recorded in the sent set with their fixed id.
    pub(crate) fn ensure_sent<W: Sink + ?Sized>(
        &mut self,
        sink: &mut W,
        state: &mut EncoderState,
        ty: TypeRef,
        max_message_len: usize,
    ) -> Result<i64> {
        if let Some(id) = self.sent_id(&ty) {
            return Ok(id);
        }

        let info = self.info(ty)?;
        if let Shape::Opaque { name } = info.shape {
            return Err(EncodeError::UnencodableType(name));
        }
        if !self.send_type(sink, state, ty, max_message_len)? {
            self.sent.insert(ty.key(), info.id);
        }
        Ok(info.id)
    }

    /// Transmit the descriptor of `ty` and of the types it refers to, unless
    /// already done. Returns whether a descriptor for `ty` itself went out.
    ///
    /// If any descriptor fails to go out, none of the types this call
    /// described stay in the sent set, so the next call sends them all again.
    pub(crate) fn send_type<W: Sink + ?Sized>(
        &mut self,
        sink: &mut W,
        state: &mut EncoderState,
        ty: TypeRef,
        max_message_len: usize,
    ) -> Result<bool> {
        let mut added = Vec::new();
        let result = self.send_tree(sink, state, ty, max_message_len, &mut added);
        if result.is_err() {
            for key in added {
                self.sent.remove(&key);
            }
        }
        result
    }

    fn send_tree<W: Sink + ?Sized>(
        &mut self,
        sink: &mut W,
        state: &mut EncoderState,
        ty: TypeRef,
        max_message_len: usize,
        added: &mut Vec<TypeId>,
    ) -> Result<bool> {
        let info = self.info(ty)?;
        match &info.shape {
            Shape::External { .. } => {}
            Shape::Primitive(_) | Shape::Opaque { .. } => return Ok(false),
            Shape::Slice { elem } if elem.is_byte() => return Ok(false),
            Shape::Struct(_) | Shape::Array { .. } | Shape::Slice { .. } | Shape::Map { .. } => {}
        }

        if self.sent.contains_key(&ty.key()) {
            return Ok(false);
        }

        if let Err(err) = self.write_descriptor(&info, state) {
            state.reset();
            return Err(err);
        }
        frame::write_message(sink, state, max_message_len)?;
        self.sent.insert(ty.key(), info.id);
        added.push(ty.key());
        log::debug!("sent descriptor of {} as type id {}", info.name, info.id);

        match &info.shape {
            Shape::Struct(s) => {
                for field in s.fields.iter() {
                    self.send_tree(sink, state, field.ty, max_message_len, added)?;
                }
            }
            Shape::Array { elem, .. } | Shape::Slice { elem } => {
                self.send_tree(sink, state, *elem, max_message_len, added)?;
            }
            Shape::Map { key, elem } => {
                self.send_tree(sink, state, *key, max_message_len, added)?;
                self.send_tree(sink, state, *elem, max_message_len, added)?;
            }
            Shape::Primitive(_) | Shape::External { .. } | Shape::Opaque { .. } => {}
        }
        Ok(true)
    }

    fn id_of(&self, ty: &TypeRef) -> Result<i64> {
        self.known(ty).map(|info| info.id)
    }

    /// Append the descriptor payload of `info` to `state`.
    fn write_descriptor(&self, info: &TypeInfo, state: &mut EncoderState) -> Result<()> {
        state.encode_int(-info.id);
        match &info.shape {
            Shape::Struct(s) => {
                // Opaque fields are left out of both the descriptor and the body.
                let mut described = Vec::with_capacity(s.fields.len());
                for field in s.fields.iter() {
                    if !self.known(&field.ty)?.is_opaque() {
                        described.push(field);
                    }
                }

                state.encode_uint(KIND_STRUCT);
                state.encode_str(s.name);
                state.encode_uint(described.len() as u64);
                for field in described.iter() {
                    state.encode_str(field.name);
                    state.encode_int(self.id_of(&field.ty)?);
                    match field.tag {
                        None => state.encode_uint(TAG_NONE),
                        Some(tag) => {
                            let kind = match tag {
                                FieldTag::CountOf(_) => TAG_COUNT_OF,
                                FieldTag::SizeOf(_) => TAG_SIZE_OF,
                            };
                            let index = described
                                .iter()
                                .position(|f| f.name == tag.target())
                                .ok_or_else(|| EncodeError::MalformedTag {
                                    ty: s.name,
                                    field: field.name,
                                    reason: format!("`{}` is not described", tag.target()),
                                })?;
                            state.encode_uint(kind);
                            state.encode_uint(index as u64);
                        }
                    }
                }
            }
            Shape::Array { elem, len } => {
                state.encode_uint(KIND_ARRAY);
                state.encode_int(self.id_of(elem)?);
                state.encode_uint(*len as u64);
            }
            Shape::Slice { elem } => {
                state.encode_uint(KIND_SLICE);
                state.encode_int(self.id_of(elem)?);
            }
            Shape::Map { key, elem } => {
                state.encode_uint(KIND_MAP);
                state.encode_int(self.id_of(key)?);
                state.encode_int(self.id_of(elem)?);
            }
            Shape::External { name } => {
                state.encode_uint(KIND_EXTERNAL);
                state.encode_str(name);
            }
            Shape::Primitive(_) | Shape::Opaque { .. } => {}
        }
        Ok(())
    }
}
