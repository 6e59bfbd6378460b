use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
};

use structex_varint::uint_len;

use crate::{shape::Shape, state::EncoderState, Encode, Result, TypeRef};

impl<T: Encode + 'static, const N: usize> Encode for [T; N] {
    fn type_ref() -> TypeRef {
        TypeRef::of::<[T; N]>()
    }

    fn shape() -> Shape {
        Shape::Array {
            elem: T::type_ref(),
            len: N,
        }
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        for item in self.iter() {
            item.encode(state)?;
        }
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        self.iter().map(Encode::encoded_len).sum()
    }

    fn element_count(&self) -> Option<usize> {
        Some(N)
    }
}

impl<T: Encode + 'static> Encode for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::of::<Vec<T>>()
    }

    fn shape() -> Shape {
        Shape::Slice {
            elem: T::type_ref(),
        }
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.encode_uint(self.len() as u64);
        self.encode_elements(state)
    }

    fn encoded_len(&self) -> usize {
        uint_len(self.len() as u64) + self.elements_len()
    }

    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        for item in self.iter() {
            item.encode(state)?;
        }
        Ok(())
    }

    fn elements_len(&self) -> usize {
        self.iter().map(Encode::encoded_len).sum()
    }
}

fn encode_pairs<'a, K, V, I>(pairs: I, state: &mut EncoderState) -> Result<()>
where
    K: Encode + 'a,
    V: Encode + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    for (key, value) in pairs {
        key.encode(state)?;
        value.encode(state)?;
    }
    Ok(())
}

fn pairs_len<'a, K, V, I>(pairs: I) -> usize
where
    K: Encode + 'a,
    V: Encode + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    pairs.map(|(k, v)| k.encoded_len() + v.encoded_len()).sum()
}

impl<K, V, S> Encode for HashMap<K, V, S>
where
    K: Encode + 'static,
    V: Encode + 'static,
    S: BuildHasher + 'static,
{
    fn type_ref() -> TypeRef {
        TypeRef::of::<HashMap<K, V, S>>()
    }

    fn shape() -> Shape {
        Shape::Map {
            key: K::type_ref(),
            elem: V::type_ref(),
        }
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.encode_uint(self.len() as u64);
        encode_pairs(self.iter(), state)
    }

    fn encoded_len(&self) -> usize {
        uint_len(self.len() as u64) + pairs_len(self.iter())
    }

    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        encode_pairs(self.iter(), state)
    }

    fn elements_len(&self) -> usize {
        pairs_len(self.iter())
    }
}

impl<K, V> Encode for BTreeMap<K, V>
where
    K: Encode + 'static,
    V: Encode + 'static,
{
    fn type_ref() -> TypeRef {
        TypeRef::of::<BTreeMap<K, V>>()
    }

    fn shape() -> Shape {
        Shape::Map {
            key: K::type_ref(),
            elem: V::type_ref(),
        }
    }

    fn encode(&self, state: &mut EncoderState) -> Result<()> {
        state.encode_uint(self.len() as u64);
        encode_pairs(self.iter(), state)
    }

    fn encoded_len(&self) -> usize {
        uint_len(self.len() as u64) + pairs_len(self.iter())
    }

    fn element_count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn encode_elements(&self, state: &mut EncoderState) -> Result<()> {
        encode_pairs(self.iter(), state)
    }

    fn elements_len(&self) -> usize {
        pairs_len(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded<T: Encode>(value: &T) -> Vec<u8> {
        let mut state = EncoderState::with_capacity(0);
        value.encode(&mut state).unwrap();
        assert_eq!(state.payload_len(), value.encoded_len());
        state.payload().to_vec()
    }

    #[test]
    fn array_has_no_count() {
        assert_eq!(encoded(&[1u8, 2, 3]), vec![1, 2, 3]);
        assert_eq!(encoded(&[0x0102u16; 2]), vec![1, 2, 1, 2]);
        assert_eq!([0u32; 4].element_count(), Some(4));
    }

    #[test]
    fn vec_is_count_prefixed() {
        assert_eq!(encoded(&vec![7u16, 8]), vec![2, 0, 7, 0, 8]);
        assert_eq!(encoded(&Vec::<u64>::new()), vec![0]);

        let v = vec![7u16, 8];
        let mut state = EncoderState::with_capacity(0);
        v.encode_elements(&mut state).unwrap();
        assert_eq!(state.payload(), &[0, 7, 0, 8]);
        assert_eq!(v.elements_len(), 4);
    }

    #[test]
    fn long_vec_count_takes_more_bytes() {
        let v = vec![0u8; 200];
        let bytes = encoded(&v);
        assert_eq!(&bytes[..2], &[0xff, 200]);
        assert_eq!(bytes.len(), 202);
    }

    #[test]
    fn btree_map_in_key_order() {
        let mut map = BTreeMap::new();
        map.insert(2u8, String::from("b"));
        map.insert(1u8, String::from("a"));
        assert_eq!(encoded(&map), vec![2, 1, 1, b'a', 2, 1, b'b']);
        assert_eq!(map.element_count(), Some(2));
    }

    #[test]
    fn hash_map_len_matches() {
        let mut map = HashMap::new();
        map.insert(String::from("one"), 1u32);
        map.insert(String::from("three"), 3u32);
        let bytes = encoded(&map);
        assert_eq!(bytes[0], 2);
        assert_eq!(map.elements_len(), bytes.len() - 1);
    }
}
