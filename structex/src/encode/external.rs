//! Types that bring their own binary form, and types that have none.

use std::{
    net::{Ipv4Addr, Ipv6Addr},
    sync::mpsc::{Receiver, Sender, SyncSender},
    time::Duration,
};

use crate::{shape::Shape, state::EncoderState, Encode, Result, TypeRef};

/// Custom binary form of a type.
///
/// Hook a type up with [`external_encoding!`](crate::external_encoding):
/// its descriptor then only names the type, and its body is the marshaled
/// bytes behind a uvarint length.
pub trait Marshal {
    fn marshal(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Length of the marshaled bytes.
    ///
    /// The default marshals into a scratch buffer and reports `0` when that
    /// fails. A `size_of` sibling computed from it is never sent: the
    /// value's own body marshals again, fails the same way and the whole
    /// message is dropped.
    fn marshaled_len(&self) -> usize {
        let mut scratch = Vec::new();
        match self.marshal(&mut scratch) {
            Ok(()) => scratch.len(),
            Err(_) => 0,
        }
    }
}

/// Implement [`Encode`] for types that implement [`Marshal`].
#[macro_export]
macro_rules! external_encoding {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Encode for $ty {
                fn type_ref() -> $crate::TypeRef {
                    $crate::TypeRef::named::<$ty>(stringify!($ty))
                }

                fn shape() -> $crate::Shape {
                    $crate::Shape::External {
                        name: stringify!($ty),
                    }
                }

                fn encode(&self, state: &mut $crate::EncoderState) -> $crate::Result<()> {
                    let mut scratch = ::std::vec::Vec::new();
                    $crate::Marshal::marshal(self, &mut scratch)?;
                    state.encode_uint(scratch.len() as u64);
                    state.write_bytes(&scratch);
                    Ok(())
                }

                fn encoded_len(&self) -> usize {
                    let len = $crate::Marshal::marshaled_len(self);
                    $crate::__private::uint_len(len as u64) + len
                }
            }
        )+
    };
}

impl Marshal for Ipv4Addr {
    fn marshal(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.octets());
        Ok(())
    }

    fn marshaled_len(&self) -> usize {
        4
    }
}

impl Marshal for Ipv6Addr {
    fn marshal(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.octets());
        Ok(())
    }

    fn marshaled_len(&self) -> usize {
        16
    }
}

/// Seconds followed by nanoseconds, both big-endian.
impl Marshal for Duration {
    fn marshal(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.as_secs().to_be_bytes());
        out.extend_from_slice(&self.subsec_nanos().to_be_bytes());
        Ok(())
    }

    fn marshaled_len(&self) -> usize {
        12
    }
}

external_encoding!(Ipv4Addr, Ipv6Addr, Duration);

macro_rules! opaque {
    ($($wrapper:ident => $name:literal),*) => {
        $(
            impl<T: 'static> Encode for $wrapper<T> {
                fn type_ref() -> TypeRef {
                    TypeRef::named::<$wrapper<T>>($name)
                }

                fn shape() -> Shape {
                    Shape::Opaque { name: $name }
                }

                fn encode(&self, _state: &mut EncoderState) -> Result<()> {
                    Ok(())
                }

                fn encoded_len(&self) -> usize {
                    0
                }
            }
        )*
    };
}

opaque!(Sender => "Sender", SyncSender => "SyncSender", Receiver => "Receiver");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_is_length_prefixed_octets() {
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        let mut state = EncoderState::with_capacity(0);
        addr.encode(&mut state).unwrap();
        assert_eq!(state.payload(), &[4, 10, 0, 0, 1]);
        assert_eq!(addr.encoded_len(), 5);
        assert_eq!(Ipv4Addr::shape(), Shape::External { name: "Ipv4Addr" });
    }

    #[test]
    fn duration_layout() {
        let d = Duration::new(2, 5);
        let mut state = EncoderState::with_capacity(0);
        d.encode(&mut state).unwrap();
        assert_eq!(state.payload(), &[12, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 5]);
        assert_eq!(d.encoded_len(), 13);
    }

    #[test]
    fn channels_encode_to_nothing() {
        let (tx, _rx) = std::sync::mpsc::channel::<u8>();
        let mut state = EncoderState::with_capacity(0);
        tx.encode(&mut state).unwrap();
        assert_eq!(state.payload_len(), 0);
        assert_eq!(<Sender<u8> as Encode>::shape(), Shape::Opaque { name: "Sender" });
    }

    struct Celsius(f32);

    impl Marshal for Celsius {
        fn marshal(&self, out: &mut Vec<u8>) -> Result<()> {
            out.extend_from_slice(format!("{:.1}C", self.0).as_bytes());
            Ok(())
        }
    }

    external_encoding!(Celsius);

    #[test]
    fn default_marshaled_len() {
        let c = Celsius(21.5);
        assert_eq!(c.marshaled_len(), 5);
        assert_eq!(c.encoded_len(), 6);
        let mut state = EncoderState::with_capacity(0);
        c.encode(&mut state).unwrap();
        assert_eq!(state.payload(), b"\x0521.5C");
    }
}
