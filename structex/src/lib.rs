//! Self-describing binary encoding of Rust values.
//!
//! An [`Encoder`] writes a stream of length framed messages. Before the first
//! value of a type it sends descriptor messages for that type and everything
//! it is built from, so a reader needs no schema. Struct fields can be
//! derived at encode time from their siblings:
//!
//! ```
//! use structex::{Encode, Encoder};
//!
//! #[derive(Encode)]
//! struct Packet {
//!     #[structex(count_of = "payload")]
//!     len: u16,
//!     payload: Vec<u8>,
//! }
//!
//! let encoder = Encoder::new(Vec::new());
//! encoder.encode(&Packet { len: 0, payload: vec![1, 2, 3] }).unwrap();
//! ```

extern crate self as structex;

mod config;
mod encode;
mod encoder;
mod error;
mod frame;
pub mod parse;
mod registry;
pub mod resolve;
mod shape;
mod state;
mod writer;

pub use config::Config;
pub use encode::{Encode, Marshal};
pub use encoder::Encoder;
pub use error::{EncodeError, Result};
pub use registry::FIRST_USER_ID;
pub use shape::{FieldShape, FieldTag, Primitive, Shape, StructShape, TypeRef};
pub use state::{EncoderState, RESERVED_PREFIX};
pub use writer::Sink;

#[cfg(feature = "derive")]
pub use structex_derive::Encode;

#[doc(hidden)]
pub mod __private {
    pub use structex_varint::uint_len;
}
