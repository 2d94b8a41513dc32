//! Reader and writer for C++ Boost.Serialization archives.
//!
//! Values are modelled dynamically as [`Value`]s and requested by
//! [`Shape`], so arbitrary C++ class layouts can be read and written
//! without generated code.
//!
//! ```
//! use boost_archive::{binary, Record, RecordShape, Shape, Value};
//!
//! let pet = Value::from(Record::new("animal").field("name", "cat").field("legs", 4i16));
//!
//! let mut enc = binary::Encoder::new(Vec::new());
//! enc.encode(&pet)?;
//! enc.encode(&Value::from("hello"))?;
//! let bytes = enc.into_inner();
//!
//! let mut dec = binary::Decoder::new(&bytes[..])?;
//! let shape = RecordShape::new("animal").field("name", Shape::String).field("legs", Shape::I16);
//! assert_eq!(dec.decode(&Shape::Record(shape))?, pet);
//! assert_eq!(dec.decode(&Shape::String)?, Value::from("hello"));
//! # Ok::<(), boost_archive::Error>(())
//! ```

pub mod arch;
pub mod binary;
pub mod error;
pub mod header;
pub mod options;
pub mod registry;
pub mod value;
pub mod xml;

pub use arch::{Arch, ArchProfile, Endianness};
pub use error::{Error, Result, StreamState};
pub use header::{Header, TypeDescr, ARCHIVE_VERSION, MAGIC};
pub use options::{DecoderOptions, EncoderOptions};
pub use registry::{Registry, TypeKey};
pub use value::{
    Complex, CustomCodec, Field, FixedArray, Mapping, Record, RecordShape, Sequence, Shape, Value,
};
