//! Binary archive backend.
//!
//! [`WBuffer`] and [`RBuffer`] are the primitive byte codec: fixed-width
//! little-endian scalars, length-prefixed strings, and the per-stream type
//! registry. [`Encoder`] and [`Decoder`] sit on top and drive the recursive
//! traversal engine over [`Value`]s.
//!
//! Custom codecs see the buffers only through the object-safe
//! [`BinaryWrite`] and [`BinaryRead`] traits, so they never depend on the
//! concrete stream type.

mod decoder;
mod encoder;
mod rbuffer;
mod wbuffer;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use rbuffer::RBuffer;
pub use wbuffer::WBuffer;

pub(crate) use decoder::decode_value;
pub(crate) use encoder::encode_value;

use crate::arch::Arch;
use crate::error::Result;
use crate::header::TypeDescr;
use crate::registry::TypeKey;
use crate::value::{Complex, Shape, Value};

/// Upper bound on capacity reserved up front from an untrusted count.
pub(crate) const PREALLOC_LIMIT: usize = 4096;

/// Write side of the binary byte codec.
///
/// Every method fails with the stream's first error once it is poisoned.
pub trait BinaryWrite {
    /// Framing of this stream's length fields.
    fn arch(&self) -> Arch;

    fn write_bool(&mut self, v: bool) -> Result<()>;
    fn write_u8(&mut self, v: u8) -> Result<()>;
    fn write_u16(&mut self, v: u16) -> Result<()>;
    fn write_u32(&mut self, v: u32) -> Result<()>;
    fn write_u64(&mut self, v: u64) -> Result<()>;
    fn write_i8(&mut self, v: i8) -> Result<()>;
    fn write_i16(&mut self, v: i16) -> Result<()>;
    fn write_i32(&mut self, v: i32) -> Result<()>;
    fn write_i64(&mut self, v: i64) -> Result<()>;
    fn write_f32(&mut self, v: f32) -> Result<()>;
    fn write_f64(&mut self, v: f64) -> Result<()>;

    fn write_c64(&mut self, v: Complex<f32>) -> Result<()> {
        self.write_f32(v.re)?;
        self.write_f32(v.im)
    }

    fn write_c128(&mut self, v: Complex<f64>) -> Result<()> {
        self.write_f64(v.re)?;
        self.write_f64(v.im)
    }

    /// Writes a length or element count at the stream's framing width.
    fn write_len(&mut self, n: u64) -> Result<()>;

    fn write_string(&mut self, s: &str) -> Result<()>;

    /// Writes bytes verbatim.
    fn write_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Writes a descriptor unconditionally, bypassing the registry.
    fn write_descr(&mut self, descr: &TypeDescr) -> Result<()>;

    /// Writes the descriptor for `key` unless this stream already has.
    fn write_type_descr(&mut self, key: &TypeKey) -> Result<()>;

    /// Encodes a value with the generic traversal rules.
    fn write_value(&mut self, value: &Value) -> Result<()>;
}

/// Read side of the binary byte codec.
pub trait BinaryRead {
    fn arch(&self) -> Arch;

    fn read_bool(&mut self) -> Result<bool>;
    fn read_u8(&mut self) -> Result<u8>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_u32(&mut self) -> Result<u32>;
    fn read_u64(&mut self) -> Result<u64>;
    fn read_i8(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_f32(&mut self) -> Result<f32>;
    fn read_f64(&mut self) -> Result<f64>;

    fn read_c64(&mut self) -> Result<Complex<f32>> {
        let re = self.read_f32()?;
        let im = self.read_f32()?;
        Ok(Complex::new(re, im))
    }

    fn read_c128(&mut self) -> Result<Complex<f64>> {
        let re = self.read_f64()?;
        let im = self.read_f64()?;
        Ok(Complex::new(re, im))
    }

    fn read_len(&mut self) -> Result<u64>;

    fn read_string(&mut self) -> Result<String>;

    /// Fills `buf` completely from the stream.
    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Reads a descriptor unconditionally, bypassing the registry.
    fn read_descr(&mut self) -> Result<TypeDescr>;

    /// Returns the descriptor for `key`, reading it from the stream on the
    /// first occurrence only.
    fn read_type_descr(&mut self, key: &TypeKey) -> Result<TypeDescr>;

    /// Decodes a value of the given shape with the generic traversal rules.
    fn read_value(&mut self, shape: &Shape) -> Result<Value>;
}
