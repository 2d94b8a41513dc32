use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use super::{encode_value, BinaryWrite};
use crate::arch::Arch;
use crate::error::{Error, Result, Sticky};
use crate::header::{Header, TypeDescr, MAGIC};
use crate::registry::{Registry, TypeKey};
use crate::value::Value;

/// Binary write buffer.
///
/// Owns the output stream, the stream's sticky error, and the registry of
/// descriptors already emitted on it.
#[derive(Debug)]
pub struct WBuffer<W: Write> {
    w:     W,
    err:   Sticky,
    arch:  Arch,
    types: Registry<TypeDescr>,
}

impl<W: Write> WBuffer<W> {
    pub fn new(w: W) -> Self {
        Self::with_arch(w, Arch::Native)
    }

    pub fn with_arch(w: W, arch: Arch) -> Self {
        Self {
            w,
            err:   Sticky::default(),
            arch:  arch.resolve(),
            types: Registry::new(),
        }
    }

    /// Writes the signature and `header`.
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        self.write_string(MAGIC)?;
        self.put(|w| header.write(w))?;
        tracing::debug!(
            version = header.version,
            flags = format_args!("{:#018x}", header.flags),
            arch = ?self.arch,
            "wrote archive header"
        );
        Ok(())
    }

    /// First error the stream ran into, if any.
    pub fn err(&self) -> Option<&Error> {
        self.err.get()
    }

    pub fn registry(&self) -> &Registry<TypeDescr> {
        &self.types
    }

    pub fn get_ref(&self) -> &W {
        &self.w
    }

    pub fn flush(&mut self) -> Result<()> {
        self.put(|w| w.flush())
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    #[inline]
    fn put(&mut self, f: impl FnOnce(&mut W) -> io::Result<()>) -> Result<()> {
        self.err.check()?;
        let res = f(&mut self.w);
        self.err.io(res)
    }
}

impl<W: Write> BinaryWrite for WBuffer<W> {
    fn arch(&self) -> Arch {
        self.arch
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(v as u8)
    }

    fn write_u8(&mut self, v: u8) -> Result<()> {
        self.put(|w| w.write_u8(v))
    }

    fn write_u16(&mut self, v: u16) -> Result<()> {
        self.put(|w| w.write_u16::<LittleEndian>(v))
    }

    fn write_u32(&mut self, v: u32) -> Result<()> {
        self.put(|w| w.write_u32::<LittleEndian>(v))
    }

    fn write_u64(&mut self, v: u64) -> Result<()> {
        self.put(|w| w.write_u64::<LittleEndian>(v))
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.put(|w| w.write_i8(v))
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.put(|w| w.write_i16::<LittleEndian>(v))
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.put(|w| w.write_i32::<LittleEndian>(v))
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.put(|w| w.write_i64::<LittleEndian>(v))
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        self.put(|w| w.write_f32::<LittleEndian>(v))
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        self.put(|w| w.write_f64::<LittleEndian>(v))
    }

    fn write_len(&mut self, n: u64) -> Result<()> {
        match self.arch {
            Arch::Arch32 => match u32::try_from(n) {
                Ok(n) => self.write_u32(n),
                Err(_) => {
                    self.err.check()?;
                    Err(self.err.fail(Error::LengthOverflow(n)))
                }
            },
            _ => self.write_u64(n),
        }
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_len(s.len() as u64)?;
        if s.is_empty() {
            return Ok(());
        }
        self.write_raw(s.as_bytes())
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.put(|w| w.write_all(bytes))
    }

    fn write_descr(&mut self, descr: &TypeDescr) -> Result<()> {
        self.put(|w| descr.write(w))
    }

    fn write_type_descr(&mut self, key: &TypeKey) -> Result<()> {
        self.err.check()?;
        if self.types.contains(key) {
            return Ok(());
        }
        let descr = TypeDescr::default();
        self.write_descr(&descr)?;
        tracing::trace!(key = %key, version = descr.version, flags = descr.flags, "wrote type descriptor");
        self.types.insert(key.clone(), descr);
        Ok(())
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        self.err.check()?;
        let res = encode_value(self, value);
        self.err.guard(res)
    }
}
