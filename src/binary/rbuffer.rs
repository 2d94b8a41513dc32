use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use super::{decode_value, BinaryRead, PREALLOC_LIMIT};
use crate::arch::Arch;
use crate::error::{Error, Result, Sticky};
use crate::header::{Header, TypeDescr, MAGIC};
use crate::registry::{Registry, TypeKey};
use crate::value::{Shape, Value};

/// Binary read buffer.
///
/// Owns the input stream, the stream's sticky error, and the registry of
/// descriptors already consumed from it.
#[derive(Debug)]
pub struct RBuffer<R: Read> {
    r:     R,
    err:   Sticky,
    arch:  Arch,
    types: Registry<TypeDescr>,
}

impl<R: Read> RBuffer<R> {
    pub fn new(r: R) -> Self {
        Self::with_arch(r, Arch::Native)
    }

    pub fn with_arch(r: R, arch: Arch) -> Self {
        Self {
            r,
            err:   Sticky::default(),
            arch:  arch.resolve(),
            types: Registry::new(),
        }
    }

    /// Reads and validates the signature, then the header fields.
    ///
    /// With `forced` unset, the framing is inferred from the signature's
    /// length prefix: a 32-bit prefix is immediately followed by the first
    /// signature bytes, a 64-bit one by four zero bytes.
    ///
    /// A stream that is too short to hold a signature is
    /// [`Error::NotBoost`]; once the signature matched, any failure reading
    /// the header fields is [`Error::InvalidHeader`].
    pub fn read_header(&mut self, forced: Option<Arch>) -> Result<Header> {
        self.err.check()?;
        let res = self.read_signature(forced);
        let arch = self.err.guard(res)?;
        self.arch = arch;

        let res = Header::read(&mut self.r).map_err(|_| Error::InvalidHeader);
        let header = self.err.guard(res)?;
        tracing::debug!(
            version = header.version,
            flags = format_args!("{:#018x}", header.flags),
            arch = ?arch,
            "read archive header"
        );
        Ok(header)
    }

    fn read_signature(&mut self, forced: Option<Arch>) -> Result<Arch> {
        let magic = MAGIC.as_bytes();
        let mut lead = [0u8; 8];
        self.r.read_exact(&mut lead).map_err(not_boost)?;

        let arch = match forced {
            Some(arch) => arch.resolve(),
            None if lead[4..] == magic[..4] => Arch::Arch32,
            None => Arch::Arch64,
        };

        let mut sig = [0u8; MAGIC.len()];
        match arch {
            Arch::Arch32 => {
                if LittleEndian::read_u32(&lead[..4]) as usize != magic.len() {
                    return Err(mismatch(&lead));
                }
                sig[..4].copy_from_slice(&lead[4..]);
                self.r.read_exact(&mut sig[4..]).map_err(not_boost)?;
            }
            _ => {
                if LittleEndian::read_u64(&lead) != magic.len() as u64 {
                    return Err(mismatch(&lead));
                }
                self.r.read_exact(&mut sig).map_err(not_boost)?;
            }
        }
        if sig[..] != *magic {
            return Err(mismatch(&sig));
        }
        Ok(arch)
    }

    pub fn err(&self) -> Option<&Error> {
        self.err.get()
    }

    pub fn registry(&self) -> &Registry<TypeDescr> {
        &self.types
    }

    pub fn get_ref(&self) -> &R {
        &self.r
    }

    pub fn into_inner(self) -> R {
        self.r
    }

    #[inline]
    fn get<T>(&mut self, f: impl FnOnce(&mut R) -> io::Result<T>) -> Result<T> {
        self.err.check()?;
        let res = f(&mut self.r);
        self.err.io(res)
    }
}

fn mismatch(bytes: &[u8]) -> Error {
    tracing::debug!(bytes = %hex::encode(bytes), "archive signature mismatch");
    Error::NotBoost
}

/// Short reads while matching the signature mean "not this format".
fn not_boost(err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => Error::NotBoost,
        _ => err.into(),
    }
}

impl<R: Read> BinaryRead for RBuffer<R> {
    fn arch(&self) -> Arch {
        self.arch
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.get(|r| r.read_u8())
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.get(|r| r.read_u16::<LittleEndian>())
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.get(|r| r.read_u32::<LittleEndian>())
    }

    fn read_u64(&mut self) -> Result<u64> {
        self.get(|r| r.read_u64::<LittleEndian>())
    }

    fn read_i8(&mut self) -> Result<i8> {
        self.get(|r| r.read_i8())
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.get(|r| r.read_i16::<LittleEndian>())
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.get(|r| r.read_i32::<LittleEndian>())
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.get(|r| r.read_i64::<LittleEndian>())
    }

    fn read_f32(&mut self) -> Result<f32> {
        self.get(|r| r.read_f32::<LittleEndian>())
    }

    fn read_f64(&mut self) -> Result<f64> {
        self.get(|r| r.read_f64::<LittleEndian>())
    }

    fn read_len(&mut self) -> Result<u64> {
        match self.arch {
            Arch::Arch32 => self.read_u32().map(u64::from),
            _ => self.read_u64(),
        }
    }

    fn read_string(&mut self) -> Result<String> {
        let n = self.read_len()?;
        if n == 0 {
            return Ok(String::new());
        }

        let cap = usize::try_from(n).unwrap_or(usize::MAX).min(PREALLOC_LIMIT);
        let mut bytes = Vec::with_capacity(cap);
        let res = (&mut self.r).take(n).read_to_end(&mut bytes);
        let got = self.err.io(res)?;
        if (got as u64) < n {
            return Err(self.err.fail(Error::UnexpectedEof));
        }
        String::from_utf8(bytes).map_err(|_| self.err.fail(Error::InvalidUtf8))
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> Result<()> {
        self.get(|r| r.read_exact(buf))
    }

    fn read_descr(&mut self) -> Result<TypeDescr> {
        self.err.check()?;
        let res = TypeDescr::read(&mut self.r).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::InvalidTypeDescr,
            _ => err.into(),
        });
        self.err.guard(res)
    }

    fn read_type_descr(&mut self, key: &TypeKey) -> Result<TypeDescr> {
        self.err.check()?;
        if let Some(descr) = self.types.get(key) {
            return Ok(*descr);
        }
        let descr = self.read_descr()?;
        tracing::trace!(key = %key, version = descr.version, flags = descr.flags, "read type descriptor");
        self.types.insert(key.clone(), descr);
        Ok(descr)
    }

    fn read_value(&mut self, shape: &Shape) -> Result<Value> {
        self.err.check()?;
        let res = decode_value(self, shape);
        self.err.guard(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_is_eof() {
        let mut buf = RBuffer::with_arch(&[5u8, 0, 0, 0, b'h', b'e'][..], Arch::Arch32);
        assert_eq!(buf.read_string(), Err(Error::UnexpectedEof));
        assert_eq!(buf.read_u8(), Err(Error::UnexpectedEof));
    }

    #[test]
    fn invalid_utf8() {
        let mut buf = RBuffer::with_arch(&[2u8, 0, 0, 0, 0xff, 0xfe][..], Arch::Arch32);
        assert_eq!(buf.read_string(), Err(Error::InvalidUtf8));
    }

    #[test]
    fn empty_string_reads_nothing_more() {
        let mut buf = RBuffer::with_arch(&[0u8, 0, 0, 0, 7][..], Arch::Arch32);
        assert_eq!(buf.read_string().unwrap(), "");
        assert_eq!(buf.read_u8().unwrap(), 7);
    }

    #[test]
    fn truncated_descriptor_is_invalid() {
        let key = TypeKey::Record(vec![TypeKey::U8]);
        let mut buf = RBuffer::new(&[0u8, 0, 0][..]);
        assert_eq!(buf.read_type_descr(&key), Err(Error::InvalidTypeDescr));
        assert_eq!(buf.read_type_descr(&TypeKey::U8), Err(Error::InvalidTypeDescr));
    }

    #[test]
    fn cached_descriptor_costs_nothing() {
        let key = TypeKey::Record(vec![TypeKey::U8]);
        let mut buf = RBuffer::new(&[3u8, 0, 0, 0, 1, 9][..]);
        assert_eq!(buf.read_type_descr(&key).unwrap(), TypeDescr { version: 3, flags: 1 });
        assert_eq!(buf.read_type_descr(&key).unwrap(), TypeDescr { version: 3, flags: 1 });
        assert_eq!(buf.read_u8().unwrap(), 9);
    }
}
