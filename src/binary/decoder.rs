use std::io::Read;

use super::{BinaryRead, RBuffer, PREALLOC_LIMIT};
use crate::arch::Arch;
use crate::error::{Error, Result, StreamState};
use crate::header::Header;
use crate::options::DecoderOptions;
use crate::value::{Field, FixedArray, Mapping, Record, Sequence, Shape, Value};

/// Reads values from a binary archive.
///
/// The signature and header are consumed at construction; a stream that
/// does not carry them never yields a decoder.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    buf:    RBuffer<R>,
    header: Header,
    state:  StreamState,
}

impl<R: Read> Decoder<R> {
    pub fn new(r: R) -> Result<Self> {
        Self::with_options(r, &DecoderOptions::default())
    }

    pub fn with_options(r: R, opts: &DecoderOptions) -> Result<Self> {
        let mut buf = RBuffer::new(r);
        let header = buf.read_header(opts.arch)?;
        Ok(Self { buf, header, state: StreamState::HeaderRead })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Length-field framing the stream was written with.
    pub fn arch(&self) -> Arch {
        self.buf.arch()
    }

    pub fn state(&self) -> StreamState {
        match self.buf.err() {
            Some(_) => StreamState::Poisoned,
            None => self.state,
        }
    }

    /// Decodes the next value, which must have been written with `shape`.
    pub fn decode(&mut self, shape: &Shape) -> Result<Value> {
        let value = self.buf.read_value(shape)?;
        self.state = StreamState::Streaming;
        Ok(value)
    }

    pub fn get_ref(&self) -> &R {
        self.buf.get_ref()
    }

    pub fn into_inner(self) -> R {
        self.buf.into_inner()
    }
}

fn read_count(r: &mut dyn BinaryRead) -> Result<usize> {
    let n = r.read_len()?;
    usize::try_from(n).map_err(|_| Error::LengthOverflow(n))
}

fn read_items(r: &mut dyn BinaryRead, elem: &Shape, n: usize) -> Result<Vec<Value>> {
    let mut items = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for _ in 0..n {
        items.push(decode_value(r, elem)?);
    }
    Ok(items)
}

/// The binary traversal engine, decode side.
pub(crate) fn decode_value(r: &mut dyn BinaryRead, shape: &Shape) -> Result<Value> {
    Ok(match shape {
        Shape::Bool => Value::Bool(r.read_bool()?),
        Shape::I8 => Value::I8(r.read_i8()?),
        Shape::I16 => Value::I16(r.read_i16()?),
        Shape::I32 => Value::I32(r.read_i32()?),
        Shape::I64 => Value::I64(r.read_i64()?),
        Shape::U8 => Value::U8(r.read_u8()?),
        Shape::U16 => Value::U16(r.read_u16()?),
        Shape::U32 => Value::U32(r.read_u32()?),
        Shape::U64 => Value::U64(r.read_u64()?),
        Shape::F32 => Value::F32(r.read_f32()?),
        Shape::F64 => Value::F64(r.read_f64()?),
        Shape::Complex64 => Value::Complex64(r.read_c64()?),
        Shape::Complex128 => Value::Complex128(r.read_c128()?),
        Shape::String => Value::String(r.read_string()?),

        Shape::Record(rs) => {
            r.read_type_descr(&shape.type_key())?;
            let mut fields = Vec::with_capacity(rs.fields.len());
            for (name, fs) in &rs.fields {
                fields.push(Field { name: name.clone(), value: decode_value(r, fs)? });
            }
            Value::Record(Record { name: rs.name.clone(), fields })
        }

        Shape::FixedArray(elem, len) => {
            r.read_type_descr(&shape.type_key())?;
            let got = r.read_len()?;
            if got != *len as u64 {
                return Err(Error::InvalidArrayLen { expected: *len, got });
            }
            let items = read_items(r, elem, *len)?;
            Value::FixedArray(FixedArray { elem: (**elem).clone(), items })
        }

        Shape::Sequence(elem) => {
            r.read_type_descr(&shape.type_key())?;
            let n = read_count(r)?;
            let items = read_items(r, elem, n)?;
            Value::Sequence(Sequence { elem: (**elem).clone(), items })
        }

        Shape::Mapping(ks, vs) => {
            r.read_type_descr(&shape.type_key())?;
            let n = read_count(r)?;
            // reserved
            r.read_len()?;
            r.read_u8()?;
            let mut entries = Vec::with_capacity(n.min(PREALLOC_LIMIT));
            for _ in 0..n {
                let k = decode_value(r, ks)?;
                let v = decode_value(r, vs)?;
                entries.push((k, v));
            }
            Value::Mapping(Mapping { key: (**ks).clone(), value: (**vs).clone(), entries })
        }

        Shape::Custom(codec) => Value::Custom(codec.clone(), Box::new(codec.unmarshal_binary(r)?)),
    })
}
