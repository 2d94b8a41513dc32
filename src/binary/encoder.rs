use std::io::Write;

use super::{BinaryWrite, WBuffer};
use crate::error::{Result, StreamState};
use crate::header::Header;
use crate::options::EncoderOptions;
use crate::value::{check_items, Value};

/// Writes values to a binary archive.
///
/// The signature and header are written lazily, in front of the first
/// value, so an encoder that never encodes anything produces no bytes.
///
/// An encoder owns its stream exclusively and is meant to be driven from
/// one thread at a time.
#[derive(Debug)]
pub struct Encoder<W: Write> {
    buf:    WBuffer<W>,
    header: Header,
    state:  StreamState,
    values: u64,
}

impl<W: Write> Encoder<W> {
    pub fn new(w: W) -> Self {
        Self::with_options(w, &EncoderOptions::default())
    }

    pub fn with_options(w: W, opts: &EncoderOptions) -> Self {
        let mut header = opts.arch.header();
        header.version = opts.version;
        Self {
            buf: WBuffer::with_arch(w, opts.arch),
            header,
            state: StreamState::Fresh,
            values: 0,
        }
    }

    /// The header this encoder writes (or has written).
    pub fn header(&self) -> Header {
        self.header
    }

    pub fn state(&self) -> StreamState {
        match self.buf.err() {
            Some(_) => StreamState::Poisoned,
            None => self.state,
        }
    }

    /// Number of top-level values encoded so far.
    pub fn values(&self) -> u64 {
        self.values
    }

    /// Writes the signature and header now instead of before the first value.
    /// Does nothing if they are already on the stream.
    pub fn write_header(&mut self) -> Result<()> {
        if self.state != StreamState::Fresh {
            return self.buf.err().map_or(Ok(()), |err| Err(err.clone()));
        }
        let header = self.header;
        self.buf.write_header(&header)?;
        self.state = StreamState::HeaderWritten;
        Ok(())
    }

    pub fn encode(&mut self, value: &Value) -> Result<()> {
        self.write_header()?;
        self.buf.write_value(value)?;
        self.state = StreamState::Streaming;
        self.values += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.buf.flush()
    }

    pub fn get_ref(&self) -> &W {
        self.buf.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.buf.into_inner()
    }
}

/// The binary traversal engine, encode side.
pub(crate) fn encode_value(w: &mut dyn BinaryWrite, value: &Value) -> Result<()> {
    match value {
        Value::Bool(v) => w.write_bool(*v),
        Value::I8(v) => w.write_i8(*v),
        Value::I16(v) => w.write_i16(*v),
        Value::I32(v) => w.write_i32(*v),
        Value::I64(v) => w.write_i64(*v),
        Value::U8(v) => w.write_u8(*v),
        Value::U16(v) => w.write_u16(*v),
        Value::U32(v) => w.write_u32(*v),
        Value::U64(v) => w.write_u64(*v),
        Value::F32(v) => w.write_f32(*v),
        Value::F64(v) => w.write_f64(*v),
        Value::Complex64(v) => w.write_c64(*v),
        Value::Complex128(v) => w.write_c128(*v),
        Value::String(v) => w.write_string(v),

        Value::Record(rec) => {
            w.write_type_descr(&value.type_key())?;
            for field in &rec.fields {
                encode_value(w, &field.value)?;
            }
            Ok(())
        }

        Value::FixedArray(arr) => {
            check_items(&arr.elem, &arr.items)?;
            w.write_type_descr(&value.type_key())?;
            w.write_len(arr.items.len() as u64)?;
            for item in &arr.items {
                encode_value(w, item)?;
            }
            Ok(())
        }

        // Built-in sequences are pre-registered, so no descriptor goes out.
        Value::Sequence(seq) => {
            check_items(&seq.elem, &seq.items)?;
            w.write_type_descr(&value.type_key())?;
            w.write_len(seq.items.len() as u64)?;
            for item in &seq.items {
                encode_value(w, item)?;
            }
            Ok(())
        }

        Value::Mapping(map) => {
            check_items(&map.key, map.entries.iter().map(|(k, _)| k))?;
            check_items(&map.value, map.entries.iter().map(|(_, v)| v))?;
            w.write_type_descr(&value.type_key())?;
            w.write_len(map.entries.len() as u64)?;
            // reserved
            w.write_len(0)?;
            w.write_u8(0)?;
            for (k, v) in &map.entries {
                encode_value(w, k)?;
                encode_value(w, v)?;
            }
            Ok(())
        }

        Value::Custom(codec, inner) => codec.marshal_binary(inner, w),
    }
}
