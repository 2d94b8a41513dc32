use std::io::Write;

use super::{WBuffer, XmlHeader, XmlWrite, ITEM};
use crate::error::{Result, StreamState};
use crate::options::EncoderOptions;
use crate::registry::TypeKey;
use crate::value::{check_items, Value};

/// Writes values to an XML archive.
///
/// As with the binary encoder the prolog is written lazily; call
/// [`finish`](Encoder::finish) to close the root element.
#[derive(Debug)]
pub struct Encoder<W: Write> {
    buf:    WBuffer<W>,
    header: XmlHeader,
    state:  StreamState,
    values: u64,
}

impl<W: Write> Encoder<W> {
    pub fn new(w: W) -> Self {
        Self::with_options(w, &EncoderOptions::default())
    }

    /// Only `version` applies; XML has no length-field framing.
    pub fn with_options(w: W, opts: &EncoderOptions) -> Self {
        Self {
            buf:    WBuffer::new(w),
            header: XmlHeader { version: opts.version },
            state:  StreamState::Fresh,
            values: 0,
        }
    }

    pub fn header(&self) -> XmlHeader {
        self.header
    }

    pub fn state(&self) -> StreamState {
        match self.buf.err() {
            Some(_) => StreamState::Poisoned,
            None => self.state,
        }
    }

    pub fn values(&self) -> u64 {
        self.values
    }

    pub fn write_header(&mut self) -> Result<()> {
        if self.state != StreamState::Fresh {
            return self.buf.err().map_or(Ok(()), |err| Err(err.clone()));
        }
        let header = self.header;
        self.buf.write_header(&header)?;
        self.state = StreamState::HeaderWritten;
        Ok(())
    }

    /// Encodes `value` as an element named `item`.
    pub fn encode(&mut self, value: &Value) -> Result<()> {
        self.encode_named(ITEM, value)
    }

    pub fn encode_named(&mut self, name: &str, value: &Value) -> Result<()> {
        self.write_header()?;
        self.buf.write_value(name, value)?;
        self.state = StreamState::Streaming;
        self.values += 1;
        Ok(())
    }

    /// Closes the archive and returns the underlying writer. An encoder
    /// that never wrote its header writes nothing here either.
    pub fn finish(mut self) -> Result<W> {
        if let Some(err) = self.buf.err() {
            return Err(err.clone());
        }
        if self.state != StreamState::Fresh {
            self.buf.write_footer()?;
        }
        self.buf.flush()?;
        Ok(self.buf.into_inner())
    }
}

/// The XML traversal engine, encode side.
pub(crate) fn encode_value(w: &mut dyn XmlWrite, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Bool(v) => w.write_scalar(name, if *v { "1" } else { "0" }),
        Value::I8(v) => w.write_scalar(name, &v.to_string()),
        Value::I16(v) => w.write_scalar(name, &v.to_string()),
        Value::I32(v) => w.write_scalar(name, &v.to_string()),
        Value::I64(v) => w.write_scalar(name, &v.to_string()),
        Value::U8(v) => w.write_scalar(name, &v.to_string()),
        Value::U16(v) => w.write_scalar(name, &v.to_string()),
        Value::U32(v) => w.write_scalar(name, &v.to_string()),
        Value::U64(v) => w.write_scalar(name, &v.to_string()),
        Value::F32(v) => w.write_scalar(name, &v.to_string()),
        Value::F64(v) => w.write_scalar(name, &v.to_string()),
        Value::String(v) => w.write_scalar(name, v),

        Value::Complex64(c) => {
            w.begin(name)?;
            w.write_scalar("real", &c.re.to_string())?;
            w.write_scalar("imag", &c.im.to_string())?;
            w.end(name)
        }
        Value::Complex128(c) => {
            w.begin(name)?;
            w.write_scalar("real", &c.re.to_string())?;
            w.write_scalar("imag", &c.im.to_string())?;
            w.end(name)
        }

        Value::Record(rec) => {
            w.begin(name)?;
            w.write_type_descr(&value.type_key())?;
            for field in &rec.fields {
                encode_value(w, &field.name, &field.value)?;
            }
            w.end(name)
        }

        Value::FixedArray(arr) => {
            check_items(&arr.elem, &arr.items)?;
            w.begin(name)?;
            w.write_type_descr(&value.type_key())?;
            w.write_scalar("count", &arr.items.len().to_string())?;
            for item in &arr.items {
                encode_value(w, ITEM, item)?;
            }
            w.end(name)
        }

        Value::Sequence(seq) => {
            check_items(&seq.elem, &seq.items)?;
            let key = value.type_key();
            w.begin(name)?;
            w.write_type_descr(&key)?;
            w.write_scalar("count", &seq.items.len().to_string())?;
            if !key.is_builtin() {
                w.write_scalar("item_version", "0")?;
            }
            for item in &seq.items {
                encode_value(w, ITEM, item)?;
            }
            w.end(name)
        }

        Value::Mapping(map) => {
            check_items(&map.key, map.entries.iter().map(|(k, _)| k))?;
            check_items(&map.value, map.entries.iter().map(|(_, v)| v))?;
            let pair = TypeKey::Pair(Box::new(map.key.type_key()), Box::new(map.value.type_key()));
            w.begin(name)?;
            w.write_type_descr(&value.type_key())?;
            w.write_scalar("count", &map.entries.len().to_string())?;
            w.write_scalar("item_version", "0")?;
            for (k, v) in &map.entries {
                w.begin(ITEM)?;
                w.write_type_descr(&pair)?;
                encode_value(w, "first", k)?;
                encode_value(w, "second", v)?;
                w.end(ITEM)?;
            }
            w.end(name)
        }

        Value::Custom(codec, inner) => codec.marshal_xml(name, inner, w),
    }
}
