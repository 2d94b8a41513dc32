use std::io::Read;
use std::str::FromStr;

use super::{RBuffer, XmlHeader, XmlRead};
use crate::binary::PREALLOC_LIMIT;
use crate::error::{Error, Result, StreamState};
use crate::registry::TypeKey;
use crate::value::{Complex, Field, FixedArray, Mapping, Record, Sequence, Shape, Value};

/// Reads values from an XML archive.
#[derive(Debug)]
pub struct Decoder {
    buf:   RBuffer,
    state: StreamState,
}

impl Decoder {
    /// Parses the whole document from `r` and validates its root element.
    pub fn new<R: Read>(r: R) -> Result<Self> {
        let buf = RBuffer::new(r)?;
        Ok(Self { buf, state: StreamState::HeaderRead })
    }

    pub fn header(&self) -> XmlHeader {
        self.buf.header()
    }

    pub fn state(&self) -> StreamState {
        match self.buf.err() {
            Some(_) => StreamState::Poisoned,
            None => self.state,
        }
    }

    /// Number of top-level values left in the document.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn decode(&mut self, shape: &Shape) -> Result<Value> {
        let value = self.buf.read_value(shape)?;
        self.state = StreamState::Streaming;
        Ok(value)
    }
}

fn parse<T>(r: &mut dyn XmlRead, element: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let text = r.read_scalar()?;
    text.trim().parse().map_err(|err: T::Err| Error::InvalidXmlValue {
        element: element.to_owned(),
        reason:  format!("{err}: {:?}", text.trim()),
    })
}

fn parse_bool(r: &mut dyn XmlRead) -> Result<bool> {
    let text = r.read_scalar()?;
    match text.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(Error::InvalidXmlValue {
            element: "bool".to_owned(),
            reason:  format!("not a boolean: {other:?}"),
        }),
    }
}

/// Reads a structural child that must carry the given element name.
fn structural<T>(r: &mut dyn XmlRead, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if r.peek_name() != Some(name) {
        return Err(Error::InvalidXmlValue {
            element: name.to_owned(),
            reason:  format!("found <{}> instead", r.peek_name().unwrap_or("/")),
        });
    }
    parse(r, name)
}

fn read_items(r: &mut dyn XmlRead, elem: &Shape, n: usize) -> Result<Vec<Value>> {
    let mut items = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for _ in 0..n {
        items.push(decode_value(r, elem)?);
    }
    Ok(items)
}

/// The XML traversal engine, decode side.
pub(crate) fn decode_value(r: &mut dyn XmlRead, shape: &Shape) -> Result<Value> {
    Ok(match shape {
        Shape::Bool => Value::Bool(parse_bool(r)?),
        Shape::I8 => Value::I8(parse(r, "i8")?),
        Shape::I16 => Value::I16(parse(r, "i16")?),
        Shape::I32 => Value::I32(parse(r, "i32")?),
        Shape::I64 => Value::I64(parse(r, "i64")?),
        Shape::U8 => Value::U8(parse(r, "u8")?),
        Shape::U16 => Value::U16(parse(r, "u16")?),
        Shape::U32 => Value::U32(parse(r, "u32")?),
        Shape::U64 => Value::U64(parse(r, "u64")?),
        Shape::F32 => Value::F32(parse(r, "f32")?),
        Shape::F64 => Value::F64(parse(r, "f64")?),
        Shape::String => Value::String(r.read_scalar()?),

        Shape::Complex64 => {
            r.begin()?;
            let c = Complex::new(structural(r, "real")?, structural(r, "imag")?);
            r.end()?;
            Value::Complex64(c)
        }
        Shape::Complex128 => {
            r.begin()?;
            let c = Complex::new(structural(r, "real")?, structural(r, "imag")?);
            r.end()?;
            Value::Complex128(c)
        }

        Shape::Record(rs) => {
            r.begin()?;
            r.read_type_descr(&shape.type_key())?;
            let mut fields = Vec::with_capacity(rs.fields.len());
            for (name, fs) in &rs.fields {
                fields.push(Field { name: name.clone(), value: decode_value(r, fs)? });
            }
            r.end()?;
            Value::Record(Record { name: rs.name.clone(), fields })
        }

        Shape::FixedArray(elem, len) => {
            r.begin()?;
            r.read_type_descr(&shape.type_key())?;
            let got: u64 = structural(r, "count")?;
            if got != *len as u64 {
                return Err(Error::InvalidArrayLen { expected: *len, got });
            }
            let items = read_items(r, elem, *len)?;
            r.end()?;
            Value::FixedArray(FixedArray { elem: (**elem).clone(), items })
        }

        Shape::Sequence(elem) => {
            let key = shape.type_key();
            r.begin()?;
            r.read_type_descr(&key)?;
            let n: usize = structural(r, "count")?;
            if !key.is_builtin() && r.peek_name() == Some("item_version") {
                r.read_scalar()?;
            }
            let items = read_items(r, elem, n)?;
            r.end()?;
            Value::Sequence(Sequence { elem: (**elem).clone(), items })
        }

        Shape::Mapping(ks, vs) => {
            let pair = TypeKey::Pair(Box::new(ks.type_key()), Box::new(vs.type_key()));
            r.begin()?;
            r.read_type_descr(&shape.type_key())?;
            let n: usize = structural(r, "count")?;
            if r.peek_name() == Some("item_version") {
                r.read_scalar()?;
            }
            let mut entries = Vec::with_capacity(n.min(PREALLOC_LIMIT));
            for _ in 0..n {
                r.begin()?;
                r.read_type_descr(&pair)?;
                let k = decode_value(r, ks)?;
                let v = decode_value(r, vs)?;
                r.end()?;
                entries.push((k, v));
            }
            r.end()?;
            Value::Mapping(Mapping { key: (**ks).clone(), value: (**vs).clone(), entries })
        }

        Shape::Custom(codec) => Value::Custom(codec.clone(), Box::new(codec.unmarshal_xml(r)?)),
    })
}
