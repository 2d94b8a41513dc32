#![allow(dead_code)]

use std::sync::Arc;

use boost_archive::binary::{BinaryRead, BinaryWrite};
use boost_archive::xml::{XmlRead, XmlTypeDescr, XmlWrite};
use boost_archive::{
    CustomCodec, Error, Record, RecordShape, Result, Shape, TypeDescr, Value, MAGIC,
};

pub fn animal(name: &str, legs: i16, tails: i8) -> Record {
    Record::new("animal").field("name", name).field("legs", legs).field("tails", tails)
}

pub fn animal_shape() -> Shape {
    Shape::Record(
        RecordShape::new("animal")
            .field("name", Shape::String)
            .field("legs", Shape::I16)
            .field("tails", Shape::I8),
    )
}

/// Signature and header as written by a 64-bit C++ program.
pub fn header64() -> Vec<u8> {
    let mut out = vec![22, 0, 0, 0, 0, 0, 0, 0];
    out.extend_from_slice(MAGIC.as_bytes());
    out.extend_from_slice(&[0x13, 0x00, 0x04, 0x08, 0x04, 0x08, 0x01, 0x00, 0x00, 0x00]);
    out
}

/// Signature and header as written by a 32-bit C++ program.
pub fn header32() -> Vec<u8> {
    let mut out = vec![22, 0, 0, 0];
    out.extend_from_slice(MAGIC.as_bytes());
    out.extend_from_slice(&[0x13, 0x00, 0x04, 0x04, 0x04, 0x08, 0x01, 0x00, 0x00, 0x00]);
    out
}

/// An animal whose C++ `serialize` writes its own descriptor on every
/// instance instead of once per stream.
#[derive(Debug)]
pub struct Manimal;

impl Manimal {
    pub fn codec() -> Arc<dyn CustomCodec> {
        Arc::new(Manimal)
    }

    pub fn value(name: &str, legs: i16, tails: i8) -> Value {
        Value::custom(Self::codec(), animal(name, legs, tails))
    }

    fn parts(value: &Value) -> Result<(&str, i16, i8)> {
        let rec = value
            .as_record()
            .ok_or_else(|| Error::ShapeMismatch("manimal wants a record".into()))?;
        match (rec.get("name"), rec.get("legs"), rec.get("tails")) {
            (Some(Value::String(name)), Some(Value::I16(legs)), Some(Value::I8(tails))) => {
                Ok((name.as_str(), *legs, *tails))
            }
            _ => Err(Error::ShapeMismatch("manimal fields".into())),
        }
    }
}

fn xml_num<T: std::str::FromStr>(element: &str, text: String) -> Result<T> {
    text.trim().parse().map_err(|_| Error::InvalidXmlValue {
        element: element.into(),
        reason:  format!("bad number {text:?}"),
    })
}

impl CustomCodec for Manimal {
    fn name(&self) -> &str {
        "manimal"
    }

    fn marshal_binary(&self, value: &Value, w: &mut dyn BinaryWrite) -> Result<()> {
        let (name, legs, tails) = Self::parts(value)?;
        w.write_descr(&TypeDescr::default())?;
        w.write_string(name)?;
        w.write_i16(legs)?;
        w.write_i8(tails)
    }

    fn unmarshal_binary(&self, r: &mut dyn BinaryRead) -> Result<Value> {
        r.read_descr()?;
        let name = r.read_string()?;
        let legs = r.read_i16()?;
        let tails = r.read_i8()?;
        Ok(animal(&name, legs, tails).into())
    }

    fn marshal_xml(&self, name: &str, value: &Value, w: &mut dyn XmlWrite) -> Result<()> {
        let (animal, legs, tails) = Self::parts(value)?;
        w.begin(name)?;
        w.write_descr(&XmlTypeDescr::default())?;
        w.write_scalar("name", animal)?;
        w.write_scalar("legs", &legs.to_string())?;
        w.write_scalar("tails", &tails.to_string())?;
        w.end(name)
    }

    fn unmarshal_xml(&self, r: &mut dyn XmlRead) -> Result<Value> {
        r.begin()?;
        r.read_descr()?;
        let name = r.read_scalar()?;
        let legs = xml_num("legs", r.read_scalar()?)?;
        let tails = xml_num("tails", r.read_scalar()?)?;
        r.end()?;
        Ok(animal(&name, legs, tails).into())
    }
}
