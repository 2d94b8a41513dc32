//! In-memory values and the shapes that describe them.
//!
//! A [`Value`] is what the traversal engines encode; a [`Shape`] is what the
//! decoders are asked to produce. Composite variants carry their element
//! shapes so that empty containers still have a well-defined type.

use std::fmt;
use std::sync::Arc;

use crate::binary::{BinaryRead, BinaryWrite};
use crate::error::{Error, Result};
use crate::registry::TypeKey;
use crate::xml::{XmlRead, XmlWrite};

// ── Custom codecs ────────────────────────────────────────────────────────────

/// Escape hatch for values whose C++ `serialize` method does not follow the
/// generic record layout.
///
/// When the engine meets a [`Value::Custom`] (or is asked to decode a
/// [`Shape::Custom`]) it applies none of its own rules and hands the buffer
/// to the codec. A codec may still call back into the engine for nested
/// parts through `write_value`/`read_value`.
pub trait CustomCodec: fmt::Debug + Send + Sync {
    /// Stable name of the type; distinguishes custom types from each other.
    fn name(&self) -> &str;

    fn marshal_binary(&self, value: &Value, w: &mut dyn BinaryWrite) -> Result<()>;

    fn unmarshal_binary(&self, r: &mut dyn BinaryRead) -> Result<Value>;

    fn marshal_xml(&self, _name: &str, _value: &Value, _w: &mut dyn XmlWrite) -> Result<()> {
        Err(Error::TypeNotSupported(format!("{} has no XML codec", self.name())))
    }

    fn unmarshal_xml(&self, _r: &mut dyn XmlRead) -> Result<Value> {
        Err(Error::TypeNotSupported(format!("{} has no XML codec", self.name())))
    }
}

// ── Values ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct Complex<T> {
    pub re: T,
    pub im: T,
}

impl<T> Complex<T> {
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name:  String,
    pub value: Value,
}

/// A C++ class serialized field by field, in declaration order.
#[derive(Debug, Clone)]
pub struct Record {
    pub name:   String,
    pub fields: Vec<Field>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(Field { name: name.into(), value: value.into() });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn shape(&self) -> RecordShape {
        RecordShape {
            name:   self.name.clone(),
            fields: self.fields.iter().map(|f| (f.name.clone(), f.value.shape())).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedArray {
    pub elem:  Shape,
    pub items: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Sequence {
    pub elem:  Shape,
    pub items: Vec<Value>,
}

/// Unordered key/value pairs, kept in the order they were read or built.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub key:     Shape,
    pub value:   Shape,
    pub entries: Vec<(Value, Value)>,
}

impl Mapping {
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Complex64(Complex<f32>),
    Complex128(Complex<f64>),
    String(String),
    Record(Record),
    FixedArray(FixedArray),
    Sequence(Sequence),
    Mapping(Mapping),
    Custom(Arc<dyn CustomCodec>, Box<Value>),
}

impl Value {
    pub fn fixed_array<I, V>(elem: Shape, items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::FixedArray(FixedArray { elem, items: items.into_iter().map(Into::into).collect() })
    }

    pub fn sequence<I, V>(elem: Shape, items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Sequence(Sequence { elem, items: items.into_iter().map(Into::into).collect() })
    }

    pub fn mapping<I, K, V>(key: Shape, value: Shape, entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Mapping(Mapping {
            key,
            value,
            entries: entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        })
    }

    pub fn custom(codec: Arc<dyn CustomCodec>, inner: impl Into<Value>) -> Value {
        Value::Custom(codec, Box::new(inner.into()))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Value::Bool(_) => Shape::Bool,
            Value::I8(_) => Shape::I8,
            Value::I16(_) => Shape::I16,
            Value::I32(_) => Shape::I32,
            Value::I64(_) => Shape::I64,
            Value::U8(_) => Shape::U8,
            Value::U16(_) => Shape::U16,
            Value::U32(_) => Shape::U32,
            Value::U64(_) => Shape::U64,
            Value::F32(_) => Shape::F32,
            Value::F64(_) => Shape::F64,
            Value::Complex64(_) => Shape::Complex64,
            Value::Complex128(_) => Shape::Complex128,
            Value::String(_) => Shape::String,
            Value::Record(r) => Shape::Record(r.shape()),
            Value::FixedArray(a) => Shape::FixedArray(Box::new(a.elem.clone()), a.items.len()),
            Value::Sequence(s) => Shape::Sequence(Box::new(s.elem.clone())),
            Value::Mapping(m) => Shape::Mapping(Box::new(m.key.clone()), Box::new(m.value.clone())),
            Value::Custom(codec, _) => Shape::Custom(codec.clone()),
        }
    }

    /// Registry identity of this value's type.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Value::Record(r) => TypeKey::Record(r.fields.iter().map(|f| f.value.type_key()).collect()),
            Value::FixedArray(a) => TypeKey::Array(Box::new(a.elem.type_key()), a.items.len()),
            other => other.shape().type_key(),
        }
    }

    /// Whether this value can be encoded where `shape` is expected.
    /// Field names are not part of the check.
    pub fn conforms_to(&self, shape: &Shape) -> bool {
        match (self, shape) {
            (Value::Record(r), Shape::Record(rs)) => {
                r.fields.len() == rs.fields.len()
                    && r.fields.iter().zip(&rs.fields).all(|(f, (_, s))| f.value.conforms_to(s))
            }
            (Value::FixedArray(a), Shape::FixedArray(elem, n)) => {
                a.items.len() == *n
                    && a.elem.type_key() == elem.type_key()
                    && a.items.iter().all(|v| v.conforms_to(elem))
            }
            (Value::Sequence(s), Shape::Sequence(elem)) => {
                s.elem.type_key() == elem.type_key() && s.items.iter().all(|v| v.conforms_to(elem))
            }
            (Value::Mapping(m), Shape::Mapping(k, v)) => {
                m.key.type_key() == k.type_key()
                    && m.value.type_key() == v.type_key()
                    && m.entries.iter().all(|(ek, ev)| ek.conforms_to(k) && ev.conforms_to(v))
            }
            (Value::Custom(a, _), Shape::Custom(b)) => a.name() == b.name(),
            (value, shape) => value.type_key().is_primitive() && value.type_key() == shape.type_key(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::FixedArray(a) => Some(&a.items),
            Value::Sequence(s) => Some(&s.items),
            _ => None,
        }
    }
}

/// Checks every element of a container against its declared shape.
pub(crate) fn check_items<'a>(
    elem: &Shape,
    items: impl IntoIterator<Item = &'a Value>,
) -> Result<()> {
    for item in items {
        if !item.conforms_to(elem) {
            return Err(Error::ShapeMismatch(format!(
                "element of type {} in a container of {}",
                item.type_key(),
                elem.type_key()
            )));
        }
    }
    Ok(())
}

impl PartialEq for Value {
    /// Floats compare bit-for-bit; mappings compare as unordered pair sets.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Complex64(a), Value::Complex64(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            (Value::Complex128(a), Value::Complex128(b)) => {
                a.re.to_bits() == b.re.to_bits() && a.im.to_bits() == b.im.to_bits()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => {
                a.name == b.name
                    && a.fields.len() == b.fields.len()
                    && a.fields.iter().zip(&b.fields).all(|(x, y)| x.name == y.name && x.value == y.value)
            }
            (Value::FixedArray(a), Value::FixedArray(b)) => a.elem == b.elem && a.items == b.items,
            (Value::Sequence(a), Value::Sequence(b)) => a.elem == b.elem && a.items == b.items,
            (Value::Mapping(a), Value::Mapping(b)) => {
                a.key == b.key
                    && a.value == b.value
                    && same_entries(&a.entries, &b.entries)
            }
            (Value::Custom(ca, a), Value::Custom(cb, b)) => ca.name() == cb.name() && a == b,
            _ => false,
        }
    }
}

/// Multiset equality: every entry of `a` claims a distinct equal entry of `b`.
fn same_entries(a: &[(Value, Value)], b: &[(Value, Value)]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut claimed = vec![false; b.len()];
    a.iter().all(|entry| {
        let found = b.iter().enumerate().find(|(i, other)| !claimed[*i] && *other == entry);
        match found {
            Some((i, _)) => {
                claimed[i] = true;
                true
            }
            None => false,
        }
    })
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Complex<f32> => Complex64,
    Complex<f64> => Complex128,
    String => String,
    Record => Record,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

// ── Shapes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RecordShape {
    pub name:   String,
    pub fields: Vec<(String, Shape)>,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, shape: Shape) -> Self {
        self.fields.push((name.into(), shape));
        self
    }
}

/// The type a decoder is asked to produce.
#[derive(Debug, Clone)]
pub enum Shape {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Complex64,
    Complex128,
    String,
    Record(RecordShape),
    FixedArray(Box<Shape>, usize),
    Sequence(Box<Shape>),
    Mapping(Box<Shape>, Box<Shape>),
    Custom(Arc<dyn CustomCodec>),
}

impl Shape {
    pub fn fixed_array(elem: Shape, len: usize) -> Shape {
        Shape::FixedArray(Box::new(elem), len)
    }

    pub fn sequence(elem: Shape) -> Shape {
        Shape::Sequence(Box::new(elem))
    }

    pub fn mapping(key: Shape, value: Shape) -> Shape {
        Shape::Mapping(Box::new(key), Box::new(value))
    }

    pub fn type_key(&self) -> TypeKey {
        match self {
            Shape::Bool => TypeKey::Bool,
            Shape::I8 => TypeKey::I8,
            Shape::I16 => TypeKey::I16,
            Shape::I32 => TypeKey::I32,
            Shape::I64 => TypeKey::I64,
            Shape::U8 => TypeKey::U8,
            Shape::U16 => TypeKey::U16,
            Shape::U32 => TypeKey::U32,
            Shape::U64 => TypeKey::U64,
            Shape::F32 => TypeKey::F32,
            Shape::F64 => TypeKey::F64,
            Shape::Complex64 => TypeKey::C64,
            Shape::Complex128 => TypeKey::C128,
            Shape::String => TypeKey::Str,
            Shape::Record(r) => TypeKey::Record(r.fields.iter().map(|(_, s)| s.type_key()).collect()),
            Shape::FixedArray(elem, n) => TypeKey::Array(Box::new(elem.type_key()), *n),
            Shape::Sequence(elem) => TypeKey::Seq(Box::new(elem.type_key())),
            Shape::Mapping(k, v) => TypeKey::Map(Box::new(k.type_key()), Box::new(v.type_key())),
            Shape::Custom(codec) => TypeKey::Custom(codec.name().to_owned()),
        }
    }
}

impl PartialEq for Shape {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Shape::Record(a), Shape::Record(b)) => a == b,
            (Shape::FixedArray(a, n), Shape::FixedArray(b, m)) => n == m && a == b,
            (Shape::Sequence(a), Shape::Sequence(b)) => a == b,
            (Shape::Mapping(ak, av), Shape::Mapping(bk, bv)) => ak == bk && av == bv,
            (Shape::Custom(a), Shape::Custom(b)) => a.name() == b.name(),
            (a, b) => a.type_key().is_primitive() && a.type_key() == b.type_key(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal(name: &str) -> Value {
        Record::new("animal").field("name", name).field("legs", 4i16).field("tails", 1i8).into()
    }

    #[test]
    fn records_with_same_layout_share_a_key() {
        let other = Value::from(Record::new("plant").field("kind", "fern").field("leaves", 7i16).field("x", 0i8));
        assert_eq!(animal("pet").type_key(), other.type_key());
        assert_eq!(animal("pet").type_key(), animal("pet").shape().type_key());
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_ne!(Value::F32(0.0), Value::F32(-0.0));
    }

    #[test]
    fn mapping_equality_ignores_order() {
        let a = Value::mapping(Shape::String, Shape::String, [("eins", "un"), ("zwei", "deux")]);
        let b = Value::mapping(Shape::String, Shape::String, [("zwei", "deux"), ("eins", "un")]);
        let c = Value::mapping(Shape::String, Shape::String, [("zwei", "deux"), ("eins", "one")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn mapping_equality_counts_duplicates() {
        let a = Value::mapping(Shape::I32, Shape::I32, [(1, 1), (1, 1), (2, 2)]);
        let b = Value::mapping(Shape::I32, Shape::I32, [(1, 1), (2, 2), (2, 2)]);
        let c = Value::mapping(Shape::I32, Shape::I32, [(2, 2), (1, 1), (1, 1)]);
        assert_ne!(a, b);
        assert_ne!(b, a);
        assert_eq!(a, c);
    }

    #[test]
    fn conformance() {
        let seq = Value::sequence(Shape::U8, [1u8, 2, 3]);
        assert!(seq.conforms_to(&Shape::sequence(Shape::U8)));
        assert!(!seq.conforms_to(&Shape::sequence(Shape::I8)));

        let bad = Value::sequence(Shape::U8, [Value::U8(1), Value::I32(2)]);
        assert!(check_items(&Shape::U8, bad.items().unwrap_or_default()).is_err());

        let shape = RecordShape::new("animal")
            .field("name", Shape::String)
            .field("legs", Shape::I16)
            .field("tails", Shape::I8);
        assert!(animal("pet").conforms_to(&Shape::Record(shape)));
    }
}
