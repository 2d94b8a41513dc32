//! Per-stream type descriptor registry.
//!
//! # Identity rules
//! A type is identified by its structure, not its name: two records whose
//! fields have the same shapes in the same order are one type. This mirrors
//! the C++ side, which versions per class rather than per instance.
//!
//! The first time a stream meets a composite type its descriptor crosses
//! the wire and is cached here. Later instances of the same type are
//! satisfied from the cache and cost zero bytes.
//!
//! Built-ins (scalars, strings, and sequences of those) are seeded at
//! construction and never touch the wire.
//!
//! A registry is owned by exactly one buffer and lives exactly as long as
//! its stream; nothing in this crate shares one between streams.

use std::collections::HashMap;
use std::fmt;

/// Structural identity of a value's type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
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
    C64,
    C128,
    Str,
    Record(Vec<TypeKey>),
    Array(Box<TypeKey>, usize),
    Seq(Box<TypeKey>),
    Map(Box<TypeKey>, Box<TypeKey>),
    /// Key/value pair of a mapping; only the XML envelope describes it.
    Pair(Box<TypeKey>, Box<TypeKey>),
    Custom(String),
}

const PRIMITIVES: [TypeKey; 14] = [
    TypeKey::Bool,
    TypeKey::I8,
    TypeKey::I16,
    TypeKey::I32,
    TypeKey::I64,
    TypeKey::U8,
    TypeKey::U16,
    TypeKey::U32,
    TypeKey::U64,
    TypeKey::F32,
    TypeKey::F64,
    TypeKey::C64,
    TypeKey::C128,
    TypeKey::Str,
];

impl TypeKey {
    pub fn is_primitive(&self) -> bool {
        PRIMITIVES.contains(self)
    }

    /// Primitives and sequences of primitives never carry a descriptor.
    pub fn is_builtin(&self) -> bool {
        match self {
            TypeKey::Seq(elem) => elem.is_primitive(),
            other => other.is_primitive(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKey::Bool => f.write_str("bool"),
            TypeKey::I8 => f.write_str("i8"),
            TypeKey::I16 => f.write_str("i16"),
            TypeKey::I32 => f.write_str("i32"),
            TypeKey::I64 => f.write_str("i64"),
            TypeKey::U8 => f.write_str("u8"),
            TypeKey::U16 => f.write_str("u16"),
            TypeKey::U32 => f.write_str("u32"),
            TypeKey::U64 => f.write_str("u64"),
            TypeKey::F32 => f.write_str("f32"),
            TypeKey::F64 => f.write_str("f64"),
            TypeKey::C64 => f.write_str("c64"),
            TypeKey::C128 => f.write_str("c128"),
            TypeKey::Str => f.write_str("string"),
            TypeKey::Record(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str("}")
            }
            TypeKey::Array(elem, n) => write!(f, "[{elem}; {n}]"),
            TypeKey::Seq(elem) => write!(f, "[{elem}]"),
            TypeKey::Map(k, v) => write!(f, "map<{k}, {v}>"),
            TypeKey::Pair(k, v) => write!(f, "pair<{k}, {v}>"),
            TypeKey::Custom(name) => write!(f, "custom<{name}>"),
        }
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Cache of descriptors already seen on one stream.
///
/// `D` is the backend's descriptor record.
#[derive(Debug, Clone)]
pub struct Registry<D> {
    types: HashMap<TypeKey, D>,
}

impl<D: Default + Clone> Registry<D> {
    pub fn new() -> Self {
        let mut types = HashMap::with_capacity(PRIMITIVES.len() * 2);
        for key in PRIMITIVES.iter() {
            types.insert(key.clone(), D::default());
            types.insert(TypeKey::Seq(Box::new(key.clone())), D::default());
        }
        Self { types }
    }

    #[inline]
    pub fn get(&self, key: &TypeKey) -> Option<&D> {
        self.types.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    pub(crate) fn insert(&mut self, key: TypeKey, descr: D) {
        self.types.insert(key, descr);
    }

    /// Number of types known to this stream, built-ins included.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<D: Default + Clone> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::TypeDescr;

    #[test]
    fn builtins_are_seeded() {
        let reg: Registry<TypeDescr> = Registry::new();
        assert_eq!(reg.len(), 28);
        assert!(reg.contains(&TypeKey::U8));
        assert!(reg.contains(&TypeKey::Seq(Box::new(TypeKey::F64))));
        assert!(reg.contains(&TypeKey::Seq(Box::new(TypeKey::Str))));
        assert!(!reg.contains(&TypeKey::Array(Box::new(TypeKey::U8), 3)));
        assert!(!reg.contains(&TypeKey::Seq(Box::new(TypeKey::Seq(Box::new(TypeKey::U8))))));
    }

    #[test]
    fn builtin_classification() {
        let rec = TypeKey::Record(vec![TypeKey::Str, TypeKey::I16]);
        assert!(!rec.is_builtin());
        assert!(!TypeKey::Seq(Box::new(rec)).is_builtin());
        assert!(TypeKey::Seq(Box::new(TypeKey::Bool)).is_builtin());
        assert!(!TypeKey::Seq(Box::new(TypeKey::Bool)).is_primitive());
    }

    #[test]
    fn records_are_keyed_by_structure() {
        let mut reg: Registry<TypeDescr> = Registry::new();
        let a = TypeKey::Record(vec![TypeKey::Str, TypeKey::I16, TypeKey::I8]);
        let b = TypeKey::Record(vec![TypeKey::Str, TypeKey::I16, TypeKey::I8]);
        let c = TypeKey::Record(vec![TypeKey::I16, TypeKey::Str, TypeKey::I8]);

        reg.insert(a, TypeDescr { version: 3, flags: 0 });
        assert_eq!(reg.get(&b).map(|d| d.version), Some(3));
        assert!(!reg.contains(&c));
        assert_eq!(c.to_string(), "{i16, string, i8}");
    }
}
