//! XML archive backend.
//!
//! The same logical grammar as the binary backend, expressed as elements:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8" standalone="yes" ?>
//! <!DOCTYPE boost_serialization>
//! <boost_serialization signature="serialization::archive" version="19">
//! <item>hello</item>
//! <pet>
//!     <class_id>0</class_id>
//!     <tracking_level>0</tracking_level>
//!     <version>0</version>
//!     <name>cat</name>
//!     <legs>4</legs>
//! </pet>
//! </boost_serialization>
//! ```
//!
//! Every scalar is wrapped in an element named after its field. Composite
//! descriptors are written as leading child elements; the reader also
//! accepts them as attributes of the composite element, which is how the
//! C++ library emits them.
//!
//! Element names are not checked against field names on read: values are
//! matched by position, as in the binary format.
//!
//! Floats are written in their shortest decimal form, so every NaN is
//! written as `NaN` and reads back as the default quiet NaN; its sign and
//! payload bits are lost. Strings holding characters XML 1.0 cannot carry,
//! and field names that are not XML names, fail the encode with
//! [`Error::InvalidXmlValue`](crate::Error::InvalidXmlValue).

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

use serde::Serialize;

use crate::error::Result;
use crate::registry::TypeKey;
use crate::value::{Shape, Value};

/// Name of the root element.
pub const ROOT_ELEMENT: &str = "boost_serialization";

/// Element name used for unnamed top-level values and container items.
pub const ITEM: &str = "item";

/// Stream-level header of an XML archive; the flags word has no XML form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct XmlHeader {
    pub version: u16,
}

/// Per-type metadata preceding the first instance of a composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct XmlTypeDescr {
    pub class_id:       i64,
    pub tracking_level: i64,
    pub version:        u32,
}

/// Write side of the XML codec.
pub trait XmlWrite {
    /// Writes `<name>text</name>`, escaping `text`.
    fn write_scalar(&mut self, name: &str, text: &str) -> Result<()>;

    /// Opens a composite element.
    fn begin(&mut self, name: &str) -> Result<()>;

    /// Closes the innermost composite element.
    fn end(&mut self, name: &str) -> Result<()>;

    /// Writes a descriptor unconditionally, bypassing the registry.
    fn write_descr(&mut self, descr: &XmlTypeDescr) -> Result<()>;

    /// Writes the descriptor for `key` unless this stream already has,
    /// assigning it the next class id.
    fn write_type_descr(&mut self, key: &TypeKey) -> Result<()>;

    /// Encodes a value with the generic traversal rules.
    fn write_value(&mut self, name: &str, value: &Value) -> Result<()>;
}

/// Read side of the XML codec.
///
/// Reads consume the children of the innermost open element in order.
pub trait XmlRead {
    /// Name of the next unread child element, if there is one.
    fn peek_name(&self) -> Option<&str>;

    /// Consumes the next child element and returns its text content.
    fn read_scalar(&mut self) -> Result<String>;

    /// Consumes the next child element and makes it the innermost one.
    fn begin(&mut self) -> Result<()>;

    /// Returns to the parent of the innermost element.
    fn end(&mut self) -> Result<()>;

    /// Reads a descriptor unconditionally, bypassing the registry.
    fn read_descr(&mut self) -> Result<XmlTypeDescr>;

    /// Returns the descriptor for `key`, reading it on the first
    /// occurrence only.
    fn read_type_descr(&mut self, key: &TypeKey) -> Result<XmlTypeDescr>;

    /// Decodes the next child element as a value of the given shape.
    fn read_value(&mut self, shape: &Shape) -> Result<Value>;
}
