use std::collections::VecDeque;
use std::io::{self, Read};
use std::num::ParseIntError;

use super::{decode_value, XmlHeader, XmlRead, XmlTypeDescr, ROOT_ELEMENT};
use crate::error::{Error, Result, Sticky};
use crate::header::MAGIC;
use crate::registry::{Registry, TypeKey};
use crate::value::{Shape, Value};

/// Owned copy of one parsed element.
#[derive(Debug, Clone, Default)]
struct Element {
    name:     String,
    attrs:    Vec<(String, String)>,
    text:     String,
    children: VecDeque<Element>,
}

impl Element {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut text = String::new();
        let mut children = VecDeque::new();
        for child in node.children() {
            if child.is_element() {
                children.push_back(Element::from_node(child));
            } else if child.is_text() {
                text.push_str(child.text().unwrap_or_default());
            }
        }
        Element {
            name: node.tag_name().name().to_owned(),
            attrs: node
                .attributes()
                .map(|a| (a.name().to_owned(), a.value().to_owned()))
                .collect(),
            text,
            children,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// XML read buffer.
///
/// The whole document is parsed up front; reads then walk the element tree
/// with a stack of open elements, consuming children in document order.
#[derive(Debug)]
pub struct RBuffer {
    err:    Sticky,
    types:  Registry<XmlTypeDescr>,
    header: XmlHeader,
    stack:  Vec<Element>,
}

impl RBuffer {
    /// Reads and parses the whole input, then validates the root element.
    ///
    /// Input that is not well-formed XML, or whose root is not an archive,
    /// is [`Error::NotBoost`]; a root without a numeric version is
    /// [`Error::InvalidHeader`].
    pub fn new<R: Read>(mut r: R) -> Result<Self> {
        let mut text = String::new();
        r.read_to_string(&mut text).map_err(|err| match err.kind() {
            io::ErrorKind::InvalidData => Error::NotBoost,
            _ => err.into(),
        })?;

        let mut opts = roxmltree::ParsingOptions::default();
        opts.allow_dtd = true;
        let doc = roxmltree::Document::parse_with_options(&text, opts).map_err(|err| {
            tracing::debug!(error = %err, "input is not well-formed XML");
            Error::NotBoost
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != ROOT_ELEMENT || root.attribute("signature") != Some(MAGIC) {
            return Err(Error::NotBoost);
        }
        let version = root
            .attribute("version")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .ok_or(Error::InvalidHeader)?;
        tracing::debug!(version, "read XML archive header");

        Ok(Self {
            err:    Sticky::default(),
            types:  Registry::new(),
            header: XmlHeader { version },
            stack:  vec![Element::from_node(root)],
        })
    }

    pub fn header(&self) -> XmlHeader {
        self.header
    }

    pub fn err(&self) -> Option<&Error> {
        self.err.get()
    }

    pub fn registry(&self) -> &Registry<XmlTypeDescr> {
        &self.types
    }

    /// Top-level values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.stack.first().map_or(0, |root| root.children.len())
    }

    fn next_child(&mut self) -> Result<Element> {
        self.err.check()?;
        match self.stack.last_mut().and_then(|el| el.children.pop_front()) {
            Some(el) => Ok(el),
            None => Err(self.err.fail(Error::UnexpectedEof)),
        }
    }

    fn descr_from_attrs(el: &Element) -> Option<Result<XmlTypeDescr>> {
        let class_id = el.attr("class_id")?;
        let parse = || -> std::result::Result<XmlTypeDescr, ParseIntError> {
            Ok(XmlTypeDescr {
                class_id:       class_id.trim().parse()?,
                tracking_level: el.attr("tracking_level").map_or(Ok(0), |v| v.trim().parse::<i64>())?,
                version:        el.attr("version").map_or(Ok(0), |v| v.trim().parse::<u32>())?,
            })
        };
        Some(parse().map_err(|_| Error::InvalidTypeDescr))
    }

    fn descr_from_children(&mut self) -> Result<XmlTypeDescr> {
        let mut field = |name: &str| -> Result<String> {
            if self.peek_name() != Some(name) {
                return Err(Error::InvalidTypeDescr);
            }
            self.read_scalar()
        };
        let class_id = field("class_id")?;
        let tracking_level = field("tracking_level")?;
        let version = field("version")?;
        let parse = || -> std::result::Result<XmlTypeDescr, ParseIntError> {
            Ok(XmlTypeDescr {
                class_id:       class_id.trim().parse()?,
                tracking_level: tracking_level.trim().parse()?,
                version:        version.trim().parse()?,
            })
        };
        parse().map_err(|_| Error::InvalidTypeDescr)
    }
}

impl XmlRead for RBuffer {
    fn peek_name(&self) -> Option<&str> {
        self.stack.last()?.children.front().map(|el| el.name.as_str())
    }

    fn read_scalar(&mut self) -> Result<String> {
        Ok(self.next_child()?.text)
    }

    fn begin(&mut self) -> Result<()> {
        let el = self.next_child()?;
        self.stack.push(el);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.err.check()?;
        if self.stack.len() < 2 {
            return Err(self.err.fail(Error::InvalidXmlValue {
                element: ROOT_ELEMENT.to_owned(),
                reason:  "unbalanced end of element".to_owned(),
            }));
        }
        self.stack.pop();
        Ok(())
    }

    fn read_descr(&mut self) -> Result<XmlTypeDescr> {
        self.err.check()?;
        let from_attrs = self.stack.last().and_then(Self::descr_from_attrs);
        let res = match from_attrs {
            Some(res) => res,
            None => self.descr_from_children(),
        };
        // Descriptor failures are reported as such, not as what broke them.
        res.map_err(|err| match err {
            Error::Io(_) => err,
            _ => Error::InvalidTypeDescr,
        })
        .map_err(|err| self.err.fail(err))
    }

    fn read_type_descr(&mut self, key: &TypeKey) -> Result<XmlTypeDescr> {
        self.err.check()?;
        if let Some(descr) = self.types.get(key) {
            return Ok(*descr);
        }
        let descr = self.read_descr()?;
        tracing::trace!(key = %key, class_id = descr.class_id, version = descr.version, "read XML type descriptor");
        self.types.insert(key.clone(), descr);
        Ok(descr)
    }

    fn read_value(&mut self, shape: &Shape) -> Result<Value> {
        self.err.check()?;
        let res = decode_value(self, shape);
        self.err.guard(res)
    }
}
