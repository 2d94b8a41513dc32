use std::borrow::Cow;
use std::io::{self, Write};

use super::{encode_value, XmlHeader, XmlTypeDescr, XmlWrite, ROOT_ELEMENT};
use crate::error::{Error, Result, Sticky};
use crate::header::MAGIC;
use crate::registry::{Registry, TypeKey};
use crate::value::Value;

/// XML write buffer.
#[derive(Debug)]
pub struct WBuffer<W: Write> {
    w:        W,
    err:      Sticky,
    types:    Registry<XmlTypeDescr>,
    next_cid: i64,
    depth:    usize,
}

impl<W: Write> WBuffer<W> {
    pub fn new(w: W) -> Self {
        Self {
            w,
            err:      Sticky::default(),
            types:    Registry::new(),
            next_cid: 0,
            depth:    0,
        }
    }

    /// Writes the prolog and opens the root element.
    pub fn write_header(&mut self, header: &XmlHeader) -> Result<()> {
        self.put(|w| {
            writeln!(w, r#"<?xml version="1.0" encoding="UTF-8" standalone="yes" ?>"#)?;
            writeln!(w, "<!DOCTYPE {ROOT_ELEMENT}>")?;
            writeln!(
                w,
                r#"<{ROOT_ELEMENT} signature="{MAGIC}" version="{}">"#,
                header.version
            )
        })?;
        tracing::debug!(version = header.version, "wrote XML archive header");
        Ok(())
    }

    /// Closes the root element.
    pub fn write_footer(&mut self) -> Result<()> {
        self.put(|w| writeln!(w, "</{ROOT_ELEMENT}>"))
    }

    pub fn err(&self) -> Option<&Error> {
        self.err.get()
    }

    pub fn registry(&self) -> &Registry<XmlTypeDescr> {
        &self.types
    }

    pub fn get_ref(&self) -> &W {
        &self.w
    }

    pub fn flush(&mut self) -> Result<()> {
        self.put(|w| w.flush())
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    fn put(&mut self, f: impl FnOnce(&mut W) -> io::Result<()>) -> Result<()> {
        self.err.check()?;
        let res = f(&mut self.w);
        self.err.io(res)
    }

    /// Fails the stream unless `name` can be written as an element name.
    fn check_name(&mut self, name: &str) -> Result<()> {
        self.err.check()?;
        if is_name(name) {
            return Ok(());
        }
        Err(self.err.fail(Error::InvalidXmlValue {
            element: name.to_owned(),
            reason:  "not a valid XML element name".to_owned(),
        }))
    }

    fn indent(&mut self) -> Result<()> {
        let depth = self.depth;
        self.put(|w| {
            for _ in 0..depth {
                w.write_all(b"\t")?;
            }
            Ok(())
        })
    }
}

impl<W: Write> XmlWrite for WBuffer<W> {
    fn write_scalar(&mut self, name: &str, text: &str) -> Result<()> {
        self.check_name(name)?;
        if let Some(c) = text.chars().find(|&c| !is_char(c)) {
            return Err(self.err.fail(Error::InvalidXmlValue {
                element: name.to_owned(),
                reason:  format!("character U+{:04X} cannot be represented in XML", u32::from(c)),
            }));
        }
        self.indent()?;
        self.put(|w| writeln!(w, "<{name}>{}</{name}>", escape(text)))
    }

    fn begin(&mut self, name: &str) -> Result<()> {
        self.check_name(name)?;
        self.indent()?;
        self.put(|w| writeln!(w, "<{name}>"))?;
        self.depth += 1;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        self.put(|w| writeln!(w, "</{name}>"))
    }

    fn write_descr(&mut self, descr: &XmlTypeDescr) -> Result<()> {
        self.write_scalar("class_id", &descr.class_id.to_string())?;
        self.write_scalar("tracking_level", &descr.tracking_level.to_string())?;
        self.write_scalar("version", &descr.version.to_string())
    }

    fn write_type_descr(&mut self, key: &TypeKey) -> Result<()> {
        self.err.check()?;
        if self.types.contains(key) {
            return Ok(());
        }
        let descr = XmlTypeDescr { class_id: self.next_cid, ..XmlTypeDescr::default() };
        self.write_descr(&descr)?;
        tracing::trace!(key = %key, class_id = descr.class_id, "wrote XML type descriptor");
        self.next_cid += 1;
        self.types.insert(key.clone(), descr);
        Ok(())
    }

    fn write_value(&mut self, name: &str, value: &Value) -> Result<()> {
        self.err.check()?;
        let res = encode_value(self, name, value);
        self.err.guard(res)
    }
}

/// XML 1.0 `Char`. Surrogates are not `char`s.
fn is_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn is_name_start(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}' | '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' | '\u{10000}'..='\u{EFFFF}')
}

/// XML 1.0 `Name`, without `:` since the reader is namespace-aware.
fn is_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start)
        && chars.all(|c| {
            is_name_start(c)
                || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
        })
}

/// Escapes text content for an element body.
pub(crate) fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'', '\r']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
