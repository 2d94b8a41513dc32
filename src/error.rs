//! Error taxonomy shared by both archive backends.
//!
//! Every error is sticky: the buffer that produced it remembers it and
//! replays it for every later operation. A malformed field desynchronizes
//! all following bytes, so nothing is retried and nothing is resumed.

use std::io;
use std::sync::Arc;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The stream does not start with the archive signature.
    #[error("not a Boost archive")]
    NotBoost,
    /// The signature matched but the header fields are malformed or truncated.
    #[error("invalid Boost archive header")]
    InvalidHeader,
    #[error("invalid Boost archive type descriptor")]
    InvalidTypeDescr,
    #[error("invalid array length: expected {expected}, archive holds {got}")]
    InvalidArrayLen { expected: usize, got: u64 },
    #[error("type not supported: {0}")]
    TypeNotSupported(String),
    #[error("value does not match its declared shape: {0}")]
    ShapeMismatch(String),
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("length {0} does not fit the archive framing")]
    LengthOverflow(u64),
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    #[error("malformed XML value <{element}>: {reason}")]
    InvalidXmlValue { element: String, reason: String },
    #[error("IO error: {0}")]
    Io(Arc<io::Error>),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::UnexpectedEof,
            _ => Error::Io(Arc::new(err)),
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (NotBoost, NotBoost)
            | (InvalidHeader, InvalidHeader)
            | (InvalidTypeDescr, InvalidTypeDescr)
            | (UnexpectedEof, UnexpectedEof)
            | (InvalidUtf8, InvalidUtf8) => true,
            (
                InvalidArrayLen { expected: a, got: b },
                InvalidArrayLen { expected: c, got: d },
            ) => a == c && b == d,
            (TypeNotSupported(a), TypeNotSupported(b)) => a == b,
            (ShapeMismatch(a), ShapeMismatch(b)) => a == b,
            (LengthOverflow(a), LengthOverflow(b)) => a == b,
            (
                InvalidXmlValue { element: a, reason: b },
                InvalidXmlValue { element: c, reason: d },
            ) => a == c && b == d,
            (Io(a), Io(b)) => Arc::ptr_eq(a, b) || (a.kind() == b.kind() && a.to_string() == b.to_string()),
            _ => false,
        }
    }
}

// ── Stream state ─────────────────────────────────────────────────────────────

/// Lifecycle of one archive stream.
///
/// `Poisoned` is terminal: once entered, every operation on the stream
/// returns the error that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Fresh,
    HeaderWritten,
    HeaderRead,
    Streaming,
    Poisoned,
}

// ── Sticky error cell ────────────────────────────────────────────────────────

/// Remembers the first failure of a stream and replays it afterwards.
#[derive(Debug, Default)]
pub(crate) struct Sticky(Option<Error>);

impl Sticky {
    #[inline]
    pub(crate) fn check(&self) -> Result<()> {
        match &self.0 {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    #[inline]
    pub(crate) fn get(&self) -> Option<&Error> {
        self.0.as_ref()
    }

    /// Poisons the stream with `err`, unless it is already poisoned, and
    /// returns the error the stream now carries.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        if let Some(first) = &self.0 {
            return first.clone();
        }
        tracing::debug!(error = %err, "archive stream poisoned");
        self.0 = Some(err.clone());
        err
    }

    #[inline]
    pub(crate) fn guard<T>(&mut self, res: Result<T>) -> Result<T> {
        res.map_err(|err| self.fail(err))
    }

    #[inline]
    pub(crate) fn io<T>(&mut self, res: io::Result<T>) -> Result<T> {
        res.map_err(|err| self.fail(err.into()))
    }
}
