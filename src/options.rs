//! Encoder and decoder configuration.
//!
//! Both option sets are plain data and can be loaded from JSON:
//!
//! ```
//! use boost_archive::{Arch, DecoderOptions, EncoderOptions};
//!
//! let opts = EncoderOptions::from_json(r#"{ "arch": "32" }"#)?;
//! assert_eq!(opts.arch, Arch::Arch32);
//! assert_eq!(opts.version, 19);
//!
//! let opts = DecoderOptions::from_json("{}")?;
//! assert_eq!(opts.arch, None);
//! # Ok::<(), serde_json::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::arch::Arch;
use crate::header::ARCHIVE_VERSION;

// ── EncoderOptions ───────────────────────────────────────────────────────────

/// Configuration for [`binary::Encoder`](crate::binary::Encoder) and
/// [`xml::Encoder`](crate::xml::Encoder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Length-field framing; also selects the header flags word.
    pub arch:    Arch,
    /// Library version recorded in the header.
    pub version: u16,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            arch:    Arch::Native,
            version: ARCHIVE_VERSION,
        }
    }
}

impl EncoderOptions {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ── DecoderOptions ───────────────────────────────────────────────────────────

/// Configuration for [`binary::Decoder`](crate::binary::Decoder).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// Forces the framing instead of detecting it from the signature.
    pub arch: Option<Arch>,
}

impl DecoderOptions {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
