//! Architecture profiles.
//!
//! A C++ program can be built for 32- or 64-bit pointers, and Boost sizes
//! its length and count fields after the host's `size_t`. The profile picks
//! that width and also describes the C++ type sizes recorded in the header
//! flags word. The flags are provenance only: a reader never rejects a
//! stream because they disagree with its own profile.

use serde::{Deserialize, Serialize};

use crate::header::{Header, ARCHIVE_VERSION};

const PTR_BITS: u32 = usize::BITS;

/// Pointer-size framing of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// The width of the running host.
    #[default]
    Native,
    #[serde(rename = "32")]
    Arch32,
    #[serde(rename = "64")]
    Arch64,
}

impl Arch {
    /// Resolves `Native` to the concrete framing of this host.
    pub fn resolve(self) -> Arch {
        match self {
            Arch::Native if PTR_BITS == 32 => Arch::Arch32,
            Arch::Native => Arch::Arch64,
            other => other,
        }
    }

    /// Width in bytes of length-prefixed fields and element counts.
    #[inline]
    pub fn len_width(self) -> usize {
        match self.resolve() {
            Arch::Arch32 => 4,
            _ => 8,
        }
    }

    pub fn profile(self) -> ArchProfile {
        match self.resolve() {
            Arch::Arch32 => ArchProfile::ILP32,
            _ => ArchProfile::LP64,
        }
    }

    /// The header a C++ program built for this architecture writes.
    pub fn header(self) -> Header {
        Header {
            version: ARCHIVE_VERSION,
            flags: self.profile().flags(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    Little,
    Big,
}

/// Sizes of the C++ source types, as packed into the header flags word.
///
/// Layout of the flags (little-endian bytes): `int`, `long`, `float`,
/// `double`, endianness marker (1 = little), three zero bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArchProfile {
    pub int_width:    u8,
    pub long_width:   u8,
    pub float_width:  u8,
    pub double_width: u8,
    pub endianness:   Endianness,
}

impl ArchProfile {
    pub const ILP32: ArchProfile = ArchProfile {
        int_width:    4,
        long_width:   4,
        float_width:  4,
        double_width: 8,
        endianness:   Endianness::Little,
    };

    pub const LP64: ArchProfile = ArchProfile {
        int_width:    4,
        long_width:   8,
        float_width:  4,
        double_width: 8,
        endianness:   Endianness::Little,
    };

    pub fn flags(&self) -> u64 {
        let endian = match self.endianness {
            Endianness::Little => 1,
            Endianness::Big => 0,
        };
        u64::from_le_bytes([
            self.int_width,
            self.long_width,
            self.float_width,
            self.double_width,
            endian,
            0,
            0,
            0,
        ])
    }

    pub fn from_flags(flags: u64) -> ArchProfile {
        let b = flags.to_le_bytes();
        ArchProfile {
            int_width:    b[0],
            long_width:   b[1],
            float_width:  b[2],
            double_width: b[3],
            endianness:   if b[4] == 1 { Endianness::Little } else { Endianness::Big },
        }
    }
}
