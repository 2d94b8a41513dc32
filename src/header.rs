//! Archive signature, stream header and binary type descriptors.
//!
//! # Layout
//! ```text
//! signature := len-field "serialization::archive"
//! header    := version:u16 flags:u64
//! descriptor:= version:u32 flags:u8
//! ```
//! All fields are little-endian. `len-field` is 4 or 8 bytes wide depending
//! on the [`Arch`](crate::Arch) the archive was written for.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::io::{self, Read, Write};

use crate::arch::ArchProfile;

/// Signature string opening every archive.
pub const MAGIC: &str = "serialization::archive";

/// Library version written into new archives.
pub const ARCHIVE_VERSION: u16 = 19;

/// Stream-level header of a binary archive, following the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub flags:   u64,
}

impl Header {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u16::<LittleEndian>(self.version)?;
        writer.write_u64::<LittleEndian>(self.flags)
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let version = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u64::<LittleEndian>()?;
        Ok(Self { version, flags })
    }

    /// Decodes the flags word into the C++ type sizes it records.
    pub fn profile(&self) -> ArchProfile {
        ArchProfile::from_flags(self.flags)
    }
}

/// Per-type metadata preceding the first instance of a composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TypeDescr {
    pub version: u32,
    pub flags:   u8,
}

impl TypeDescr {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u8(self.flags)
    }

    pub fn read<R: Read>(mut reader: R) -> io::Result<Self> {
        let version = reader.read_u32::<LittleEndian>()?;
        let flags = reader.read_u8()?;
        Ok(Self { version, flags })
    }
}
