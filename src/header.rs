//! The fixed 512-byte file prelude (`spec.md` §3, §4.5).

use crate::error::{HeaderError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Total on-disk size of a [Header].
pub const HEADER_SIZE: usize = 512;

/// Magic value for files with a spatial index.
pub const FILE_ID_WITH_SPATIAL_INDEX: u32 = 0x0044_0205;
/// Magic value for files without a spatial index.
pub const FILE_ID_WITHOUT_SPATIAL_INDEX: u32 = 0x0044_0204;

const DESCRIPTION_LEN: usize = 64;
const FIXED_FIELDS_LEN: usize = 4 + 4 + 4 + 4 + 4 + 4 + 8 + 8 + 8 + 4;
const RESERVED_LEN: usize = HEADER_SIZE - DESCRIPTION_LEN - FIXED_FIELDS_LEN;

/// The 512-byte file header described in `spec.md` §3.
#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    /// Free-form description text (O4: preserved verbatim on read, not required to match
    /// byte-for-byte on a fresh write).
    pub description: [u8; DESCRIPTION_LEN],
    /// Magic: [FILE_ID_WITH_SPATIAL_INDEX] or [FILE_ID_WITHOUT_SPATIAL_INDEX].
    pub file_id: u32,
    /// Seconds since the Unix epoch.
    pub creation_date: u32,
    /// Reserved; writers set `0`.
    pub flags1: u32,
    /// Reserved; writers set `0`.
    pub flags2: u32,
    /// Length of the schema XML, in UTF-16 code units.
    pub meta_info_length: u32,
    /// Reserved; writers set `0`, preserved on round-trip.
    pub mystery: u32,
    /// Absolute byte offset of the spatial index, or `0` when absent.
    pub spatial_index_pos: u64,
    /// Absolute byte offset where the block index begins.
    pub record_block_index_pos: u64,
    /// Total records across all blocks.
    pub num_records: u64,
    /// Writers set `1`.
    pub compression_version: u32,
    /// Opaque padding filling out the 512-byte page, preserved verbatim on round-trip.
    pub reserved: Vec<u8>,
}

impl Header {
    /// Reads a 512-byte header from `read`.
    ///
    /// # Errors
    ///
    /// Returns [HeaderError::WrongMagic] if `file_id` isn't a recognized value.
    pub fn read_from<R: Read>(read: &mut R) -> Result<Header> {
        let mut description = [0u8; DESCRIPTION_LEN];
        read.read_exact(&mut description)?;
        let file_id = read.read_u32::<LittleEndian>()?;
        if file_id != FILE_ID_WITH_SPATIAL_INDEX && file_id != FILE_ID_WITHOUT_SPATIAL_INDEX {
            return Err(HeaderError::WrongMagic { found: file_id }.into());
        }
        let creation_date = read.read_u32::<LittleEndian>()?;
        let flags1 = read.read_u32::<LittleEndian>()?;
        let flags2 = read.read_u32::<LittleEndian>()?;
        let meta_info_length = read.read_u32::<LittleEndian>()?;
        let mystery = read.read_u32::<LittleEndian>()?;
        let spatial_index_pos = read.read_u64::<LittleEndian>()?;
        let record_block_index_pos = read.read_u64::<LittleEndian>()?;
        let num_records = read.read_u64::<LittleEndian>()?;
        let compression_version = read.read_u32::<LittleEndian>()?;
        let mut reserved = vec![0u8; RESERVED_LEN];
        read.read_exact(&mut reserved)?;

        Ok(Header {
            description,
            file_id,
            creation_date,
            flags1,
            flags2,
            meta_info_length,
            mystery,
            spatial_index_pos,
            record_block_index_pos,
            num_records,
            compression_version,
            reserved,
        })
    }

    /// Writes this header as exactly 512 bytes.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_all(&self.description)?;
        write.write_u32::<LittleEndian>(self.file_id)?;
        write.write_u32::<LittleEndian>(self.creation_date)?;
        write.write_u32::<LittleEndian>(self.flags1)?;
        write.write_u32::<LittleEndian>(self.flags2)?;
        write.write_u32::<LittleEndian>(self.meta_info_length)?;
        write.write_u32::<LittleEndian>(self.mystery)?;
        write.write_u64::<LittleEndian>(self.spatial_index_pos)?;
        write.write_u64::<LittleEndian>(self.record_block_index_pos)?;
        write.write_u64::<LittleEndian>(self.num_records)?;
        write.write_u32::<LittleEndian>(self.compression_version)?;
        let mut reserved = self.reserved.clone();
        reserved.resize(RESERVED_LEN, 0);
        write.write_all(&reserved)?;
        Ok(())
    }

    /// Sets `description` from a UTF-8 string, truncating or NUL-padding to 64 bytes.
    pub fn set_description(&mut self, text: &str) {
        let mut bytes = [0u8; DESCRIPTION_LEN];
        let source = text.as_bytes();
        let len = source.len().min(DESCRIPTION_LEN);
        bytes[..len].copy_from_slice(&source[..len]);
        self.description = bytes;
    }
}

impl Default for Header {
    fn default() -> Header {
        Header {
            description: [0u8; DESCRIPTION_LEN],
            file_id: FILE_ID_WITHOUT_SPATIAL_INDEX,
            creation_date: 0,
            flags1: 0,
            flags2: 0,
            meta_info_length: 0,
            mystery: 0,
            spatial_index_pos: 0,
            record_block_index_pos: 0,
            num_records: 0,
            compression_version: 1,
            reserved: vec![0u8; RESERVED_LEN],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let mut header = Header {
            file_id: FILE_ID_WITH_SPATIAL_INDEX,
            creation_date: 1_700_000_000,
            meta_info_length: 24,
            record_block_index_pos: 536,
            num_records: 2,
            ..Default::default()
        };
        header.set_description("a test file");

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(HEADER_SIZE, buf.len());

        let decoded = Header::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[64..68].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        assert!(Header::read_from(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn preserves_reserved_bytes() {
        let mut header = Header::default();
        header.reserved = vec![0xAB; RESERVED_LEN];
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        let decoded = Header::read_from(&mut Cursor::new(buf)).unwrap();
        assert_eq!(vec![0xABu8; RESERVED_LEN], decoded.reserved);
    }
}
