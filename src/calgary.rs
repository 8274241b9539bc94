//! The Calgary container (`spec.md` §4.8, component H): an alternate outer layout sharing the
//! field/record/schema codecs (A–C) but with explicit `u32` offsets, no per-block length prefix,
//! and no compression bit. Each block decodes to a *vector* of records, not a concatenated stream.

use crate::error::{HeaderError, IndexError, Result};
use crate::record::{decode_record, encode_record, Record, RecordInfo};
use crate::schema::{parse_schema, render_schema};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"CALG";
const HEADER_SIZE: usize = 32;
const RESERVED_LEN: usize = HEADER_SIZE - 4 - 4 - 4;

/// The Calgary header's fixed 32-byte prelude (`DESIGN.md` O3: only `index_position` is a known
/// field; the rest is an opaque preserved tail).
#[derive(Clone, Debug, PartialEq)]
pub struct CalgaryHeader {
    /// Writers set `1`.
    pub version: u32,
    /// Absolute byte offset where [CalgaryBlockIndex] begins.
    pub index_position: u32,
    /// Opaque padding, preserved verbatim on round-trip.
    pub reserved: Vec<u8>,
}

impl CalgaryHeader {
    /// Reads a 32-byte Calgary header from `read`.
    pub fn read_from<R: Read>(read: &mut R) -> Result<CalgaryHeader> {
        let mut magic = [0u8; 4];
        read.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(HeaderError::WrongMagic {
                found: u32::from_le_bytes(magic),
            }
            .into());
        }
        let version = read.read_u32::<LittleEndian>()?;
        let index_position = read.read_u32::<LittleEndian>()?;
        let mut reserved = vec![0u8; RESERVED_LEN];
        read.read_exact(&mut reserved)?;
        Ok(CalgaryHeader {
            version,
            index_position,
            reserved,
        })
    }

    /// Writes this header as exactly 32 bytes.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_all(MAGIC)?;
        write.write_u32::<LittleEndian>(self.version)?;
        write.write_u32::<LittleEndian>(self.index_position)?;
        let mut reserved = self.reserved.clone();
        reserved.resize(RESERVED_LEN, 0);
        write.write_all(&reserved)?;
        Ok(())
    }
}

impl Default for CalgaryHeader {
    fn default() -> CalgaryHeader {
        CalgaryHeader {
            version: 1,
            index_position: 0,
            reserved: vec![0u8; RESERVED_LEN],
        }
    }
}

/// The trailing `u32` LE offset table: no count prefix, the entry count is implied by the bytes
/// remaining between `index_position` and end of file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CalgaryBlockIndex(Vec<u32>);

impl CalgaryBlockIndex {
    /// Wraps a list of offsets.
    pub fn new(offsets: Vec<u32>) -> CalgaryBlockIndex {
        CalgaryBlockIndex(offsets)
    }

    /// The offsets, in block order.
    pub fn offsets(&self) -> &[u32] {
        &self.0
    }

    /// The number of blocks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no blocks.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs consecutive offsets into half-open byte ranges, the last ending at `index_position`.
    pub fn ranges(&self, index_position: u32) -> Vec<(u32, u32)> {
        let mut ranges = Vec::with_capacity(self.0.len());
        for (i, &start) in self.0.iter().enumerate() {
            let end = self.0.get(i + 1).copied().unwrap_or(index_position);
            ranges.push((start, end));
        }
        ranges
    }

    /// Writes the offsets with no count prefix; the reader infers the count from file length.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        for &offset in &self.0 {
            write.write_u32::<LittleEndian>(offset)?;
        }
        Ok(())
    }

    /// Reads offsets from `read` until `trailer_len` bytes have been consumed, validating that
    /// `trailer_len` is a multiple of 4 and that offsets are strictly increasing.
    pub fn read_from<R: Read>(read: &mut R, trailer_len: u64) -> Result<CalgaryBlockIndex> {
        if trailer_len % 4 != 0 {
            return Err(IndexError::CountMismatch {
                count: (trailer_len / 4) as u32,
                expected: trailer_len - trailer_len % 4,
                found: trailer_len,
            }
            .into());
        }
        let count = trailer_len / 4;
        let mut offsets = Vec::with_capacity(count as usize);
        let mut previous = None;
        for position in 0..count as usize {
            let offset = read.read_u32::<LittleEndian>()?;
            if let Some(prev) = previous {
                if offset <= prev {
                    return Err(IndexError::NotMonotone {
                        position,
                        previous: prev as u64,
                        next: offset as u64,
                    }
                    .into());
                }
            }
            previous = Some(offset);
            offsets.push(offset);
        }
        Ok(CalgaryBlockIndex(offsets))
    }
}

/// A fully-parsed Calgary container: header, schema, block index, and (lazily, via
/// [CalgaryFile::records]) the record vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct CalgaryFile {
    /// The 32-byte Calgary header.
    pub header: CalgaryHeader,
    /// The parsed schema.
    pub record_info: RecordInfo,
    /// The trailing offset table.
    pub block_index: CalgaryBlockIndex,
    bytes: Vec<u8>,
    start_of_blocks: usize,
}

impl CalgaryFile {
    /// Parses a complete Calgary file already read into memory.
    ///
    /// Calgary's blocks are random-accessible by explicit offset rather than a pull-based
    /// length-prefixed stream, so (unlike [crate::reader::Reader]) this takes the whole buffer up
    /// front rather than a `Read + Seek` handle.
    pub fn parse(bytes: Vec<u8>) -> Result<CalgaryFile> {
        let mut cursor = Cursor::new(&bytes);
        let header = CalgaryHeader::read_from(&mut cursor)?;

        let num_chars = cursor.read_u32::<LittleEndian>()?;
        let schema_len = num_chars as usize * 2;
        let mut schema_bytes = vec![0u8; schema_len];
        cursor.read_exact(&mut schema_bytes)?;
        let record_info = parse_schema(&schema_bytes)?;

        let start_of_blocks = cursor.position() as usize;
        cursor.seek(SeekFrom::Start(header.index_position as u64))?;
        let end = bytes.len() as u64;
        let trailer_len = end.saturating_sub(header.index_position as u64);
        let block_index = CalgaryBlockIndex::read_from(&mut cursor, trailer_len)?;

        Ok(CalgaryFile {
            header,
            record_info,
            block_index,
            bytes,
            start_of_blocks,
        })
    }

    /// Reads and parses `path` in full.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<CalgaryFile> {
        let mut bytes = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
        CalgaryFile::parse(bytes)
    }

    /// The byte offset of the first record-vector block, i.e. the end of the schema.
    pub fn start_of_blocks(&self) -> usize {
        self.start_of_blocks
    }

    /// Decodes every block's record vector and returns them concatenated in file order.
    ///
    /// This is `sourceCalgaryFileRecords(path) -> stream<Record>` from `spec.md` §6, realized
    /// eagerly since Calgary's blocks are already fully resident in memory.
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for (start, end) in self.block_index.ranges(self.header.index_position) {
            records.extend(self.decode_block(start as usize, end as usize)?);
        }
        Ok(records)
    }

    /// Decodes a single block's record vector by its byte range.
    pub fn block_records(&self, start: usize, end: usize) -> Result<Vec<Record>> {
        self.decode_block(start, end)
    }

    fn decode_block(&self, start: usize, end: usize) -> Result<Vec<Record>> {
        let mut cursor = Cursor::new(&self.bytes[start..end]);
        let mut records = Vec::new();
        while (cursor.position() as usize) < cursor.get_ref().len() {
            records.push(decode_record(&mut cursor, &self.record_info, start as u64)?);
        }
        Ok(records)
    }
}

/// Writes a complete Calgary file to a `Write + Seek` destination, patching the header in place
/// once `index_position` is known — the Calgary analogue of [crate::writer::Writer::close].
pub fn write_calgary_file_seekable<W: Write + Seek>(
    write: &mut W,
    schema: &RecordInfo,
    blocks: &[Vec<Record>],
) -> Result<()> {
    let start = write.stream_position()?;
    write.write_all(&[0u8; HEADER_SIZE])?;

    let schema_bytes = render_schema(schema);
    write.write_u32::<LittleEndian>((schema_bytes.len() / 2) as u32)?;
    write.write_all(&schema_bytes)?;

    let start_of_blocks = start + HEADER_SIZE as u64 + 4 + schema_bytes.len() as u64;
    let mut offsets = Vec::with_capacity(blocks.len());
    let mut offset = start_of_blocks;
    for block in blocks {
        offsets.push(offset as u32);
        let mut encoded = Vec::new();
        for record in block {
            encode_record(&mut encoded, schema, record)?;
        }
        write.write_all(&encoded)?;
        offset += encoded.len() as u64;
    }

    let index_position = offset as u32;
    CalgaryBlockIndex::new(offsets).write_to(write)?;

    let header = CalgaryHeader {
        version: 1,
        index_position,
        reserved: vec![0u8; RESERVED_LEN],
    };
    write.seek(SeekFrom::Start(start))?;
    header.write_to(write)?;
    write.seek(SeekFrom::End(0))?;
    Ok(())
}
