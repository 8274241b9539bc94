//! Read YXDB records (`spec.md` §4.7 read path, component G).

use crate::error::Result;
use crate::header::{Header, HEADER_SIZE};
use crate::index::BlockIndex;
use crate::pipeline::BlocksToRecords;
use crate::record::{Record, RecordInfo};
use crate::schema::parse_schema;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Header, schema, and block index read from a file, without reading any records.
///
/// This is `getMetadata(path) -> YxdbMetadata` from `spec.md` §6.
#[derive(Clone, Debug, PartialEq)]
pub struct YxdbMetadata {
    /// The 512-byte file header.
    pub header: Header,
    /// The parsed schema.
    pub record_info: RecordInfo,
    /// The trailing block offset table.
    pub block_index: BlockIndex,
}

impl YxdbMetadata {
    /// Reads metadata (header, schema, block index) from `read`, without reading any blocks.
    pub fn read_from<R: Read + Seek>(read: &mut R) -> Result<YxdbMetadata> {
        let header = Header::read_from(read)?;

        let schema_len = header.meta_info_length as usize * 2;
        let mut schema_bytes = vec![0u8; schema_len];
        read.read_exact(&mut schema_bytes)?;
        let record_info = parse_schema(&schema_bytes)?;

        read.seek(SeekFrom::Start(header.record_block_index_pos))?;
        let end = read.seek(SeekFrom::End(0))?;
        let trailer_len = end.saturating_sub(header.record_block_index_pos);
        read.seek(SeekFrom::Start(header.record_block_index_pos))?;
        let block_index = BlockIndex::read_from(read, trailer_len)?;

        Ok(YxdbMetadata {
            header,
            record_info,
            block_index,
        })
    }

    /// Opens `path` and reads its metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<YxdbMetadata> {
        let mut file = BufReader::new(File::open(path)?);
        YxdbMetadata::read_from(&mut file)
    }

    /// The byte offset of the first block, i.e. the end of the schema.
    pub fn start_of_blocks(&self) -> u64 {
        HEADER_SIZE as u64 + self.header.meta_info_length as u64 * 2
    }
}

/// Streams the records of an already-open YXDB source.
///
/// `R` need only implement `Read + Seek`; [Reader::from_path] is the common convenience
/// constructor for files.
#[allow(missing_debug_implementations)]
pub struct Reader<R> {
    read: R,
    metadata: YxdbMetadata,
}

impl<R: Read + Seek> Reader<R> {
    /// Wraps `read`, parsing its header, schema, and block index.
    pub fn new(mut read: R) -> Result<Reader<R>> {
        read.seek(SeekFrom::Start(0))?;
        let metadata = YxdbMetadata::read_from(&mut read)?;
        Ok(Reader { read, metadata })
    }

    /// This reader's metadata.
    pub fn metadata(&self) -> &YxdbMetadata {
        &self.metadata
    }

    /// This reader's schema.
    pub fn schema(&self) -> &RecordInfo {
        &self.metadata.record_info
    }

    /// Streams every block's bytes for the file, in block order, as `(offset, raw_block_bytes)`
    /// pairs ready for [crate::pipeline::BlocksToRecords].
    ///
    /// This is `sourceFileBlocks(path, metadata) -> stream<Block>` from `spec.md` §6: a block's
    /// bytes aren't seeked to or read from disk until its element is pulled from the returned
    /// iterator, so a file of any size can be streamed without being loaded into memory.
    pub fn blocks(&mut self) -> BlockSource<'_, R> {
        let ranges = self
            .metadata
            .block_index
            .ranges(self.metadata.header.record_block_index_pos);
        BlockSource {
            read: &mut self.read,
            ranges: ranges.into_iter(),
        }
    }

    /// Returns an iterator over every record in the file, in file order.
    ///
    /// Reading is lazy end to end: each `.next()` call seeks to and reads exactly the one block
    /// needed to produce the next record (or reuses the block already buffered).
    pub fn records(&mut self) -> BlocksToRecords<BlockSource<'_, R>> {
        BlocksToRecords::new(self.metadata.record_info.clone(), self.blocks())
    }
}

/// A lending iterator over a [Reader]'s on-disk blocks, seeking and reading one block's bytes per
/// `.next()` call rather than loading the whole file up front.
#[allow(missing_debug_implementations)]
pub struct BlockSource<'a, R> {
    read: &'a mut R,
    ranges: std::vec::IntoIter<(u64, u64)>,
}

impl<'a, R: Read + Seek> Iterator for BlockSource<'a, R> {
    type Item = Result<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, end) = self.ranges.next()?;
        let len = (end - start) as usize;
        let mut buf = vec![0u8; len];
        if let Err(e) = self.read.seek(SeekFrom::Start(start)) {
            return Some(Err(e.into()));
        }
        match self.read.read_exact(&mut buf) {
            Ok(()) => Some(Ok((start, buf))),
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl Reader<BufReader<File>> {
    /// Opens `path` for reading.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use yxdb::reader::Reader;
    /// let mut reader = Reader::from_path("data.yxdb").unwrap();
    /// for record in reader.records() {
    ///     let record = record.unwrap();
    /// }
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<BufReader<File>>> {
        let file = BufReader::new(File::open(path)?);
        Reader::new(file)
    }
}

/// Collects every record from `path` into a `Vec`.
///
/// This is `sourceFileRecords(path) -> stream<Record>` from `spec.md` §6, realized as an eager
/// helper for callers that don't need streaming.
pub fn source_file_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let mut reader = Reader::from_path(path)?;
    reader.records().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldType, FieldValue};
    use crate::writer::Writer;
    use std::io::Cursor;

    fn schema() -> RecordInfo {
        RecordInfo::new(vec![
            Field::new("a", FieldType::Int32, None, None).unwrap(),
            Field::new("b", FieldType::String, Some(4), None).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn read_back_written_records() {
        let schema = schema();
        let mut writer = Writer::new(Cursor::new(Vec::new()), schema.clone()).unwrap();
        writer
            .write(vec![
                Some(FieldValue::Int32(1)),
                Some(FieldValue::String("abcd".to_string())),
            ])
            .unwrap();
        writer
            .write(vec![
                Some(FieldValue::Int32(2)),
                Some(FieldValue::String("wxyz".to_string())),
            ])
            .unwrap();
        let cursor = writer.into_inner().unwrap();

        let mut reader = Reader::new(cursor).unwrap();
        assert_eq!(2, reader.metadata().header.num_records);
        let records: Vec<Record> = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(2, records.len());
        assert_eq!(Some(FieldValue::Int32(1)), records[0][0]);
    }

    #[test]
    fn empty_stream_has_no_blocks() {
        let schema = schema();
        let writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
        let cursor = writer.into_inner().unwrap();
        let mut reader = Reader::new(cursor).unwrap();
        assert_eq!(0, reader.metadata().block_index.len());
        assert_eq!(0, reader.metadata().header.num_records);
        let records: Vec<Record> = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert!(records.is_empty());
    }
}
