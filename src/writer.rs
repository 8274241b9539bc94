//! Write YXDB records (`spec.md` §4.7 write path, component G).
//!
//! A [Writer] buffers records into blocks as they arrive and finalizes the file — seeking back to
//! patch the header, then appending the block index — when [Writer::close] runs or the writer is
//! dropped.

use crate::block::write_block;
use crate::error::Result;
use crate::header::{Header, FILE_ID_WITH_SPATIAL_INDEX, HEADER_SIZE};
use crate::index::BlockIndex;
use crate::pipeline::{WriterStats, RECORDS_PER_BLOCK};
use crate::record::{encode_record, Record, RecordInfo};
use crate::schema::render_schema;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Options controlling how a [Writer] buffers records into blocks.
///
/// The only tunable the core exposes is how many records accumulate before a block is emitted;
/// everything else (compression, header layout) follows `spec.md` unconditionally.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    records_per_block: usize,
}

impl WriterOptions {
    /// Overrides the default `0x10000` records-per-block threshold.
    ///
    /// Mostly useful in tests exercising block-boundary behavior (`spec.md` §8's "exactly
    /// `recordsPerBlock` records" scenario) without materializing 65536 records.
    pub fn with_records_per_block(mut self, records_per_block: usize) -> Self {
        self.records_per_block = records_per_block;
        self
    }
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            records_per_block: RECORDS_PER_BLOCK,
        }
    }
}

fn now_unix_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

fn default_description() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Writes YXDB records to `W`.
///
/// The header is re-written in place when the writer closes, either explicitly via
/// [Writer::close] or implicitly on [Drop]. A drop-time finalize failure is logged, not
/// panicked, to avoid a double panic during unwind — see `DESIGN.md` for the full rationale.
#[allow(missing_debug_implementations)]
pub struct Writer<W: Write + Seek> {
    write: Option<W>,
    schema: RecordInfo,
    start: u64,
    stats: WriterStats,
    records_per_block: usize,
    pending: Vec<Record>,
    creation_date: Option<u32>,
    closed: bool,
}

impl<W: Write + Seek> Writer<W> {
    /// Creates a new writer with the default [WriterOptions].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use yxdb::field::{Field, FieldType};
    /// use yxdb::record::RecordInfo;
    /// use yxdb::writer::Writer;
    /// let schema = RecordInfo::new(vec![Field::new("a", FieldType::Int32, None, None).unwrap()]).unwrap();
    /// let writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
    /// ```
    pub fn new(write: W, schema: RecordInfo) -> Result<Writer<W>> {
        Writer::with_options(write, schema, WriterOptions::default())
    }

    /// Creates a new writer with custom [WriterOptions].
    pub fn with_options(mut write: W, schema: RecordInfo, options: WriterOptions) -> Result<Writer<W>> {
        let start = write.stream_position()?;
        write.write_all(&[0u8; HEADER_SIZE])?;
        let schema_bytes = render_schema(&schema);
        write.write_all(&schema_bytes)?;

        let stats = WriterStats {
            metadata_length: schema_bytes.len() as u64,
            ..Default::default()
        };

        Ok(Writer {
            write: Some(write),
            schema,
            start,
            stats,
            records_per_block: options.records_per_block.max(1),
            pending: Vec::new(),
            creation_date: None,
            closed: false,
        })
    }

    /// Overrides the `creationDate` stamped into the header on close, for deterministic tests.
    pub fn with_creation_date(mut self, unix_seconds: u32) -> Self {
        self.creation_date = Some(unix_seconds);
        self
    }

    /// This writer's schema.
    pub fn schema(&self) -> &RecordInfo {
        &self.schema
    }

    fn handle(&mut self) -> &mut W {
        self.write
            .as_mut()
            .expect("writer is used after being closed or consumed")
    }

    /// Buffers `record`, emitting a block once `records_per_block` records have accumulated.
    pub fn write(&mut self, record: Record) -> Result<()> {
        self.pending.push(record);
        self.stats.num_records += 1;
        if self.pending.len() >= self.records_per_block {
            self.flush_block()?;
        }
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let mut payload = Vec::new();
        for record in self.pending.drain(..) {
            encode_record(&mut payload, &self.schema, &record)?;
        }
        let mut block = Vec::new();
        write_block(&mut block, &payload)?;
        self.handle().write_all(&block)?;
        self.stats.block_lengths.push(block.len() as u64);
        log::debug!(
            "flushed block #{} ({} bytes on disk)",
            self.stats.block_lengths.len(),
            block.len()
        );
        Ok(())
    }

    /// Finalizes the file: flushes any buffered records into a final block, computes and patches
    /// the header in place, then appends the block index (`spec.md` §4.7 steps 4–6).
    ///
    /// Idempotent: calling `close` more than once is a no-op after the first call succeeds.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush_block()?;

        let offsets = self.stats.block_offsets();
        let record_block_index_pos = self.stats.record_block_index_pos();
        let creation_date = self.creation_date.unwrap_or_else(now_unix_seconds);

        let mut header = Header {
            file_id: FILE_ID_WITH_SPATIAL_INDEX,
            creation_date,
            meta_info_length: (self.stats.metadata_length / 2) as u32,
            record_block_index_pos,
            num_records: self.stats.num_records,
            compression_version: 1,
            ..Default::default()
        };
        header.set_description(&default_description());

        let start = self.start;
        self.handle().seek(SeekFrom::Start(start))?;
        header.write_to(self.handle())?;

        let block_index_start = self.start + record_block_index_pos;
        self.handle().seek(SeekFrom::Start(block_index_start))?;
        BlockIndex::new(offsets).write_to(self.handle())?;

        log::debug!(
            "finalized yxdb file: {} records, {} blocks",
            header.num_records,
            self.stats.block_lengths.len()
        );
        self.closed = true;
        Ok(())
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.write.as_ref().expect("writer is used after being consumed")
    }

    /// Closes the writer (if not already closed) and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.close()?;
        Ok(self.write.take().expect("write handle present until consumed"))
    }
}

impl<W: Write + Seek> Drop for Writer<W> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::error!("failed to finalize yxdb writer on drop: {}", e);
            }
        }
    }
}

impl Writer<BufWriter<File>> {
    /// Creates `path` and opens a writer for it.
    pub fn from_path<P: AsRef<Path>>(path: P, schema: RecordInfo) -> Result<Writer<BufWriter<File>>> {
        let file = BufWriter::new(File::create(path)?);
        Writer::new(file, schema)
    }
}

/// Writes every record from `records` to `write`, then finalizes.
///
/// This is `sinkRecords(handle, schema) <- stream<Record>` from `spec.md` §6.
pub fn sink_records<W: Write + Seek>(
    write: W,
    schema: RecordInfo,
    records: impl IntoIterator<Item = Record>,
) -> Result<W> {
    let mut writer = Writer::new(write, schema)?;
    for record in records {
        writer.write(record)?;
    }
    writer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, FieldType, FieldValue};
    use crate::header::FILE_ID_WITH_SPATIAL_INDEX;
    use crate::reader::Reader;
    use std::io::Cursor;

    fn schema() -> RecordInfo {
        RecordInfo::new(vec![
            Field::new("a", FieldType::Int32, None, None).unwrap(),
            Field::new("b", FieldType::String, Some(4), None).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn empty_stream_writes_zero_blocks() {
        let schema = schema();
        let mut writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
        writer.close().unwrap();
        let cursor = writer.into_inner().unwrap();
        let mut reader = Reader::new(cursor).unwrap();
        assert_eq!(0, reader.metadata().header.num_records);
        assert!(reader.metadata().block_index.is_empty());
        assert_eq!(
            reader.metadata().start_of_blocks(),
            reader.metadata().header.record_block_index_pos
        );
    }

    #[test]
    fn single_record_block_boundary() {
        let schema = schema();
        let options = WriterOptions::default().with_records_per_block(2);
        let mut writer = Writer::with_options(Cursor::new(Vec::new()), schema, options).unwrap();
        for n in 0..3 {
            writer
                .write(vec![
                    Some(FieldValue::Int32(n)),
                    Some(FieldValue::String("abcd".to_string())),
                ])
                .unwrap();
        }
        let cursor = writer.into_inner().unwrap();
        let mut reader = Reader::new(cursor).unwrap();
        assert_eq!(2, reader.metadata().block_index.len());
        assert_eq!(3, reader.metadata().header.num_records);
    }

    #[test]
    fn header_magic_and_fixed_creation_date() {
        let schema = schema();
        let mut writer = Writer::new(Cursor::new(Vec::new()), schema)
            .unwrap()
            .with_creation_date(1_700_000_000);
        writer
            .write(vec![
                Some(FieldValue::Int32(1)),
                Some(FieldValue::String("abcd".to_string())),
            ])
            .unwrap();
        writer.close().unwrap();
        let cursor = writer.into_inner().unwrap();
        let mut reader = Reader::new(cursor).unwrap();
        assert_eq!(FILE_ID_WITH_SPATIAL_INDEX, reader.metadata().header.file_id);
        assert_eq!(1_700_000_000, reader.metadata().header.creation_date);
    }

    #[test]
    fn drop_finalizes_without_explicit_close() {
        let schema = schema();
        let mut buf = Vec::new();
        {
            let mut writer = Writer::new(Cursor::new(&mut buf), schema).unwrap();
            writer
                .write(vec![Some(FieldValue::Int32(1)), None])
                .unwrap();
        }
        let mut reader = Reader::new(Cursor::new(buf)).unwrap();
        assert_eq!(1, reader.metadata().header.num_records);
        let records: Vec<Record> = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(1, records.len());
    }

    #[test]
    fn sink_records_helper() {
        let schema = schema();
        let records = vec![
            vec![Some(FieldValue::Int32(1)), Some(FieldValue::String("abcd".to_string()))],
            vec![Some(FieldValue::Int32(2)), None],
        ];
        let cursor = sink_records(Cursor::new(Vec::new()), schema, records.clone()).unwrap();
        let mut reader = Reader::new(cursor).unwrap();
        let decoded: Vec<Record> = reader.records().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(records, decoded);
    }
}
