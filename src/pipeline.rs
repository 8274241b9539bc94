//! Stage constructors turning records into blocks and back (`spec.md` §4.7, component G).

use crate::block::{read_block_from_range, write_block};
use crate::error::Result;
use crate::record::{decode_record, encode_record, Record, RecordInfo};
use std::io::Cursor;

/// Records buffered into one block before the block codec runs (`spec.md` §4.7).
pub const RECORDS_PER_BLOCK: usize = 0x10000;

/// Turns a stream of records into a stream of on-disk blocks (length prefix + optionally
/// compressed payload), buffering up to `records_per_block` records per block.
///
/// This is the stage constructor `recordsToBlocks(schema)` from `spec.md` §6.
#[allow(missing_debug_implementations)]
pub struct RecordsToBlocks<I> {
    schema: RecordInfo,
    records_per_block: usize,
    records: I,
    done: bool,
}

impl<I: Iterator<Item = Record>> RecordsToBlocks<I> {
    /// Creates a new stage over `records`, using `schema` to encode each one.
    pub fn new(schema: RecordInfo, records_per_block: usize, records: I) -> Self {
        RecordsToBlocks {
            schema,
            records_per_block,
            records,
            done: false,
        }
    }
}

impl<I: Iterator<Item = Record>> Iterator for RecordsToBlocks<I> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Result<Vec<u8>>> {
        if self.done {
            return None;
        }
        let mut payload = Vec::new();
        let mut count = 0usize;
        while count < self.records_per_block {
            match self.records.next() {
                Some(record) => {
                    if let Err(e) = encode_record(&mut payload, &self.schema, &record) {
                        return Some(Err(e));
                    }
                    count += 1;
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }
        if count == 0 {
            return None;
        }
        let mut block = Vec::new();
        match write_block(&mut block, &payload) {
            Ok(_) => Some(Ok(block)),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Turns a stream of already-range-sliced on-disk blocks into a stream of records, decoding each
/// block's payload sequentially with no record straddling a block boundary.
///
/// This is the stage constructor `blocksToRecords(schema)` from `spec.md` §6.
#[allow(missing_debug_implementations)]
pub struct BlocksToRecords<I> {
    schema: RecordInfo,
    blocks: I,
    current: Cursor<Vec<u8>>,
    current_offset: u64,
}

impl<I: Iterator<Item = Result<(u64, Vec<u8>)>>> BlocksToRecords<I> {
    /// Creates a new stage over `blocks`, an iterator of `(absolute offset, raw on-disk block
    /// bytes)` pairs.
    pub fn new(schema: RecordInfo, blocks: I) -> Self {
        BlocksToRecords {
            schema,
            blocks,
            current: Cursor::new(Vec::new()),
            current_offset: 0,
        }
    }
}

impl<I: Iterator<Item = Result<(u64, Vec<u8>)>>> Iterator for BlocksToRecords<I> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        loop {
            if (self.current.position() as usize) < self.current.get_ref().len() {
                return Some(decode_record(&mut self.current, &self.schema, self.current_offset));
            }
            match self.blocks.next() {
                Some(Ok((offset, raw_block))) => {
                    self.current_offset = offset;
                    match read_block_from_range(&raw_block, offset) {
                        Ok(payload) => self.current = Cursor::new(payload),
                        Err(e) => return Some(Err(e)),
                    }
                }
                Some(Err(e)) => return Some(Err(e)),
                None => return None,
            }
        }
    }
}

/// The writer's private statistics accumulator (`spec.md` §4.7), threaded single-owner through
/// [crate::writer::Writer].
#[derive(Debug, Default)]
pub struct WriterStats {
    /// Byte length of the serialized schema.
    pub metadata_length: u64,
    /// On-disk length of each emitted block, in emission order (appended as blocks are written).
    pub block_lengths: Vec<u64>,
    /// Cumulative record count.
    pub num_records: u64,
}

impl WriterStats {
    /// The absolute offset of the first block, given `metadata_length` has been set.
    pub fn start_of_blocks(&self) -> u64 {
        crate::header::HEADER_SIZE as u64 + self.metadata_length
    }

    /// Computes the block index implied by `block_lengths`, per `spec.md` §4.7 step 4.
    pub fn block_offsets(&self) -> Vec<u64> {
        let mut offset = self.start_of_blocks();
        let mut offsets = Vec::with_capacity(self.block_lengths.len());
        for &len in &self.block_lengths {
            offsets.push(offset);
            offset += len;
        }
        offsets
    }

    /// The absolute offset where the block index begins: the end of the last block.
    pub fn record_block_index_pos(&self) -> u64 {
        self.start_of_blocks() + self.block_lengths.iter().sum::<u64>()
    }
}
