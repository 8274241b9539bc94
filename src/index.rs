//! The trailing block-index codec (`spec.md` §4.4): `count` followed by `count` absolute offsets.

use crate::error::{IndexError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// An ordered, strictly increasing sequence of absolute byte offsets, one per block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockIndex(Vec<u64>);

impl BlockIndex {
    /// Wraps a list of offsets, without validating monotonicity (see [BlockIndex::decode] for
    /// the validating constructor used when reading from disk).
    pub fn new(offsets: Vec<u64>) -> BlockIndex {
        BlockIndex(offsets)
    }

    /// The offsets, in block order.
    pub fn offsets(&self) -> &[u64] {
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

    /// Pairs consecutive offsets into half-open byte ranges, with the final range ending at
    /// `end_of_blocks` (the block index's own start position).
    pub fn ranges(&self, end_of_blocks: u64) -> Vec<(u64, u64)> {
        let mut ranges = Vec::with_capacity(self.0.len());
        for (i, &start) in self.0.iter().enumerate() {
            let end = self.0.get(i + 1).copied().unwrap_or(end_of_blocks);
            ranges.push((start, end));
        }
        ranges
    }

    /// Writes `count` then the offsets, per `spec.md` §4.4.
    pub fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_u32::<LittleEndian>(self.0.len() as u32)?;
        for &offset in &self.0 {
            write.write_u64::<LittleEndian>(offset)?;
        }
        Ok(())
    }

    /// Reads a block index from `read`, which must contain exactly `count * 8` trailing bytes
    /// after the 4-byte count, and validates that offsets are strictly increasing.
    pub fn read_from<R: Read>(read: &mut R, trailer_len: u64) -> Result<BlockIndex> {
        let count = read.read_u32::<LittleEndian>()?;
        let expected = count as u64 * 8;
        if expected + 4 != trailer_len {
            return Err(IndexError::CountMismatch {
                count,
                expected,
                found: trailer_len.saturating_sub(4),
            }
            .into());
        }
        let mut offsets = Vec::with_capacity(count as usize);
        let mut previous = None;
        for position in 0..count as usize {
            let offset = read.read_u64::<LittleEndian>()?;
            if let Some(prev) = previous {
                if offset <= prev {
                    return Err(IndexError::NotMonotone {
                        position,
                        previous: prev,
                        next: offset,
                    }
                    .into());
                }
            }
            previous = Some(offset);
            offsets.push(offset);
        }
        Ok(BlockIndex(offsets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip() {
        let index = BlockIndex::new(vec![536, 1024, 2048]);
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        let trailer_len = buf.len() as u64;
        let decoded = BlockIndex::read_from(&mut Cursor::new(buf), trailer_len).unwrap();
        assert_eq!(index, decoded);
    }

    #[test]
    fn empty_index_roundtrips() {
        let index = BlockIndex::new(Vec::new());
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        let trailer_len = buf.len() as u64;
        let decoded = BlockIndex::read_from(&mut Cursor::new(buf), trailer_len).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn rejects_non_monotone_offsets() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(2).unwrap();
        buf.write_u64::<LittleEndian>(100).unwrap();
        buf.write_u64::<LittleEndian>(50).unwrap();
        let trailer_len = buf.len() as u64;
        assert!(BlockIndex::read_from(&mut Cursor::new(buf), trailer_len).is_err());
    }

    #[test]
    fn rejects_count_mismatch() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(5).unwrap();
        buf.write_u64::<LittleEndian>(100).unwrap();
        let trailer_len = buf.len() as u64;
        assert!(BlockIndex::read_from(&mut Cursor::new(buf), trailer_len).is_err());
    }

    #[test]
    fn ranges_pair_consecutive_offsets() {
        let index = BlockIndex::new(vec![10, 20, 30]);
        assert_eq!(vec![(10, 20), (20, 30), (30, 40)], index.ranges(40));
    }
}
