//! Length-prefixed, optionally LZF-compressed block framing (`spec.md` §4.3).

use crate::error::{BlockError, Result};
use crate::lzf;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Bit 31 of the on-disk length word marks the payload as literal (uncompressed) when set.
const LITERAL_FLAG: u32 = 0x8000_0000;
const LENGTH_MASK: u32 = 0x7FFF_FFFF;

/// The fixed size of the scratch buffer decompression must fit within.
pub const DECOMPRESS_BUFFER_SIZE: usize = 0x40000;

/// Writes `payload` as one block: a `u32` LE length-and-flag word followed by either its LZF
/// compression or, if that doesn't shrink it, the literal bytes (`spec.md` §4.3's compression
/// rule).
///
/// Returns the total number of bytes written (the 4-byte prefix plus the stored payload).
pub fn write_block<W: Write>(write: &mut W, payload: &[u8]) -> Result<usize> {
    let budget = payload.len().saturating_sub(1);
    let (stored, literal) = match lzf::compress(payload, budget) {
        Some(compressed) => (compressed, false),
        None => (payload.to_vec(), true),
    };

    let length = stored.len() as u32;
    debug_assert!(length & LITERAL_FLAG == 0, "payload too large to frame");
    let word = if literal { length | LITERAL_FLAG } else { length };

    write.write_u32::<LittleEndian>(word)?;
    write.write_all(&stored)?;

    log::trace!(
        "wrote block: {} bytes uncompressed -> {} bytes ({})",
        payload.len(),
        stored.len(),
        if literal { "literal" } else { "compressed" }
    );

    Ok(4 + stored.len())
}

/// Reads one block starting at `offset` and returns its decompressed payload.
///
/// `offset` is the absolute file offset of the length prefix, used for error context only.
pub fn read_block<R: Read>(read: &mut R, offset: u64) -> Result<Vec<u8>> {
    let word = read.read_u32::<LittleEndian>()?;
    let literal = word & LITERAL_FLAG != 0;
    let length = (word & LENGTH_MASK) as usize;

    let mut stored = vec![0u8; length];
    read.read_exact(&mut stored).map_err(|_| BlockError::Truncated {
        offset,
        expected: length,
        found: 0,
    })?;

    if literal {
        if stored.len() > DECOMPRESS_BUFFER_SIZE {
            return Err(BlockError::DecompressionFailed { offset }.into());
        }
        Ok(stored)
    } else {
        lzf::decompress(&stored, DECOMPRESS_BUFFER_SIZE)
            .ok_or_else(|| BlockError::DecompressionFailed { offset }.into())
    }
}

/// Reads one block whose bytes are exactly `range` (already sliced from the file), validating
/// that the length prefix doesn't claim more than `range` holds.
pub fn read_block_from_range(range: &[u8], offset: u64) -> Result<Vec<u8>> {
    if range.len() < 4 {
        return Err(BlockError::Truncated {
            offset,
            expected: 4,
            found: range.len(),
        }
        .into());
    }
    let word = u32::from_le_bytes([range[0], range[1], range[2], range[3]]);
    let literal = word & LITERAL_FLAG != 0;
    let length = (word & LENGTH_MASK) as usize;
    let available = range.len() - 4;
    if length > available {
        return Err(BlockError::LengthExceedsRange {
            offset,
            length,
            remaining: available,
        }
        .into());
    }
    let stored = &range[4..4 + length];
    if literal {
        if stored.len() > DECOMPRESS_BUFFER_SIZE {
            return Err(BlockError::DecompressionFailed { offset }.into());
        }
        Ok(stored.to_vec())
    } else {
        lzf::decompress(stored, DECOMPRESS_BUFFER_SIZE)
            .ok_or_else(|| BlockError::DecompressionFailed { offset }.into())
    }
}
