//! Crate-specific errors.

use thiserror::Error;

/// Errors raised while reading or writing the 512-byte file header.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// The magic `fileId` did not match either recognized value.
    #[error("unrecognized file id 0x{found:08x} at byte offset 0")]
    WrongMagic {
        /// The value actually found.
        found: u32,
    },
    /// Fewer than 512 bytes were available where a header was expected.
    #[error("truncated header: expected 512 bytes, found {found}")]
    Truncated {
        /// The number of bytes actually available.
        found: usize,
    },
}

/// Errors raised while rendering or parsing the XML schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The XML was not well-formed.
    #[error("malformed schema XML at byte offset {offset}: {message}")]
    Malformed {
        /// Byte offset into the schema document.
        offset: usize,
        /// Description of the problem.
        message: String,
    },
    /// A `<Field>` declared a `type` attribute that isn't a known `FieldType`.
    #[error("unknown field type '{found}' for field '{field}'")]
    UnknownFieldType {
        /// The field whose type could not be parsed.
        field: String,
        /// The attribute value found.
        found: String,
    },
    /// A field requiring `size` or `scale` did not declare it (or declared one it shouldn't).
    #[error("field '{field}' is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// The offending field.
        field: String,
        /// The missing attribute name.
        attribute: &'static str,
    },
    /// Zero or more than one `<RecordInfo>` element was present.
    #[error("expected exactly one <RecordInfo> element, found {found}")]
    RecordInfoCount {
        /// The number of `<RecordInfo>` elements found.
        found: usize,
    },
}

/// Errors raised while decoding or encoding a block.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Fewer bytes were available than the length prefix promised.
    #[error("truncated block at byte offset {offset}: expected {expected} bytes, found {found}")]
    Truncated {
        /// Byte offset of the block's length prefix.
        offset: u64,
        /// Bytes the length prefix promised.
        expected: usize,
        /// Bytes actually available.
        found: usize,
    },
    /// The length prefix claims more bytes than remain before the block index.
    #[error("block length prefix at byte offset {offset} ({length} bytes) exceeds remaining range ({remaining} bytes)")]
    LengthExceedsRange {
        /// Byte offset of the block's length prefix.
        offset: u64,
        /// The length the prefix declared.
        length: usize,
        /// Bytes actually remaining in the file before the index.
        remaining: usize,
    },
    /// LZF decompression failed (corrupt data, or the output would exceed the scratch buffer).
    #[error("LZF decompression failed for block at byte offset {offset}")]
    DecompressionFailed {
        /// Byte offset of the block's length prefix.
        offset: u64,
    },
}

/// Errors raised while decoding or encoding a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A field's raw bytes could not be interpreted as its declared type.
    #[error("failed to decode field '{field}' ({index}) at byte offset {offset}: {message}")]
    FieldDecode {
        /// The field's name.
        field: String,
        /// The field's position in the schema.
        index: usize,
        /// Byte offset within the record stream.
        offset: u64,
        /// Description of the problem.
        message: String,
    },
    /// A decoded record did not have as many values as the schema has fields.
    #[error("record has {found} values but schema declares {expected} fields")]
    FieldCountMismatch {
        /// Fields declared by the schema.
        expected: usize,
        /// Values actually present.
        found: usize,
    },
}

/// Errors raised while decoding the trailing block index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The offsets were not strictly increasing.
    #[error("block index offsets are not strictly increasing at position {position}: {previous} >= {next}")]
    NotMonotone {
        /// Index of the offending offset.
        position: usize,
        /// The preceding offset.
        previous: u64,
        /// The offending offset.
        next: u64,
    },
    /// `count * 8` bytes did not fit in the trailer.
    #[error("block index declares {count} entries ({expected} bytes) but only {found} bytes remain")]
    CountMismatch {
        /// The declared entry count.
        count: u32,
        /// Bytes the count implies (`count * 8`).
        expected: u64,
        /// Bytes actually available.
        found: u64,
    },
}

/// Errors raised while parsing the pipe-delimited textual format.
#[derive(Debug, Error)]
pub enum TextError {
    /// The schema header line didn't match the grammar.
    #[error("malformed CSV header field '{field}': {message}")]
    MalformedHeader {
        /// The offending `name:type` segment.
        field: String,
        /// Description of the problem.
        message: String,
    },
    /// A row field couldn't be parsed as its declared type.
    #[error("failed to parse field '{field}' on line {line}: {message}")]
    FieldParse {
        /// The field's name.
        field: String,
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },
}

/// Crate-specific errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Wraps [`HeaderError`].
    #[error(transparent)]
    Header(#[from] HeaderError),
    /// Wraps [`SchemaError`].
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Wraps [`BlockError`].
    #[error(transparent)]
    Block(#[from] BlockError),
    /// Wraps [`RecordError`].
    #[error(transparent)]
    Record(#[from] RecordError),
    /// Wraps [`IndexError`].
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Wraps [`TextError`].
    #[error(transparent)]
    Text(#[from] TextError),
    /// Wraps `std::io::Error`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
