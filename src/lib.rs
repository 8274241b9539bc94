//! Reads and writes records stored in the YXDB columnar/record database format, plus its
//! "Calgary" sibling container and a pipe-delimited textual interchange form.
//!
//! YXDB files are a fixed 512-byte header, followed by a UTF-16 LE XML schema, followed by a
//! sequence of length-prefixed, optionally LZF-compressed record blocks, followed by a trailing
//! table of block offsets.
//!
//! # Reading records
//!
//! ```
//! use std::io::Cursor;
//! use yxdb::field::{Field, FieldType, FieldValue};
//! use yxdb::record::RecordInfo;
//! use yxdb::writer::Writer;
//! use yxdb::reader::Reader;
//!
//! let schema = RecordInfo::new(vec![Field::new("a", FieldType::Int32, None, None).unwrap()]).unwrap();
//! let mut writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
//! writer.write(vec![Some(FieldValue::Int32(42))]).unwrap();
//! let cursor = writer.into_inner().unwrap();
//!
//! let mut reader = Reader::new(cursor).unwrap();
//! for record in reader.records() {
//!     let record = record.unwrap();
//!     assert_eq!(Some(FieldValue::Int32(42)), record[0]);
//! }
//! ```
//!
//! # Writing records
//!
//! A [writer::Writer] re-writes the header and appends the block index when it closes, either
//! explicitly via [writer::Writer::close] or implicitly on [Drop]. A failed drop-time finalize is
//! logged, not panicked:
//!
//! ```
//! use std::io::Cursor;
//! use yxdb::field::{Field, FieldType};
//! use yxdb::record::RecordInfo;
//! use yxdb::writer::Writer;
//!
//! let schema = RecordInfo::new(vec![Field::new("a", FieldType::Int32, None, None).unwrap()]).unwrap();
//! let mut writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
//! writer.close().unwrap();
//! ```
//!
//! # Textual interchange
//!
//! The pipe-delimited format round-trips a [record::RecordInfo] and its rows for import/export:
//!
//! ```
//! use yxdb::text::{parse_csv_header, parse_row};
//! let schema = parse_csv_header("a:int(32)|b:string(4)").unwrap();
//! let record = parse_row(&schema, "42|abcd", 1).unwrap();
//! ```

#![deny(
    missing_docs,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

extern crate byteorder;
extern crate chrono;
#[macro_use]
extern crate log;

pub mod block;
pub mod calgary;
pub mod error;
pub mod field;
pub mod header;
pub mod index;
mod lzf;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod schema;
pub mod text;
pub mod writer;

pub use calgary::CalgaryFile;
pub use error::Error;
pub use field::{Field, FieldType, FieldValue};
pub use header::Header;
pub use reader::{Reader, YxdbMetadata};
pub use record::RecordInfo;
pub use writer::Writer;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
