//! End-to-end scenarios from `spec.md` §8.

extern crate yxdb;

use std::io::Cursor;
use yxdb::field::{Field, FieldType, FieldValue};
use yxdb::header::FILE_ID_WITH_SPATIAL_INDEX;
use yxdb::record::{Record, RecordInfo};
use yxdb::reader::Reader;
use yxdb::writer::{Writer, WriterOptions};

fn two_field_schema() -> RecordInfo {
    RecordInfo::new(vec![
        Field::new("a", FieldType::Int32, None, None).unwrap(),
        Field::new("b", FieldType::String, Some(4), None).unwrap(),
    ])
    .unwrap()
}

#[test]
fn two_records_yield_expected_header_and_index() {
    let schema = two_field_schema();
    let mut writer = Writer::new(Cursor::new(Vec::new()), schema)
        .unwrap()
        .with_creation_date(0);
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
    assert_eq!(FILE_ID_WITH_SPATIAL_INDEX, reader.metadata().header.file_id);
    assert_eq!(2, reader.metadata().header.num_records);
    assert_eq!(1, reader.metadata().block_index.len());
    assert_eq!(
        reader.metadata().start_of_blocks(),
        reader.metadata().block_index.offsets()[0]
    );

    let records: Vec<Record> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(2, records.len());
}

#[test]
fn many_records_split_across_exactly_two_blocks() {
    let schema = RecordInfo::new(vec![Field::new("x", FieldType::Double, None, None).unwrap()]).unwrap();
    let mut writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
    for _ in 0..65537u32 {
        writer.write(vec![Some(FieldValue::Double(1.0))]).unwrap();
    }
    let cursor = writer.into_inner().unwrap();

    let mut reader = Reader::new(cursor).unwrap();
    assert_eq!(65537, reader.metadata().header.num_records);
    let offsets = reader.metadata().block_index.offsets();
    assert_eq!(2, offsets.len());
    assert!(offsets[1] > offsets[0]);
}

#[test]
fn incompressible_block_keeps_literal_bit_set_on_reencode() {
    let schema = RecordInfo::new(vec![Field::new("x", FieldType::Int32, None, None).unwrap()]).unwrap();
    let mut writer = Writer::new(Cursor::new(Vec::new()), schema.clone()).unwrap();
    // n * 2654435761 mod 256 is a bijection of n mod 256, so this stays free of 3-byte
    // repeats (and thus genuinely incompressible) only below 256 records.
    for n in 0..200i32 {
        writer
            .write(vec![Some(FieldValue::Int32(n.wrapping_mul(2654435761u32 as i32)))])
            .unwrap();
    }
    let cursor = writer.into_inner().unwrap();

    let mut reader = Reader::new(cursor).unwrap();
    let records: Vec<Record> = reader.records().collect::<Result<_, _>>().unwrap();

    let mut rewritten = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
    for record in &records {
        rewritten.write(record.clone()).unwrap();
    }
    let cursor2 = rewritten.into_inner().unwrap();
    let mut reader2 = Reader::new(cursor2).unwrap();
    let records2: Vec<Record> = reader2.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records, records2);
}

#[test]
fn small_blocks_via_writer_options() {
    let schema = two_field_schema();
    let options = WriterOptions::default().with_records_per_block(3);
    let mut writer = Writer::with_options(Cursor::new(Vec::new()), schema, options).unwrap();
    for n in 0..7i32 {
        writer
            .write(vec![Some(FieldValue::Int32(n)), Some(FieldValue::String("abcd".to_string()))])
            .unwrap();
    }
    let cursor = writer.into_inner().unwrap();
    let mut reader = Reader::new(cursor).unwrap();
    assert_eq!(3, reader.metadata().block_index.len());
    let records: Vec<Record> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(7, records.len());
}

#[test]
fn nulls_roundtrip_through_a_file() {
    let schema = two_field_schema();
    let mut writer = Writer::new(Cursor::new(Vec::new()), schema).unwrap();
    writer.write(vec![None, None]).unwrap();
    writer
        .write(vec![Some(FieldValue::Int32(9)), None])
        .unwrap();
    let cursor = writer.into_inner().unwrap();

    let mut reader = Reader::new(cursor).unwrap();
    let records: Vec<Record> = reader.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(vec![None, None], records[0]);
    assert_eq!(vec![Some(FieldValue::Int32(9)), None], records[1]);
}
