//! XML schema codec round-trips across the full field-type surface.

extern crate yxdb;

use yxdb::field::{Field, FieldType};
use yxdb::record::RecordInfo;
use yxdb::schema::{parse_schema, render_schema};

#[test]
fn every_field_type_roundtrips_through_xml() {
    let schema = RecordInfo::new(vec![
        Field::new("a", FieldType::Bool, None, None).unwrap(),
        Field::new("b", FieldType::Byte, None, None).unwrap(),
        Field::new("c", FieldType::Int16, None, None).unwrap(),
        Field::new("d", FieldType::Int32, None, None).unwrap(),
        Field::new("e", FieldType::Int64, None, None).unwrap(),
        Field::new("f", FieldType::FixedDecimal, Some(12), Some(3)).unwrap(),
        Field::new("g", FieldType::Float, None, None).unwrap(),
        Field::new("h", FieldType::Double, None, None).unwrap(),
        Field::new("i", FieldType::String, Some(16), None).unwrap(),
        Field::new("j", FieldType::WString, Some(16), None).unwrap(),
        Field::new("k", FieldType::VString, Some(0), None).unwrap(),
        Field::new("l", FieldType::VWString, Some(0), None).unwrap(),
        Field::new("m", FieldType::Date, None, None).unwrap(),
        Field::new("n", FieldType::Time, None, None).unwrap(),
        Field::new("o", FieldType::DateTime, None, None).unwrap(),
        Field::new("p", FieldType::Blob, Some(0), None).unwrap(),
        Field::new("q", FieldType::SpatialObject, Some(0), None).unwrap(),
        Field::new("r", FieldType::Unknown, None, None).unwrap(),
    ])
    .unwrap();

    let bytes = render_schema(&schema);
    assert_eq!(0, bytes.len() % 2, "UTF-16 LE payload must be an even number of bytes");
    let decoded = parse_schema(&bytes).unwrap();
    assert_eq!(schema, decoded);
}

#[test]
fn field_names_need_not_be_unique() {
    let schema = RecordInfo::new(vec![
        Field::new("a", FieldType::Int32, None, None).unwrap(),
        Field::new("a", FieldType::Int32, None, None).unwrap(),
    ])
    .unwrap();
    let decoded = parse_schema(&render_schema(&schema)).unwrap();
    assert_eq!(2, decoded.len());
}
