//! Schemas (`RecordInfo`) and the record codec driven by them.

use crate::error::{RecordError, Result};
use crate::field::{decode_field, encode_field, Field, FieldValue};
use std::io::{Read, Write};

/// An ordered, non-empty list of [Field]s. Field position, not name, is authoritative.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordInfo(Vec<Field>);

impl RecordInfo {
    /// Creates a new `RecordInfo` from a non-empty list of fields.
    ///
    /// # Examples
    ///
    /// ```
    /// use yxdb::field::{Field, FieldType};
    /// use yxdb::record::RecordInfo;
    /// let fields = vec![Field::new("a", FieldType::Int32, None, None).unwrap()];
    /// let info = RecordInfo::new(fields).unwrap();
    /// assert_eq!(1, info.len());
    /// ```
    pub fn new(fields: Vec<Field>) -> Result<RecordInfo> {
        if fields.is_empty() {
            return Err(RecordError::FieldCountMismatch {
                expected: 1,
                found: 0,
            }
            .into());
        }
        Ok(RecordInfo(fields))
    }

    /// The fields, in schema order.
    pub fn fields(&self) -> &[Field] {
        &self.0
    }

    /// The number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: a `RecordInfo` is never empty (enforced by [RecordInfo::new]).
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// An ordered sequence of optional field values, one per field in a [RecordInfo].
pub type Record = Vec<Option<FieldValue>>;

/// Encodes `record` as a concatenation of its field values, in schema order.
///
/// # Errors
///
/// Returns [RecordError::FieldCountMismatch] if `record.len() != schema.len()`.
pub fn encode_record<W: Write>(write: &mut W, schema: &RecordInfo, record: &Record) -> Result<()> {
    if record.len() != schema.len() {
        return Err(RecordError::FieldCountMismatch {
            expected: schema.len(),
            found: record.len(),
        }
        .into());
    }
    for (field, value) in schema.fields().iter().zip(record.iter()) {
        encode_field(write, field, value.as_ref())?;
    }
    Ok(())
}

/// Decodes one record from `read`, consuming exactly as many bytes as `schema` implies.
///
/// `offset` is the absolute byte offset of the start of the record, used for error context only.
pub fn decode_record<R: Read>(read: &mut R, schema: &RecordInfo, offset: u64) -> Result<Record> {
    let mut values = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        let value = decode_field(read, field, offset).map_err(|e| match e {
            crate::error::Error::Record(RecordError::FieldDecode {
                field: _,
                index: _,
                offset,
                message,
            }) => RecordError::FieldDecode {
                field: field.name.clone(),
                index: values.len(),
                offset,
                message,
            }
            .into(),
            other => other,
        })?;
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use std::io::Cursor;

    fn schema() -> RecordInfo {
        RecordInfo::new(vec![
            Field::new("a", FieldType::Int32, None, None).unwrap(),
            Field::new("b", FieldType::String, Some(4), None).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn roundtrip() {
        let schema = schema();
        let record: Record = vec![
            Some(FieldValue::Int32(1)),
            Some(FieldValue::String("abcd".to_string())),
        ];
        let mut buf = Vec::new();
        encode_record(&mut buf, &schema, &record).unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = decode_record(&mut cursor, &schema, 0).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn field_count_mismatch() {
        let schema = schema();
        let record: Record = vec![Some(FieldValue::Int32(1))];
        let mut buf = Vec::new();
        assert!(encode_record(&mut buf, &schema, &record).is_err());
    }

    #[test]
    fn empty_schema_rejected() {
        assert!(RecordInfo::new(Vec::new()).is_err());
    }
}
