//! The pipe-delimited textual interchange format (`spec.md` §4.9, component I): a schema header
//! line plus one row per record, used to import from and export to a line-oriented text form.

use crate::error::{Result, TextError};
use crate::field::{Field, FieldType, FieldValue};
use crate::record::{Record, RecordInfo};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

fn parse_type(text: &str) -> std::result::Result<(FieldType, Option<u32>, Option<u32>), String> {
    let (name, args) = match text.find('(') {
        Some(open) => {
            if !text.ends_with(')') {
                return Err(format!("unbalanced parentheses in type '{}'", text));
            }
            (&text[..open], Some(&text[open + 1..text.len() - 1]))
        }
        None => (text, None),
    };

    let parse_uint = |s: &str| s.trim().parse::<u32>().map_err(|_| format!("expected an integer, found '{}'", s));

    match name {
        "bool" => Ok((FieldType::Bool, None, None)),
        "int" => {
            let width = args.ok_or("int requires a width, e.g. int(32)")?;
            match width {
                "8" => Ok((FieldType::Byte, None, None)),
                "16" => Ok((FieldType::Int16, None, None)),
                "32" => Ok((FieldType::Int32, None, None)),
                "64" => Ok((FieldType::Int64, None, None)),
                other => Err(format!("unsupported int width '{}'", other)),
            }
        }
        "decimal" => {
            let args = args.ok_or("decimal requires (size,scale)")?;
            let (size, scale) = args
                .split_once(',')
                .ok_or("decimal requires two comma-separated arguments")?;
            Ok((FieldType::FixedDecimal, Some(parse_uint(size)?), Some(parse_uint(scale)?)))
        }
        "float" => Ok((FieldType::Float, None, None)),
        "double" => Ok((FieldType::Double, None, None)),
        "string" => Ok((FieldType::String, Some(parse_uint(args.ok_or("string requires a size")?)?), None)),
        "wstring" => Ok((FieldType::WString, Some(parse_uint(args.ok_or("wstring requires a size")?)?), None)),
        "vstring" => Ok((FieldType::VString, Some(args.map(parse_uint).transpose()?.unwrap_or(0)), None)),
        "vwstring" => Ok((FieldType::VWString, Some(args.map(parse_uint).transpose()?.unwrap_or(0)), None)),
        "date" => Ok((FieldType::Date, None, None)),
        "time" => Ok((FieldType::Time, None, None)),
        "datetime" => Ok((FieldType::DateTime, None, None)),
        "blob" => Ok((FieldType::Blob, Some(parse_uint(args.ok_or("blob requires a size")?)?), None)),
        "spatial" => Ok((FieldType::SpatialObject, Some(parse_uint(args.ok_or("spatial requires a size")?)?), None)),
        "unknown" => Ok((FieldType::Unknown, None, None)),
        other => Err(format!("unrecognized type '{}'", other)),
    }
}

fn render_type(field: &Field) -> String {
    match field.field_type {
        FieldType::Bool => "bool".to_string(),
        FieldType::Byte => "int(8)".to_string(),
        FieldType::Int16 => "int(16)".to_string(),
        FieldType::Int32 => "int(32)".to_string(),
        FieldType::Int64 => "int(64)".to_string(),
        FieldType::FixedDecimal => format!("decimal({},{})", field.size.unwrap_or(0), field.scale.unwrap_or(0)),
        FieldType::Float => "float".to_string(),
        FieldType::Double => "double".to_string(),
        FieldType::String => format!("string({})", field.size.unwrap_or(0)),
        FieldType::WString => format!("wstring({})", field.size.unwrap_or(0)),
        FieldType::VString => "vstring".to_string(),
        FieldType::VWString => "vwstring".to_string(),
        FieldType::Date => "date".to_string(),
        FieldType::Time => "time".to_string(),
        FieldType::DateTime => "datetime".to_string(),
        FieldType::Blob => format!("blob({})", field.size.unwrap_or(0)),
        FieldType::SpatialObject => format!("spatial({})", field.size.unwrap_or(0)),
        FieldType::Unknown => "unknown".to_string(),
    }
}

/// Parses a `name:type|name:type|...` header line into a [RecordInfo].
///
/// # Examples
///
/// ```
/// use yxdb::text::parse_csv_header;
/// let schema = parse_csv_header("month:date|market:int(16)|num_households:int(32)").unwrap();
/// assert_eq!(3, schema.len());
/// ```
pub fn parse_csv_header(text: &str) -> Result<RecordInfo> {
    let text = text.trim_end_matches(['\n', '\r']);
    let mut fields = Vec::new();
    for segment in text.split('|') {
        let (name, type_text) = segment.split_once(':').ok_or_else(|| TextError::MalformedHeader {
            field: segment.to_string(),
            message: "expected 'name:type'".to_string(),
        })?;
        let (field_type, size, scale) = parse_type(type_text).map_err(|message| TextError::MalformedHeader {
            field: segment.to_string(),
            message,
        })?;
        fields.push(Field::new(name, field_type, size, scale)?);
    }
    RecordInfo::new(fields)
}

/// Renders `schema` as a `name:type|name:type|...` header line (no trailing newline).
pub fn render_csv_header(schema: &RecordInfo) -> String {
    schema
        .fields()
        .iter()
        .map(|field| format!("{}:{}", field.name, render_type(field)))
        .collect::<Vec<_>>()
        .join("|")
}

fn parse_value(field: &Field, text: &str, line: usize) -> Result<Option<FieldValue>> {
    if text.is_empty() {
        return Ok(None);
    }
    let err = |message: String| TextError::FieldParse {
        field: field.name.clone(),
        line,
        message,
    };
    let value = match field.field_type {
        FieldType::Bool => match text {
            "true" | "1" => FieldValue::Bool(true),
            "false" | "0" => FieldValue::Bool(false),
            other => return Err(err(format!("invalid bool literal '{}'", other)).into()),
        },
        FieldType::Byte => FieldValue::Byte(text.parse().map_err(|_| err(format!("invalid byte '{}'", text)))?),
        FieldType::Int16 => FieldValue::Int16(text.parse().map_err(|_| err(format!("invalid int16 '{}'", text)))?),
        FieldType::Int32 => FieldValue::Int32(text.parse().map_err(|_| err(format!("invalid int32 '{}'", text)))?),
        FieldType::Int64 => FieldValue::Int64(text.parse().map_err(|_| err(format!("invalid int64 '{}'", text)))?),
        FieldType::FixedDecimal => FieldValue::FixedDecimal(text.to_string()),
        FieldType::Float => FieldValue::Float(text.parse().map_err(|_| err(format!("invalid float '{}'", text)))?),
        FieldType::Double => FieldValue::Double(text.parse().map_err(|_| err(format!("invalid double '{}'", text)))?),
        FieldType::String => FieldValue::String(text.to_string()),
        FieldType::WString => FieldValue::WString(text.to_string()),
        FieldType::VString => FieldValue::VString(text.to_string()),
        FieldType::VWString => FieldValue::VWString(text.to_string()),
        FieldType::Date => FieldValue::Date(
            NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| err(e.to_string()))?,
        ),
        FieldType::Time => FieldValue::Time(
            NaiveTime::parse_from_str(text, "%H:%M:%S").map_err(|e| err(e.to_string()))?,
        ),
        FieldType::DateTime => FieldValue::DateTime(
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map_err(|e| err(e.to_string()))?,
        ),
        FieldType::Blob => FieldValue::Blob(text.as_bytes().to_vec()),
        FieldType::SpatialObject => FieldValue::SpatialObject(text.as_bytes().to_vec()),
        FieldType::Unknown => FieldValue::Unknown,
    };
    Ok(Some(value))
}

fn render_value(value: Option<&FieldValue>) -> String {
    match value {
        None => String::new(),
        Some(FieldValue::Bool(b)) => b.to_string(),
        Some(FieldValue::Byte(n)) => n.to_string(),
        Some(FieldValue::Int16(n)) => n.to_string(),
        Some(FieldValue::Int32(n)) => n.to_string(),
        Some(FieldValue::Int64(n)) => n.to_string(),
        Some(FieldValue::FixedDecimal(s)) => s.trim().to_string(),
        Some(FieldValue::Float(n)) => n.to_string(),
        Some(FieldValue::Double(n)) => n.to_string(),
        Some(FieldValue::String(s)) => s.clone(),
        Some(FieldValue::WString(s)) => s.clone(),
        Some(FieldValue::VString(s)) => s.clone(),
        Some(FieldValue::VWString(s)) => s.clone(),
        Some(FieldValue::Date(d)) => d.format("%Y-%m-%d").to_string(),
        Some(FieldValue::Time(t)) => t.format("%H:%M:%S").to_string(),
        Some(FieldValue::DateTime(dt)) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Some(FieldValue::Blob(b)) => String::from_utf8_lossy(b).into_owned(),
        Some(FieldValue::SpatialObject(b)) => String::from_utf8_lossy(b).into_owned(),
        Some(FieldValue::Unknown) => String::new(),
    }
}

/// Parses one pipe-delimited row into a [Record]. Missing trailing fields and empty fields both
/// decode to `None`.
pub fn parse_row(schema: &RecordInfo, line: &str, line_no: usize) -> Result<Record> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut parts = line.split('|');
    let mut record = Vec::with_capacity(schema.len());
    for field in schema.fields() {
        let text = parts.next().unwrap_or("");
        record.push(parse_value(field, text, line_no)?);
    }
    Ok(record)
}

/// Renders one [Record] as a pipe-delimited row (no trailing newline).
pub fn render_row(record: &Record) -> String {
    record.iter().map(|v| render_value(v.as_ref())).collect::<Vec<_>>().join("|")
}

/// The stage constructor turning text lines into records, driven by `schema`.
#[allow(missing_debug_implementations)]
pub struct CsvToRecords<I> {
    schema: RecordInfo,
    lines: I,
    line_no: usize,
}

impl<I: Iterator<Item = String>> CsvToRecords<I> {
    /// Creates a new stage over `lines` (row lines only; the header line must already be
    /// consumed).
    pub fn new(schema: RecordInfo, lines: I) -> Self {
        CsvToRecords {
            schema,
            lines,
            line_no: 1,
        }
    }
}

impl<I: Iterator<Item = String>> Iterator for CsvToRecords<I> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        let line = self.lines.next()?;
        let result = parse_row(&self.schema, &line, self.line_no);
        self.line_no += 1;
        Some(result)
    }
}

/// Turns a stream of text `lines` into a stream of [Record]s, per `schema`.
///
/// This is the stage constructor `csv2records(schema)` from `spec.md` §6.
pub fn csv2records<I: Iterator<Item = String>>(schema: RecordInfo, lines: I) -> CsvToRecords<I> {
    CsvToRecords::new(schema, lines)
}

/// Turns a stream of [Record]s into a stream of rendered row lines.
///
/// This is the stage constructor `record2csv(schema)` from `spec.md` §6. Rendering cannot fail, so
/// unlike [csv2records] the item type is `String`, not `Result<String>`.
pub fn record2csv<I: Iterator<Item = Record>>(records: I) -> impl Iterator<Item = String> {
    records.map(|record| render_row(&record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let schema = parse_csv_header("month:date|market:int(16)|num_households:int(32)").unwrap();
        assert_eq!(3, schema.len());
        assert_eq!(FieldType::Date, schema.fields()[0].field_type);
        assert_eq!(FieldType::Int16, schema.fields()[1].field_type);
        assert_eq!(FieldType::Int32, schema.fields()[2].field_type);
        assert_eq!(
            "month:date|market:int(16)|num_households:int(32)",
            render_csv_header(&schema)
        );
    }

    #[test]
    fn sized_and_decimal_roundtrip() {
        let schema = parse_csv_header("a:string(4)|b:decimal(8,2)|c:vstring").unwrap();
        assert_eq!(Some(4), schema.fields()[0].size);
        assert_eq!((Some(8), Some(2)), (schema.fields()[1].size, schema.fields()[1].scale));
        assert_eq!("a:string(4)|b:decimal(8,2)|c:vstring", render_csv_header(&schema));
    }

    #[test]
    fn row_roundtrip() {
        let schema = parse_csv_header("a:int(32)|b:string(4)").unwrap();
        let record = parse_row(&schema, "42|abcd", 1).unwrap();
        assert_eq!(vec![Some(FieldValue::Int32(42)), Some(FieldValue::String("abcd".to_string()))], record);
        assert_eq!("42|abcd", render_row(&record));
    }

    #[test]
    fn missing_trailing_and_empty_fields_are_null() {
        let schema = parse_csv_header("a:int(32)|b:string(4)").unwrap();
        let record = parse_row(&schema, "42", 1).unwrap();
        assert_eq!(vec![Some(FieldValue::Int32(42)), None], record);

        let record = parse_row(&schema, "|abcd", 1).unwrap();
        assert_eq!(vec![None, Some(FieldValue::String("abcd".to_string()))], record);
    }

    #[test]
    fn csv2records_stage() {
        let schema = parse_csv_header("a:int(32)").unwrap();
        let lines = vec!["1".to_string(), "2".to_string(), "".to_string()];
        let records: Vec<Record> = csv2records(schema, lines.into_iter()).collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(
            vec![vec![Some(FieldValue::Int32(1))], vec![Some(FieldValue::Int32(2))], vec![None]],
            records
        );
    }

    #[test]
    fn rejects_malformed_header_segment() {
        assert!(parse_csv_header("nocolon").is_err());
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(parse_csv_header("a:notatype").is_err());
    }

    #[test]
    fn rejects_name_with_invalid_characters() {
        assert!(parse_csv_header("a b:int(32)").is_err());
    }
}
