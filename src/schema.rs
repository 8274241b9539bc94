//! The UTF-16 LE XML `<MetaInfo>` schema codec (`spec.md` §4.6).

use crate::error::{Result, SchemaError};
use crate::field::{Field, FieldType};
use crate::record::RecordInfo;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use std::io::Cursor;

/// Renders `schema` as the UTF-16 LE XML document `spec.md` §4.6 describes, including the
/// trailing `\n\0` code-unit terminator.
///
/// # Examples
///
/// ```
/// use yxdb::field::{Field, FieldType};
/// use yxdb::record::RecordInfo;
/// use yxdb::schema::render_schema;
/// let schema = RecordInfo::new(vec![Field::new("a", FieldType::Int32, None, None).unwrap()]).unwrap();
/// let bytes = render_schema(&schema);
/// assert_eq!(0, bytes.len() % 2);
/// ```
pub fn render_schema(schema: &RecordInfo) -> Vec<u8> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .create_element("MetaInfo")
        .write_inner_content(|writer| {
            writer
                .create_element("RecordInfo")
                .write_inner_content(|writer| {
                    for field in schema.fields() {
                        let mut start = BytesStart::new("Field");
                        start.push_attribute(("name", field.name.as_str()));
                        start.push_attribute(("type", field.field_type.name()));
                        let size_text;
                        if let Some(size) = field.size {
                            size_text = size.to_string();
                            start.push_attribute(("size", size_text.as_str()));
                        }
                        let scale_text;
                        if let Some(scale) = field.scale {
                            scale_text = scale.to_string();
                            start.push_attribute(("scale", scale_text.as_str()));
                        }
                        writer.write_event(Event::Empty(start))?;
                    }
                    Ok(())
                })?;
            Ok(())
        })
        .expect("writing to an in-memory buffer never fails");

    let xml = String::from_utf8(writer.into_inner().into_inner())
        .expect("quick-xml always emits valid UTF-8");
    let mut text = xml;
    text.push('\n');

    let mut bytes = Vec::with_capacity(text.len() * 2 + 2);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes
}

/// Parses the UTF-16 LE XML document (including its `\n\0` terminator) into a [RecordInfo].
///
/// # Errors
///
/// Returns [SchemaError::RecordInfoCount] unless exactly one `<RecordInfo>` is present, and
/// [SchemaError::UnknownFieldType] / [SchemaError::MissingAttribute] for malformed fields.
pub fn parse_schema(bytes: &[u8]) -> Result<RecordInfo> {
    if bytes.len() % 2 != 0 {
        return Err(SchemaError::Malformed {
            offset: bytes.len(),
            message: "schema byte length is not a multiple of 2".to_string(),
        }
        .into());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let text = String::from_utf16(&units).map_err(|e| SchemaError::Malformed {
        offset: 0,
        message: e.to_string(),
    })?;
    let text = text.trim_end_matches(['\n', '\0']);

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut fields = Vec::new();
    let mut record_info_count = 0usize;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| SchemaError::Malformed {
            offset: reader.buffer_position() as usize,
            message: e.to_string(),
        })? {
            Event::Eof => break,
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"RecordInfo" => {
                record_info_count += 1;
            }
            Event::Empty(ref e) if e.name().as_ref() == b"Field" => {
                fields.push(parse_field(e)?);
            }
            Event::Start(ref e) if e.name().as_ref() == b"Field" => {
                fields.push(parse_field(e)?);
            }
            _ => {}
        }
        buf.clear();
    }

    if record_info_count != 1 {
        return Err(SchemaError::RecordInfoCount {
            found: record_info_count,
        }
        .into());
    }

    RecordInfo::new(fields)
}

fn parse_field(start: &BytesStart) -> Result<Field> {
    let mut name = None;
    let mut field_type = None;
    let mut size = None;
    let mut scale = None;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SchemaError::Malformed {
            offset: 0,
            message: e.to_string(),
        })?;
        let key = attr.key.as_ref();
        let value = attr
            .unescape_value()
            .map_err(|e| SchemaError::Malformed {
                offset: 0,
                message: e.to_string(),
            })?
            .into_owned();
        match key {
            b"name" => name = Some(value),
            b"type" => field_type = Some(value),
            b"size" => size = value.parse::<u32>().ok(),
            b"scale" => scale = value.parse::<u32>().ok(),
            _ => {}
        }
    }

    let name = name.ok_or_else(|| SchemaError::MissingAttribute {
        field: "<unnamed>".to_string(),
        attribute: "name",
    })?;
    let type_name = field_type.ok_or_else(|| SchemaError::MissingAttribute {
        field: name.clone(),
        attribute: "type",
    })?;
    let field_type = FieldType::from_name(&type_name.to_lowercase()).ok_or_else(|| {
        SchemaError::UnknownFieldType {
            field: name.clone(),
            found: type_name.clone(),
        }
    })?;

    Field::new(name, field_type, size, scale)
}
