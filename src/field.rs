//! Typed field descriptors and the field-value codec.
//!
//! A [Field] describes one column of a [RecordInfo](crate::record::RecordInfo): its name,
//! [FieldType], and (for sized/scaled types) its width. A [FieldValue] is the typed, nullable
//! datum a [Record](crate::record::Record) holds in that column's position.

use crate::error::{RecordError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::io::{Read, Write};

/// The closed set of field types a [Field] may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FieldType {
    Bool,
    Byte,
    Int16,
    Int32,
    Int64,
    FixedDecimal,
    Float,
    Double,
    String,
    WString,
    VString,
    VWString,
    Date,
    Time,
    DateTime,
    Blob,
    SpatialObject,
    Unknown,
}

impl FieldType {
    /// The lower-case spelling used by both the XML schema and the textual grammar.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Byte => "byte",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::FixedDecimal => "fixeddecimal",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::WString => "wstring",
            FieldType::VString => "vstring",
            FieldType::VWString => "vwstring",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::Blob => "blob",
            FieldType::SpatialObject => "spatialobj",
            FieldType::Unknown => "unknown",
        }
    }

    /// Parses the lower-case spelling used by the XML schema.
    ///
    /// Returns `None` for unrecognized spellings; callers attach the field name for context.
    pub fn from_name(name: &str) -> Option<FieldType> {
        match name {
            "bool" => Some(FieldType::Bool),
            "byte" => Some(FieldType::Byte),
            "int16" => Some(FieldType::Int16),
            "int32" => Some(FieldType::Int32),
            "int64" => Some(FieldType::Int64),
            "fixeddecimal" => Some(FieldType::FixedDecimal),
            "float" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "string" => Some(FieldType::String),
            "wstring" => Some(FieldType::WString),
            "vstring" => Some(FieldType::VString),
            "vwstring" => Some(FieldType::VWString),
            "date" => Some(FieldType::Date),
            "time" => Some(FieldType::Time),
            "datetime" => Some(FieldType::DateTime),
            "blob" => Some(FieldType::Blob),
            "spatialobj" => Some(FieldType::SpatialObject),
            "unknown" => Some(FieldType::Unknown),
            _ => None,
        }
    }

    /// Whether this type requires a `size` attribute on its [Field].
    pub fn requires_size(self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::WString
                | FieldType::VString
                | FieldType::VWString
                | FieldType::Blob
                | FieldType::SpatialObject
                | FieldType::FixedDecimal
        )
    }

    /// Whether this type requires (and only this type requires) a `scale` attribute.
    pub fn requires_scale(self) -> bool {
        matches!(self, FieldType::FixedDecimal)
    }

    /// Whether this type's on-disk payload is variable-length (length-prefixed).
    pub fn is_variable_length(self) -> bool {
        matches!(
            self,
            FieldType::VString | FieldType::VWString | FieldType::Blob | FieldType::SpatialObject
        )
    }
}

/// One column of a schema: a name, a type, and (for sized/scaled types) a width.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    /// The column name. Must match `[A-Za-z0-9_]+`.
    pub name: String,
    /// The column's type.
    pub field_type: FieldType,
    /// Required for `String`, `WString`, `VString`, `VWString`, `Blob`, `SpatialObject`,
    /// `FixedDecimal`; `None` otherwise.
    pub size: Option<u32>,
    /// Required for, and only for, `FixedDecimal`; `None` otherwise.
    pub scale: Option<u32>,
}

impl Field {
    /// Creates a new field, validating the name, size, and scale invariants from `spec.md` §3.
    ///
    /// # Examples
    ///
    /// ```
    /// use yxdb::field::{Field, FieldType};
    /// let field = Field::new("a", FieldType::Int32, None, None).unwrap();
    /// assert_eq!("a", field.name);
    /// ```
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        size: Option<u32>,
        scale: Option<u32>,
    ) -> Result<Field> {
        let name = name.into();
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(RecordError::FieldDecode {
                field: name,
                index: 0,
                offset: 0,
                message: "name must match [A-Za-z0-9_]+".to_string(),
            }
            .into());
        }
        if field_type.requires_size() && size.is_none() {
            return Err(RecordError::FieldDecode {
                field: name,
                index: 0,
                offset: 0,
                message: format!("{} requires a size", field_type.name()),
            }
            .into());
        }
        if field_type.requires_scale() && scale.is_none() {
            return Err(RecordError::FieldDecode {
                field: name,
                index: 0,
                offset: 0,
                message: "fixeddecimal requires a scale".to_string(),
            }
            .into());
        }
        if !field_type.requires_scale() && scale.is_some() {
            return Err(RecordError::FieldDecode {
                field: name,
                index: 0,
                offset: 0,
                message: format!("{} must not declare a scale", field_type.name()),
            }
            .into());
        }
        Ok(Field {
            name,
            field_type,
            size,
            scale,
        })
    }

    /// The fixed on-disk width of this field's *value* bytes (excluding the null flag byte, and
    /// excluding the length prefix for variable-length types, whose payload width varies).
    pub fn fixed_width(&self) -> usize {
        match self.field_type {
            FieldType::Bool => 1,
            FieldType::Byte => 1,
            FieldType::Int16 => 2,
            FieldType::Int32 => 4,
            FieldType::Int64 => 8,
            FieldType::Float => 4,
            FieldType::Double => 8,
            FieldType::FixedDecimal => self.size.unwrap_or(0) as usize,
            FieldType::String => self.size.unwrap_or(0) as usize,
            FieldType::WString => self.size.unwrap_or(0) as usize * 2,
            FieldType::Date => 10,
            FieldType::Time => 8,
            FieldType::DateTime => 19,
            FieldType::VString | FieldType::VWString | FieldType::Blob | FieldType::SpatialObject => 0,
            FieldType::Unknown => 0,
        }
    }

    /// Whether this field carries a trailing 1-byte null flag (see `DESIGN.md` O1).
    ///
    /// `Bool` packs its null state into its own single byte instead.
    fn has_null_flag(&self) -> bool {
        !matches!(self.field_type, FieldType::Bool)
    }
}

/// A typed, nullable datum matching a [Field]'s declared [FieldType].
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum FieldValue {
    Bool(bool),
    Byte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    FixedDecimal(String),
    Float(f32),
    Double(f64),
    String(String),
    WString(String),
    VString(String),
    VWString(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Blob(Vec<u8>),
    SpatialObject(Vec<u8>),
    Unknown,
}

fn decode_error(field: &Field, offset: u64, message: impl Into<String>) -> crate::error::Error {
    RecordError::FieldDecode {
        field: field.name.clone(),
        index: 0,
        offset,
        message: message.into(),
    }
    .into()
}

/// Encodes one field value (or `None` for null) according to `field`'s type and width.
///
/// See `DESIGN.md`'s O1 resolution for the null-flag layout.
pub fn encode_field<W: Write>(
    write: &mut W,
    field: &Field,
    value: Option<&FieldValue>,
) -> Result<()> {
    if field.field_type == FieldType::Bool {
        let byte = match value {
            Some(FieldValue::Bool(true)) => 1u8,
            Some(FieldValue::Bool(false)) => 0u8,
            None => 2u8,
            Some(_) => return Err(decode_error(field, 0, "expected a bool value")),
        };
        write.write_u8(byte)?;
        return Ok(());
    }

    if field.field_type.is_variable_length() {
        match value {
            None => {
                write.write_u32::<LittleEndian>(0)?;
                write.write_u8(1)?;
            }
            Some(v) => {
                let bytes = encode_variable_payload(field, v)?;
                write.write_u32::<LittleEndian>(bytes.len() as u32)?;
                write.write_all(&bytes)?;
                write.write_u8(0)?;
            }
        }
        return Ok(());
    }

    match value {
        None => {
            write.write_all(&vec![0u8; field.fixed_width()])?;
        }
        Some(v) => {
            let bytes = encode_fixed_payload(field, v)?;
            if bytes.len() != field.fixed_width() {
                return Err(decode_error(
                    field,
                    0,
                    format!(
                        "encoded value is {} bytes, expected {}",
                        bytes.len(),
                        field.fixed_width()
                    ),
                ));
            }
            write.write_all(&bytes)?;
        }
    }
    if field.has_null_flag() {
        write.write_u8(0)?;
    }
    Ok(())
}

fn encode_variable_payload(field: &Field, value: &FieldValue) -> Result<Vec<u8>> {
    match (field.field_type, value) {
        (FieldType::VString, FieldValue::VString(s)) => Ok(s.as_bytes().to_vec()),
        (FieldType::VWString, FieldValue::VWString(s)) => {
            let units: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            Ok(units)
        }
        (FieldType::Blob, FieldValue::Blob(b)) => Ok(b.clone()),
        (FieldType::SpatialObject, FieldValue::SpatialObject(b)) => Ok(b.clone()),
        _ => Err(decode_error(
            field,
            0,
            format!("value does not match field type {}", field.field_type.name()),
        )),
    }
}

fn encode_fixed_payload(field: &Field, value: &FieldValue) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    match (field.field_type, value) {
        (FieldType::Byte, FieldValue::Byte(n)) => out.write_i8(*n)?,
        (FieldType::Int16, FieldValue::Int16(n)) => out.write_i16::<LittleEndian>(*n)?,
        (FieldType::Int32, FieldValue::Int32(n)) => out.write_i32::<LittleEndian>(*n)?,
        (FieldType::Int64, FieldValue::Int64(n)) => out.write_i64::<LittleEndian>(*n)?,
        (FieldType::Float, FieldValue::Float(n)) => out.write_f32::<LittleEndian>(*n)?,
        (FieldType::Double, FieldValue::Double(n)) => out.write_f64::<LittleEndian>(*n)?,
        (FieldType::FixedDecimal, FieldValue::FixedDecimal(s)) => {
            let width = field.size.unwrap_or(0) as usize;
            if s.len() > width {
                return Err(decode_error(
                    field,
                    0,
                    format!("decimal '{}' exceeds declared width {}", s, width),
                ));
            }
            let padded = format!("{:>width$}", s, width = width);
            out.extend_from_slice(padded.as_bytes());
        }
        (FieldType::String, FieldValue::String(s)) => {
            let width = field.size.unwrap_or(0) as usize;
            let mut bytes = s.as_bytes().to_vec();
            if bytes.len() > width {
                return Err(decode_error(
                    field,
                    0,
                    format!("string exceeds declared width {}", width),
                ));
            }
            bytes.resize(width, 0);
            out.extend_from_slice(&bytes);
        }
        (FieldType::WString, FieldValue::WString(s)) => {
            let width = field.size.unwrap_or(0) as usize;
            let mut units: Vec<u16> = s.encode_utf16().collect();
            if units.len() > width {
                return Err(decode_error(
                    field,
                    0,
                    format!("wstring exceeds declared width {}", width),
                ));
            }
            units.resize(width, 0);
            for unit in units {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
        (FieldType::Date, FieldValue::Date(d)) => {
            out.extend_from_slice(d.format("%Y-%m-%d").to_string().as_bytes())
        }
        (FieldType::Time, FieldValue::Time(t)) => {
            out.extend_from_slice(t.format("%H:%M:%S").to_string().as_bytes())
        }
        (FieldType::DateTime, FieldValue::DateTime(dt)) => {
            out.extend_from_slice(dt.format("%Y-%m-%d %H:%M:%S").to_string().as_bytes())
        }
        _ => {
            return Err(decode_error(
                field,
                0,
                format!("value does not match field type {}", field.field_type.name()),
            ))
        }
    }
    Ok(out)
}

/// Decodes one field value (or `None` for null) from `read`, according to `field`'s type and
/// width. `offset` is the current absolute byte offset, used for error messages only.
pub fn decode_field<R: Read>(
    read: &mut R,
    field: &Field,
    offset: u64,
) -> Result<Option<FieldValue>> {
    if field.field_type == FieldType::Bool {
        let byte = read.read_u8()?;
        return match byte {
            0 => Ok(Some(FieldValue::Bool(false))),
            1 => Ok(Some(FieldValue::Bool(true))),
            2 => Ok(None),
            other => Err(decode_error(field, offset, format!("invalid bool byte {}", other))),
        };
    }

    if field.field_type.is_variable_length() {
        let len = read.read_u32::<LittleEndian>()? as usize;
        let mut payload = vec![0u8; len];
        read.read_exact(&mut payload)?;
        let null_flag = read.read_u8()?;
        if null_flag != 0 {
            return Ok(None);
        }
        return Ok(Some(decode_variable_payload(field, offset, &payload)?));
    }

    let width = field.fixed_width();
    let mut payload = vec![0u8; width];
    read.read_exact(&mut payload)?;
    let is_null = if field.has_null_flag() {
        read.read_u8()? != 0
    } else {
        false
    };
    if is_null {
        return Ok(None);
    }
    Ok(Some(decode_fixed_payload(field, offset, &payload)?))
}

fn decode_variable_payload(field: &Field, offset: u64, payload: &[u8]) -> Result<FieldValue> {
    match field.field_type {
        FieldType::VString => String::from_utf8(payload.to_vec())
            .map(FieldValue::VString)
            .map_err(|e| decode_error(field, offset, e.to_string())),
        FieldType::VWString => decode_utf16(field, offset, payload).map(FieldValue::VWString),
        FieldType::Blob => Ok(FieldValue::Blob(payload.to_vec())),
        FieldType::SpatialObject => Ok(FieldValue::SpatialObject(payload.to_vec())),
        _ => unreachable!("is_variable_length() is exhaustive over these four types"),
    }
}

fn decode_utf16(field: &Field, offset: u64, bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(decode_error(field, offset, "odd number of bytes for UTF-16 payload"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| decode_error(field, offset, e.to_string()))
}

fn decode_fixed_payload(field: &Field, offset: u64, payload: &[u8]) -> Result<FieldValue> {
    let mut cursor = payload;
    Ok(match field.field_type {
        FieldType::Byte => FieldValue::Byte(cursor.read_i8()?),
        FieldType::Int16 => FieldValue::Int16(cursor.read_i16::<LittleEndian>()?),
        FieldType::Int32 => FieldValue::Int32(cursor.read_i32::<LittleEndian>()?),
        FieldType::Int64 => FieldValue::Int64(cursor.read_i64::<LittleEndian>()?),
        FieldType::Float => FieldValue::Float(cursor.read_f32::<LittleEndian>()?),
        FieldType::Double => FieldValue::Double(cursor.read_f64::<LittleEndian>()?),
        FieldType::FixedDecimal => {
            let text = std::str::from_utf8(payload)
                .map_err(|e| decode_error(field, offset, e.to_string()))?;
            FieldValue::FixedDecimal(text.trim().to_string())
        }
        FieldType::String => {
            let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
            let text = std::str::from_utf8(&payload[..end])
                .map_err(|e| decode_error(field, offset, e.to_string()))?;
            FieldValue::String(text.to_string())
        }
        FieldType::WString => {
            let units: Vec<u16> = payload
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&u| u != 0)
                .collect();
            let text = String::from_utf16(&units).map_err(|e| decode_error(field, offset, e.to_string()))?;
            FieldValue::WString(text)
        }
        FieldType::Date => {
            let text = std::str::from_utf8(payload).map_err(|e| decode_error(field, offset, e.to_string()))?;
            let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|e| decode_error(field, offset, e.to_string()))?;
            FieldValue::Date(date)
        }
        FieldType::Time => {
            let text = std::str::from_utf8(payload).map_err(|e| decode_error(field, offset, e.to_string()))?;
            let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
                .map_err(|e| decode_error(field, offset, e.to_string()))?;
            FieldValue::Time(time)
        }
        FieldType::DateTime => {
            let text = std::str::from_utf8(payload).map_err(|e| decode_error(field, offset, e.to_string()))?;
            let dt = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .map_err(|e| decode_error(field, offset, e.to_string()))?;
            FieldValue::DateTime(dt)
        }
        FieldType::Unknown => FieldValue::Unknown,
        FieldType::Bool
        | FieldType::VString
        | FieldType::VWString
        | FieldType::Blob
        | FieldType::SpatialObject => {
            unreachable!("handled by the bool/variable-length branches above")
        }
    })
}
