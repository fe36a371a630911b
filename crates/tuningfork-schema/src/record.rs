//! # Dynamic Records
//!
//! A message instance interpreted through a runtime [`MessageSchema`], used
//! for the developer-defined `FidelityParams` whose shape is only known
//! after the schema is compiled.
//!
//! Only singular `enum`, `int32` and `float` fields carry values. Those are
//! the only types a valid `FidelityParams` may hold; anything else on the
//! wire is skipped like an unknown field, and rejected in text input.

use std::collections::BTreeMap;
use std::fmt;

use prost::bytes::{Buf, BufMut};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, WireType};

use crate::descriptor::{FieldSchema, FieldType, MessageSchema};
use crate::error::{RecordDecodeError, TextFormatError};
use crate::text_format::{self, TextWriter};

/// Value of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Enum value number.
    Enum(i32),
    Int32(i32),
    Float(f32),
}

impl FieldValue {
    /// Numeric reading used for ordering comparisons.
    pub fn as_f32(&self) -> f32 {
        match self {
            Self::Enum(n) | Self::Int32(n) => *n as f32,
            Self::Float(v) => *v,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(n) | Self::Int32(n) => write!(f, "{n}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

fn is_numeric(field: &FieldSchema) -> bool {
    !field.is_repeated()
        && matches!(
            field.field_type,
            FieldType::Enum | FieldType::Int32 | FieldType::Float
        )
}

/// Default reading of an unset numeric field: the explicit proto2 default,
/// else the first declared enum value, else zero.
pub fn default_value(field: &FieldSchema) -> Option<FieldValue> {
    if !is_numeric(field) {
        return None;
    }
    let explicit = field.default_value.as_deref();
    match field.field_type {
        FieldType::Enum => {
            let enum_type = field.enum_type.as_ref();
            let number = explicit
                .and_then(|name| enum_type.and_then(|e| e.value_by_name(name)))
                .or_else(|| enum_type.and_then(|e| e.values.first()))
                .map_or(0, |v| v.number);
            Some(FieldValue::Enum(number))
        }
        FieldType::Int32 => Some(FieldValue::Int32(
            explicit.and_then(|s| s.parse().ok()).unwrap_or(0),
        )),
        FieldType::Float => Some(FieldValue::Float(
            explicit.and_then(parse_default_float).unwrap_or(0.0),
        )),
        _ => None,
    }
}

fn parse_default_float(s: &str) -> Option<f32> {
    match s {
        "inf" => Some(f32::INFINITY),
        "-inf" => Some(f32::NEG_INFINITY),
        "nan" => Some(f32::NAN),
        other => other.parse().ok(),
    }
}

/// A record of one message type.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    schema: MessageSchema,
    /// Explicitly set values, keyed by field number.
    values: BTreeMap<u32, FieldValue>,
}

impl DynamicRecord {
    /// A record with every field unset.
    pub fn new(schema: &MessageSchema) -> Self {
        Self {
            schema: schema.clone(),
            values: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &MessageSchema {
        &self.schema
    }

    /// Set a numeric field by name. Returns `false` when the message has no
    /// numeric field of that name.
    pub fn set(&mut self, name: &str, value: FieldValue) -> bool {
        match self.schema.field(name) {
            Some(field) if is_numeric(field) => {
                self.values.insert(field.number, value);
                true
            }
            _ => false,
        }
    }

    /// Explicitly set value of a field.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        let field = self.schema.field(name)?;
        self.values.get(&field.number).copied()
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Value of `field`, falling back to its default when unset.
    ///
    /// `None` for fields without a numeric reading.
    pub fn value(&self, field: &FieldSchema) -> Option<FieldValue> {
        if !is_numeric(field) {
            return None;
        }
        self.values
            .get(&field.number)
            .copied()
            .or_else(|| default_value(field))
    }

    /// Decode protobuf wire bytes.
    ///
    /// Unknown fields and fields whose wire type does not match the schema
    /// are skipped. For repeated occurrences the last one wins.
    pub fn decode(schema: &MessageSchema, bytes: &[u8]) -> Result<Self, RecordDecodeError> {
        let mut record = Self::new(schema);
        let mut buf = bytes;
        while buf.has_remaining() {
            let (tag, wire_type) = decode_key(&mut buf)?;
            let field = schema.field_by_number(tag).filter(|f| is_numeric(f));
            match (field.map(|f| f.field_type), wire_type) {
                (Some(FieldType::Enum), WireType::Varint) => {
                    let raw = decode_varint(&mut buf)?;
                    record.values.insert(tag, FieldValue::Enum(raw as i32));
                }
                (Some(FieldType::Int32), WireType::Varint) => {
                    let raw = decode_varint(&mut buf)?;
                    record.values.insert(tag, FieldValue::Int32(raw as i32));
                }
                (Some(FieldType::Float), WireType::ThirtyTwoBit) => {
                    if buf.remaining() < 4 {
                        return Err(RecordDecodeError::Truncated(tag));
                    }
                    record.values.insert(tag, FieldValue::Float(buf.get_f32_le()));
                }
                _ => skip_field(tag, wire_type, &mut buf)?,
            }
        }
        Ok(record)
    }

    /// Encode to protobuf wire bytes, fields in declaration order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for field in &self.schema.fields {
            let Some(value) = self.values.get(&field.number) else {
                continue;
            };
            match value {
                FieldValue::Enum(n) | FieldValue::Int32(n) => {
                    encode_key(field.number, WireType::Varint, &mut out);
                    encode_varint(i64::from(*n) as u64, &mut out);
                }
                FieldValue::Float(v) => {
                    encode_key(field.number, WireType::ThirtyTwoBit, &mut out);
                    out.put_f32_le(*v);
                }
            }
        }
        out
    }

    /// Parse a text-format record.
    pub fn from_text(schema: &MessageSchema, text: &str) -> Result<Self, TextFormatError> {
        let message = text_format::parse(text)?;
        let mut record = Self::new(schema);
        for entry in &message.fields {
            let field = schema.field(&entry.name).ok_or_else(|| {
                entry.error(format!(
                    "message \"{}\" has no field named \"{}\"",
                    schema.full_name, entry.name
                ))
            })?;
            if !is_numeric(field) {
                return Err(entry.error(format!(
                    "field \"{}\" of type {} is not supported",
                    field.name, field.field_type
                )));
            }
            let value = match field.field_type {
                FieldType::Enum => match &field.enum_type {
                    Some(enum_type) => FieldValue::Enum(entry.as_enum(enum_type)?),
                    None => FieldValue::Enum(entry.as_i32()?),
                },
                FieldType::Int32 => FieldValue::Int32(entry.as_i32()?),
                _ => FieldValue::Float(entry.as_f32()?),
            };
            record.values.insert(field.number, value);
        }
        Ok(record)
    }

    /// Render set fields in text format, declaration order.
    pub fn to_text(&self) -> String {
        let mut writer = TextWriter::new();
        for field in &self.schema.fields {
            let Some(value) = self.values.get(&field.number) else {
                continue;
            };
            match value {
                FieldValue::Enum(n) => {
                    match field
                        .enum_type
                        .as_ref()
                        .and_then(|e| e.value_by_number(*n))
                    {
                        Some(v) => writer.scalar(&field.name, &v.name),
                        None => writer.scalar(&field.name, n),
                    }
                }
                other => writer.scalar(&field.name, other),
            }
        }
        writer.finish()
    }
}

fn skip_field(tag: u32, wire_type: WireType, buf: &mut &[u8]) -> Result<(), RecordDecodeError> {
    let len = match wire_type {
        WireType::Varint => {
            decode_varint(buf)?;
            return Ok(());
        }
        WireType::SixtyFourBit => 8,
        WireType::ThirtyTwoBit => 4,
        WireType::LengthDelimited => {
            usize::try_from(decode_varint(buf)?).map_err(|_| RecordDecodeError::Truncated(tag))?
        }
        WireType::StartGroup | WireType::EndGroup => return Err(RecordDecodeError::Group(tag)),
    };
    if buf.remaining() < len {
        return Err(RecordDecodeError::Truncated(tag));
    }
    buf.advance(len);
    Ok(())
}
