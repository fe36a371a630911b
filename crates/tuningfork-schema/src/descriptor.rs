//! # Schema Descriptor Model
//!
//! An immutable view of one compiled `.proto` file, built from the
//! `FileDescriptorProto` that `protoc -o` emits. Only what validation needs
//! is kept: messages with their fields in declaration order, structural
//! complexity counts, and the resolved values of enum-typed fields.

use std::collections::HashMap;
use std::fmt;

use prost::Message as _;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    FileDescriptorSet,
};

use crate::error::CompilationError;

/// Wire-level type of a message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group,
    Message,
    Bytes,
    UInt32,
    Enum,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
}

impl FieldType {
    fn from_proto(ty: Type) -> Self {
        match ty {
            Type::Double => Self::Double,
            Type::Float => Self::Float,
            Type::Int64 => Self::Int64,
            Type::Uint64 => Self::UInt64,
            Type::Int32 => Self::Int32,
            Type::Fixed64 => Self::Fixed64,
            Type::Fixed32 => Self::Fixed32,
            Type::Bool => Self::Bool,
            Type::String => Self::String,
            Type::Group => Self::Group,
            Type::Message => Self::Message,
            Type::Bytes => Self::Bytes,
            Type::Uint32 => Self::UInt32,
            Type::Enum => Self::Enum,
            Type::Sfixed32 => Self::SFixed32,
            Type::Sfixed64 => Self::SFixed64,
            Type::Sint32 => Self::SInt32,
            Type::Sint64 => Self::SInt64,
        }
    }

    /// Upper-case protobuf name, e.g. `"INT32"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Int64 => "INT64",
            Self::UInt64 => "UINT64",
            Self::Int32 => "INT32",
            Self::Fixed64 => "FIXED64",
            Self::Fixed32 => "FIXED32",
            Self::Bool => "BOOL",
            Self::String => "STRING",
            Self::Group => "GROUP",
            Self::Message => "MESSAGE",
            Self::Bytes => "BYTES",
            Self::UInt32 => "UINT32",
            Self::Enum => "ENUM",
            Self::SFixed32 => "SFIXED32",
            Self::SFixed64 => "SFIXED64",
            Self::SInt32 => "SINT32",
            Self::SInt64 => "SINT64",
        }
    }

    /// Keyword used in `.proto` source for scalar types.
    fn keyword(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Int32 => "int32",
            Self::Fixed64 => "fixed64",
            Self::Fixed32 => "fixed32",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Group => "group",
            Self::Message => "message",
            Self::Bytes => "bytes",
            Self::UInt32 => "uint32",
            Self::Enum => "enum",
            Self::SFixed32 => "sfixed32",
            Self::SFixed64 => "sfixed64",
            Self::SInt32 => "sint32",
            Self::SInt64 => "sint64",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cardinality of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Optional,
    Required,
    Repeated,
}

impl FieldLabel {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
            Self::Repeated => "repeated",
        }
    }
}

/// One value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueSchema {
    pub name: String,
    pub number: i32,
}

/// An enum type with its values in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    pub full_name: String,
    pub values: Vec<EnumValueSchema>,
}

impl EnumSchema {
    /// Short name (last path segment).
    pub fn name(&self) -> &str {
        self.full_name.rsplit('.').next().unwrap_or(&self.full_name)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&EnumValueSchema> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn value_by_number(&self, number: i32) -> Option<&EnumValueSchema> {
        self.values.iter().find(|v| v.number == number)
    }
}

/// A field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub number: u32,
    pub label: FieldLabel,
    pub field_type: FieldType,
    /// Fully-qualified type name for enum and message fields.
    pub type_name: Option<String>,
    /// Resolved enum type for enum fields declared in the same file.
    pub enum_type: Option<EnumSchema>,
    /// Explicit proto2 default, as written in the descriptor.
    pub default_value: Option<String>,
}

impl FieldSchema {
    pub fn is_repeated(&self) -> bool {
        self.label == FieldLabel::Repeated
    }
}

/// A message type and the structural facts validation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSchema {
    pub name: String,
    pub full_name: String,
    pub fields: Vec<FieldSchema>,
    /// Declared oneofs, excluding the synthetic ones of proto3 `optional`.
    pub oneof_count: usize,
    pub nested_type_count: usize,
    pub extension_count: usize,
}

impl MessageSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_number(&self, number: u32) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.number == number)
    }
}

impl fmt::Display for MessageSchema {
    /// Renders the message roughly as it would appear in `.proto` source.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "message {} {{", self.name)?;
        for field in &self.fields {
            let ty = match field.field_type {
                FieldType::Enum | FieldType::Message | FieldType::Group => field
                    .type_name
                    .as_deref()
                    .map(|n| n.trim_start_matches('.'))
                    .unwrap_or(field.field_type.keyword()),
                other => other.keyword(),
            };
            writeln!(
                f,
                "  {} {} {} = {};",
                field.label.keyword(),
                ty,
                field.name,
                field.number
            )?;
        }
        if self.oneof_count + self.nested_type_count + self.extension_count > 0 {
            writeln!(
                f,
                "  // {} oneofs, {} nested types, {} extensions",
                self.oneof_count, self.nested_type_count, self.extension_count
            )?;
        }
        write!(f, "}}")
    }
}

/// One compiled `.proto` file.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    file_name: String,
    package: String,
    messages: Vec<MessageSchema>,
}

impl SchemaDescriptor {
    /// Build the descriptor for `file_name` out of a compiled set.
    ///
    /// # Errors
    ///
    /// Returns [`CompilationError::DescriptorMissing`] when the set holds no
    /// file with that name.
    pub fn from_set(set: &FileDescriptorSet, file_name: &str) -> Result<Self, CompilationError> {
        set.file
            .iter()
            .find(|file| file.name() == file_name)
            .map(Self::from_file)
            .ok_or_else(|| CompilationError::DescriptorMissing(file_name.to_string()))
    }

    /// Decode a serialized `FileDescriptorSet` and pick `file_name` out of it.
    pub fn from_set_bytes(bytes: &[u8], file_name: &str) -> Result<Self, CompilationError> {
        let set = FileDescriptorSet::decode(bytes)?;
        Self::from_set(&set, file_name)
    }

    /// Build from a single file descriptor.
    pub fn from_file(file: &FileDescriptorProto) -> Self {
        let package = file.package().to_string();
        let scope = if package.is_empty() {
            String::new()
        } else {
            format!(".{package}")
        };

        let mut enums = HashMap::new();
        for enum_type in &file.enum_type {
            register_enum(&scope, enum_type, &mut enums);
        }
        for message in &file.message_type {
            register_nested_enums(&scope, message, &mut enums);
        }

        let messages = file
            .message_type
            .iter()
            .map(|message| build_message(&scope, message, &enums))
            .collect();

        Self {
            file_name: file.name().to_string(),
            package,
            messages,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// Top-level messages in declaration order.
    pub fn messages(&self) -> &[MessageSchema] {
        &self.messages
    }

    /// Find a top-level message by short or fully-qualified name.
    pub fn find_message(&self, name: &str) -> Option<&MessageSchema> {
        let name = name.trim_start_matches('.');
        self.messages
            .iter()
            .find(|m| m.name == name || m.full_name == name)
    }
}

fn qualify(scope: &str, name: &str) -> String {
    format!("{scope}.{name}")
}

fn register_enum(
    scope: &str,
    enum_type: &EnumDescriptorProto,
    enums: &mut HashMap<String, EnumSchema>,
) {
    let key = qualify(scope, enum_type.name());
    let schema = EnumSchema {
        full_name: key.trim_start_matches('.').to_string(),
        values: enum_type
            .value
            .iter()
            .map(|v| EnumValueSchema {
                name: v.name().to_string(),
                number: v.number(),
            })
            .collect(),
    };
    enums.insert(key, schema);
}

fn register_nested_enums(
    scope: &str,
    message: &DescriptorProto,
    enums: &mut HashMap<String, EnumSchema>,
) {
    let message_scope = qualify(scope, message.name());
    for enum_type in &message.enum_type {
        register_enum(&message_scope, enum_type, enums);
    }
    for nested in &message.nested_type {
        register_nested_enums(&message_scope, nested, enums);
    }
}

fn build_message(
    scope: &str,
    message: &DescriptorProto,
    enums: &HashMap<String, EnumSchema>,
) -> MessageSchema {
    let full_name = qualify(scope, message.name());
    // Every proto3 `optional` field owns one synthetic oneof.
    let synthetic_oneofs = message
        .field
        .iter()
        .filter(|f| f.proto3_optional() && f.oneof_index.is_some())
        .count();
    let oneof_count = message.oneof_decl.len().saturating_sub(synthetic_oneofs);

    MessageSchema {
        name: message.name().to_string(),
        full_name: full_name.trim_start_matches('.').to_string(),
        fields: message
            .field
            .iter()
            .map(|field| build_field(field, enums))
            .collect(),
        oneof_count,
        nested_type_count: message.nested_type.len(),
        extension_count: message.extension.len(),
    }
}

fn build_field(field: &FieldDescriptorProto, enums: &HashMap<String, EnumSchema>) -> FieldSchema {
    let field_type = FieldType::from_proto(field.r#type());
    let enum_type = if field_type == FieldType::Enum {
        field.type_name.as_ref().and_then(|n| enums.get(n)).cloned()
    } else {
        None
    };
    FieldSchema {
        name: field.name().to_string(),
        number: u32::try_from(field.number()).unwrap_or(0),
        label: match field.label() {
            Label::Optional => FieldLabel::Optional,
            Label::Required => FieldLabel::Required,
            Label::Repeated => FieldLabel::Repeated,
        },
        field_type,
        type_name: field.type_name.clone(),
        enum_type,
        default_value: field.default_value.clone(),
    }
}
