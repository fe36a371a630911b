//! # tuningfork-schema — Protobuf Schema Handling
//!
//! Everything the validators need to look at protobuf data without
//! generated code for the developer's schema.
//!
//! ## Contents
//!
//! - [`SchemaCompiler`] — compiles `dev_tuningfork.proto` and converts
//!   records between text and binary form. [`ExternalProtoCompiler`] runs
//!   `protoc`; [`CannedCompiler`] works from an in-memory descriptor set.
//! - [`SchemaDescriptor`] — messages, fields and enums of a compiled file.
//! - [`DynamicRecord`] — a `FidelityParams` instance read through the
//!   runtime schema.
//! - [`Settings`] — the fixed `com.google.tuningfork.Settings` message.
//! - [`text_format`] — protobuf text-format parser and printer.
//!
//! ## Crate Policy
//!
//! - No dependency on `tuningfork-core`. No diagnostics are recorded here:
//!   bad input comes back as a typed error and the validation crate decides
//!   which error type it maps to.
//! - No `.unwrap()` outside tests.

pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod record;
pub mod settings;
pub mod text_format;

pub use compiler::{CannedCompiler, ExternalProtoCompiler, SchemaCompiler};
pub use descriptor::{
    EnumSchema, EnumValueSchema, FieldLabel, FieldSchema, FieldType, MessageSchema,
    SchemaDescriptor,
};
pub use error::{CompilationError, RecordDecodeError, TextFormatError};
pub use record::{DynamicRecord, FieldValue};
pub use settings::{AggregationStrategy, Histogram, Settings, Submission};
