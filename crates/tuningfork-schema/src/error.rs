//! # Error Types
//!
//! Failures of the schema layer. Expected bad input (a malformed text
//! record, an undecodable binary) surfaces as [`TextFormatError`] or
//! [`RecordDecodeError`] so validators can turn it into a diagnostic.
//! Everything that goes wrong around the external compiler is a
//! [`CompilationError`].

use std::path::PathBuf;

use thiserror::Error;

/// Failure to compile a schema or to run an encode/decode through the
/// schema compiler.
#[derive(Error, Debug)]
pub enum CompilationError {
    /// The compiler ran but emitted no descriptor for the requested file.
    #[error("Descriptor for [{0}] does not exist.")]
    DescriptorMissing(String),

    /// The compiler process could not be started.
    #[error("failed to start proto compiler {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler process was terminated before it exited on its own.
    #[error("Process was interrupted")]
    Interrupted,

    /// The compiler process exited with a failure status.
    #[error("proto compiler exited with status {code}: {stderr}")]
    ProcessFailed {
        code: i32,
        /// Captured standard error, empty when it was redirected to a file.
        stderr: String,
    },

    /// The compiler's output is not a valid `FileDescriptorSet`.
    #[error("malformed compiler output: {0}")]
    MalformedOutput(#[from] prost::DecodeError),

    /// The requested message type is not part of the schema.
    #[error("message type [{0}] does not exist in the schema")]
    UnknownMessage(String),

    /// A text record could not be encoded.
    #[error("text format error: {0}")]
    TextFormat(#[from] TextFormatError),

    /// A binary record could not be decoded.
    #[error("binary record error: {0}")]
    Record(#[from] RecordDecodeError),

    /// Reading or writing one of the files involved failed.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompilationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Syntax or type error in a protobuf text-format record.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{line}:{column}: {message}")]
pub struct TextFormatError {
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    pub message: String,
}

/// Failure to decode a binary record against a message schema.
#[derive(Error, Debug)]
pub enum RecordDecodeError {
    /// The bytes are not valid protobuf wire format.
    #[error("invalid wire format: {0}")]
    Wire(#[from] prost::DecodeError),

    /// Group encoding is not supported for fidelity records.
    #[error("unsupported group encoding for field {0}")]
    Group(u32),

    /// A length-delimited field runs past the end of the buffer.
    #[error("field {0} is truncated")]
    Truncated(u32),
}
