//! # Schema Compiler
//!
//! The [`SchemaCompiler`] trait turns a `.proto` file into a
//! [`SchemaDescriptor`] and converts records between text and binary form
//! with respect to that schema.
//!
//! [`ExternalProtoCompiler`] shells out to `protoc`. Each call is a single
//! synchronous attempt with no timeout. [`CannedCompiler`] answers from an
//! in-memory `FileDescriptorSet` and does the conversions in process.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use prost::Message as _;
use prost_types::FileDescriptorSet;

use crate::descriptor::{MessageSchema, SchemaDescriptor};
use crate::error::CompilationError;
use crate::record::DynamicRecord;

/// Compiles schemas and converts records through them.
pub trait SchemaCompiler {
    /// Compile `schema_file` and return the descriptor of that file.
    ///
    /// When `out_file` is given, the serialized `FileDescriptorSet` is
    /// written there as well.
    fn compile(
        &self,
        schema_file: &Path,
        out_file: Option<&Path>,
    ) -> Result<SchemaDescriptor, CompilationError>;

    /// Encode the text record in `text_file` as `message` and write the
    /// binary to `binary_path`. Diagnostics go to `error_file` when given.
    fn encode_from_text_file(
        &self,
        message: &str,
        proto_file: &Path,
        text_file: &Path,
        binary_path: &Path,
        error_file: Option<&Path>,
    ) -> Result<PathBuf, CompilationError>;

    /// Decode the binary record in `binary_file` as `message` and write the
    /// text form to `text_path`.
    fn decode_to_text_file(
        &self,
        message: &str,
        proto_file: &Path,
        text_path: &Path,
        binary_file: &Path,
        error_file: Option<&Path>,
    ) -> Result<PathBuf, CompilationError>;
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn absolute(path: &Path) -> Result<PathBuf, CompilationError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| CompilationError::io(path, e))?;
    Ok(cwd.join(path))
}

/// `protoc` backed compiler.
#[derive(Debug, Clone)]
pub struct ExternalProtoCompiler {
    program: PathBuf,
}

impl ExternalProtoCompiler {
    /// `program` is the path of the `protoc` executable, or a bare name
    /// resolved through `PATH`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// `-I <name>=<abs path> <abs path>`
    fn schema_args(command: &mut Command, proto_file: &Path) -> Result<(), CompilationError> {
        let proto_file = absolute(proto_file)?;
        let mut include = OsString::from(file_name(&proto_file));
        include.push("=");
        include.push(proto_file.as_os_str());
        command.arg("-I").arg(include).arg(&proto_file);
        Ok(())
    }

    fn run(&self, mut command: Command) -> Result<Output, CompilationError> {
        tracing::debug!(?command, "running proto compiler");
        let output = command.output().map_err(|source| CompilationError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        // No exit code means the process was killed by a signal.
        if output.status.code().is_none() {
            return Err(CompilationError::Interrupted);
        }
        Ok(output)
    }

    fn check_status(output: &Output) -> Result<(), CompilationError> {
        if output.status.success() {
            return Ok(());
        }
        Err(CompilationError::ProcessFailed {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn redirected(
        &self,
        flag: String,
        proto_file: &Path,
        input: &Path,
        output: &Path,
        error_file: Option<&Path>,
    ) -> Result<(), CompilationError> {
        let stdin = File::open(input).map_err(|e| CompilationError::io(input, e))?;
        let stdout = File::create(output).map_err(|e| CompilationError::io(output, e))?;
        let mut command = Command::new(&self.program);
        command.arg(flag);
        Self::schema_args(&mut command, proto_file)?;
        command.stdin(Stdio::from(stdin)).stdout(Stdio::from(stdout));
        if let Some(error_file) = error_file {
            let stderr =
                File::create(error_file).map_err(|e| CompilationError::io(error_file, e))?;
            command.stderr(Stdio::from(stderr));
        }
        let result = self.run(command)?;
        Self::check_status(&result)
    }
}

impl SchemaCompiler for ExternalProtoCompiler {
    /// A failing compiler is [`CompilationError::ProcessFailed`] with its
    /// stderr. A successful run whose set lacks the schema file is
    /// [`CompilationError::DescriptorMissing`].
    fn compile(
        &self,
        schema_file: &Path,
        out_file: Option<&Path>,
    ) -> Result<SchemaDescriptor, CompilationError> {
        let schema_file = absolute(schema_file)?;
        let temp = tempfile::Builder::new()
            .prefix("temp")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| CompilationError::io(std::env::temp_dir(), e))?;

        let mut command = Command::new(&self.program);
        command.arg("-o").arg(temp.path());
        Self::schema_args(&mut command, &schema_file)?;
        let output = self.run(command)?;
        if let Err(e) = Self::check_status(&output) {
            tracing::error!(schema = %schema_file.display(), "{e}");
            return Err(e);
        }

        let bytes = fs::read(temp.path()).map_err(|e| CompilationError::io(temp.path(), e))?;
        let set = FileDescriptorSet::decode(bytes.as_slice())?;
        if let Some(out_file) = out_file {
            fs::write(out_file, set.encode_to_vec())
                .map_err(|e| CompilationError::io(out_file, e))?;
        }
        SchemaDescriptor::from_set(&set, &file_name(&schema_file))
    }

    fn encode_from_text_file(
        &self,
        message: &str,
        proto_file: &Path,
        text_file: &Path,
        binary_path: &Path,
        error_file: Option<&Path>,
    ) -> Result<PathBuf, CompilationError> {
        self.redirected(
            format!("--encode={message}"),
            proto_file,
            text_file,
            binary_path,
            error_file,
        )?;
        Ok(binary_path.to_path_buf())
    }

    fn decode_to_text_file(
        &self,
        message: &str,
        proto_file: &Path,
        text_path: &Path,
        binary_file: &Path,
        error_file: Option<&Path>,
    ) -> Result<PathBuf, CompilationError> {
        self.redirected(
            format!("--decode={message}"),
            proto_file,
            binary_file,
            text_path,
            error_file,
        )?;
        Ok(text_path.to_path_buf())
    }
}

/// In-process compiler over a prepared descriptor set.
///
/// `compile` resolves the schema file by name in the set, but only when the
/// file exists on disk, like a real compiler would require.
#[derive(Debug, Clone, Default)]
pub struct CannedCompiler {
    set: FileDescriptorSet,
}

impl CannedCompiler {
    pub fn new(set: FileDescriptorSet) -> Self {
        Self { set }
    }

    fn message_schema(
        &self,
        message: &str,
        proto_file: &Path,
    ) -> Result<MessageSchema, CompilationError> {
        let schema = SchemaDescriptor::from_set(&self.set, &file_name(proto_file))?;
        schema
            .find_message(message)
            .cloned()
            .ok_or_else(|| CompilationError::UnknownMessage(message.to_string()))
    }

    /// Mirror a failure into `error_file`, the way `protoc` writes stderr.
    fn report(error_file: Option<&Path>, error: CompilationError) -> CompilationError {
        if let Some(path) = error_file {
            if let Err(e) = fs::write(path, format!("{error}\n")) {
                tracing::warn!(path = %path.display(), error = %e, "could not write error file");
            }
        }
        error
    }
}

impl SchemaCompiler for CannedCompiler {
    fn compile(
        &self,
        schema_file: &Path,
        out_file: Option<&Path>,
    ) -> Result<SchemaDescriptor, CompilationError> {
        let name = file_name(schema_file);
        if !schema_file.is_file() {
            return Err(CompilationError::DescriptorMissing(name));
        }
        if let Some(out_file) = out_file {
            fs::write(out_file, self.set.encode_to_vec())
                .map_err(|e| CompilationError::io(out_file, e))?;
        }
        SchemaDescriptor::from_set(&self.set, &name)
    }

    fn encode_from_text_file(
        &self,
        message: &str,
        proto_file: &Path,
        text_file: &Path,
        binary_path: &Path,
        error_file: Option<&Path>,
    ) -> Result<PathBuf, CompilationError> {
        let schema = self.message_schema(message, proto_file)?;
        let text = fs::read_to_string(text_file).map_err(|e| CompilationError::io(text_file, e))?;
        let record = DynamicRecord::from_text(&schema, &text)
            .map_err(|e| Self::report(error_file, e.into()))?;
        fs::write(binary_path, record.encode())
            .map_err(|e| CompilationError::io(binary_path, e))?;
        Ok(binary_path.to_path_buf())
    }

    fn decode_to_text_file(
        &self,
        message: &str,
        proto_file: &Path,
        text_path: &Path,
        binary_file: &Path,
        error_file: Option<&Path>,
    ) -> Result<PathBuf, CompilationError> {
        let schema = self.message_schema(message, proto_file)?;
        let bytes = fs::read(binary_file).map_err(|e| CompilationError::io(binary_file, e))?;
        let record = DynamicRecord::decode(&schema, &bytes)
            .map_err(|e| Self::report(error_file, e.into()))?;
        fs::write(text_path, record.to_text()).map_err(|e| CompilationError::io(text_path, e))?;
        Ok(text_path.to_path_buf())
    }
}
