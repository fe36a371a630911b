//! # Developer Folder Orchestration
//!
//! [`DevTuningforkParser`] validates a developer `assets/tuningfork`
//! folder end to end and writes the binaries the runtime loads.
//!
//! One run walks these stages in order, without retries:
//!
//! ```text
//! Discover -> CompileSchema -> ValidateSchema -> ValidateSettings
//!          -> ValidateFidelityFamily -> Done
//! ```
//!
//! Validation findings never abort a run; they go to the
//! [`ErrorCollector`]. Only a missing schema, a failing compiler, and
//! unreadable files are returned as [`TuningforkError`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tuningfork_core::{ErrorCollector, ErrorType, FolderConfig};
use tuningfork_schema::{CompilationError, MessageSchema, SchemaCompiler};

use crate::fidelity_rules;
use crate::schema_rules::{self, EnumSizeVector};
use crate::settings_rules;

/// Name of the message that holds annotation enums.
pub const ANNOTATION_MESSAGE: &str = "Annotation";

/// Name of the message that holds fidelity parameters.
pub const FIDELITY_PARAMS_MESSAGE: &str = "FidelityParams";

/// Failures that stop a validation run.
#[derive(Error, Debug)]
pub enum TuningforkError {
    #[error("schema file {} does not exist", .0.display())]
    SchemaMissing(PathBuf),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl TuningforkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discover,
    CompileSchema,
    ValidateSchema,
    ValidateSettings,
    ValidateFidelityFamily,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discover => "DISCOVER",
            Self::CompileSchema => "COMPILE_SCHEMA",
            Self::ValidateSchema => "VALIDATE_SCHEMA",
            Self::ValidateSettings => "VALIDATE_SETTINGS",
            Self::ValidateFidelityFamily => "VALIDATE_FIDELITY_FAMILY",
            Self::Done => "DONE",
        })
    }
}

/// Files written by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Compiled `dev_tuningfork.descriptor`.
    pub descriptor: PathBuf,
    /// `tuningfork_settings.bin`, when the settings parsed and were saved.
    pub settings_binary: Option<PathBuf>,
    /// One binary per fidelity text file that encoded successfully.
    pub fidelity_binaries: Vec<PathBuf>,
}

/// Validates one developer folder.
#[derive(Debug)]
pub struct DevTuningforkParser<C> {
    folder: PathBuf,
    compiler: C,
    stage: Stage,
    schema_file: Option<PathBuf>,
    settings_file: Option<PathBuf>,
    fidelity_files: Vec<PathBuf>,
}

impl<C: SchemaCompiler> DevTuningforkParser<C> {
    pub fn new(folder: impl Into<PathBuf>, compiler: C) -> Self {
        Self {
            folder: folder.into(),
            compiler,
            stage: Stage::Discover,
            schema_file: None,
            settings_file: None,
            fidelity_files: Vec::new(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Discovered fidelity text files, in validation order.
    pub fn fidelity_files(&self) -> &[PathBuf] {
        &self.fidelity_files
    }

    fn enter(&mut self, stage: Stage) {
        tracing::debug!(from = %self.stage, to = %stage, "stage");
        self.stage = stage;
    }

    /// Locate the schema, the settings and the fidelity family.
    ///
    /// Fidelity files are ordered by the first number in their name (0 if
    /// none), ties broken by name.
    pub fn parse_files_in_folder(&mut self) -> Result<(), TuningforkError> {
        let schema = self.folder.join(FolderConfig::DEV_TUNINGFORK_PROTO);
        self.schema_file = schema.is_file().then_some(schema);
        let settings = self.folder.join(FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO);
        self.settings_file = settings.is_file().then_some(settings);

        let pattern = FolderConfig::dev_fidelity_text_pattern()?;
        let entries =
            fs::read_dir(&self.folder).map_err(|e| TuningforkError::io(&self.folder, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TuningforkError::io(&self.folder, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if pattern.is_match(&name) && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort();
        names.sort_by_key(|name| FolderConfig::file_number(name));
        self.fidelity_files = names.iter().map(|n| self.folder.join(n)).collect();

        self.enter(Stage::CompileSchema);
        Ok(())
    }

    /// Run every stage. Discovers the folder first if that has not
    /// happened yet.
    pub fn validate(
        &mut self,
        errors: &mut ErrorCollector,
    ) -> Result<ValidationOutcome, TuningforkError> {
        if self.stage == Stage::Discover {
            self.parse_files_in_folder()?;
        }

        let Some(schema_file) = self.schema_file.clone() else {
            tracing::error!("File {} exists: FAIL", FolderConfig::DEV_TUNINGFORK_PROTO);
            return Err(TuningforkError::SchemaMissing(
                self.folder.join(FolderConfig::DEV_TUNINGFORK_PROTO),
            ));
        };
        tracing::info!("File {} exists: OK", FolderConfig::DEV_TUNINGFORK_PROTO);

        let descriptor = self.folder.join(FolderConfig::DEV_TUNINGFORK_DESCRIPTOR);
        let schema = self.compiler.compile(&schema_file, Some(&descriptor))?;

        self.enter(Stage::ValidateSchema);
        let annotation = schema.find_message(ANNOTATION_MESSAGE);
        let fidelity = schema.find_message(FIDELITY_PARAMS_MESSAGE);
        let enum_sizes = schema_rules::validate_annotation(annotation, errors);
        schema_rules::validate_fidelity_params(fidelity, errors);
        if let Some(annotation) = annotation {
            tracing::info!("Loaded Annotation message:\n{annotation}");
        }
        if let Some(fidelity) = fidelity {
            tracing::info!("Loaded FidelityParams message:\n{fidelity}");
        }

        self.enter(Stage::ValidateSettings);
        let settings_binary = self.validate_and_save_settings(enum_sizes.as_ref(), errors)?;

        self.enter(Stage::ValidateFidelityFamily);
        let fidelity_binaries = match fidelity {
            Some(fidelity) => self.encode_and_validate_family(&schema_file, fidelity, errors),
            None => {
                tracing::error!(
                    "Skip {} files check as FidelityParams message does not exist",
                    FolderConfig::DEV_FIDELITY_TEXTPROTO
                );
                Vec::new()
            }
        };

        self.enter(Stage::Done);
        Ok(ValidationOutcome {
            descriptor,
            settings_binary,
            fidelity_binaries,
        })
    }

    fn validate_and_save_settings(
        &self,
        enum_sizes: Option<&EnumSizeVector>,
        errors: &mut ErrorCollector,
    ) -> Result<Option<PathBuf>, TuningforkError> {
        let Some(settings_file) = &self.settings_file else {
            tracing::error!("File {} exists: FAIL", FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO);
            errors.add_error(
                ErrorType::SettingsMissing,
                format!("{} is missing", FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO),
            );
            return Ok(None);
        };
        tracing::info!("File {} exists: OK", FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO);

        if errors.has_annotation_errors() {
            tracing::error!(
                "Annotation is not valid, skipping annotation_enum_size check of {}",
                FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO
            );
        }

        let text =
            fs::read_to_string(settings_file).map_err(|e| TuningforkError::io(settings_file, e))?;
        let Some(settings) = settings_rules::validate_settings_text(&text, enum_sizes, errors)
        else {
            tracing::error!(
                "Skip saving {} file as {} does not parse",
                FolderConfig::TUNINGFORK_SETTINGS_BINARY,
                FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO
            );
            return Ok(None);
        };
        if errors.has_settings_errors() {
            tracing::error!(
                "{} contains errors, saving {} anyway",
                FolderConfig::TUNINGFORK_SETTINGS_TEXTPROTO,
                FolderConfig::TUNINGFORK_SETTINGS_BINARY
            );
        }
        tracing::info!("Loaded settings:\n{}", settings.to_text());

        let out = self.folder.join(FolderConfig::TUNINGFORK_SETTINGS_BINARY);
        match fs::write(&out, prost::Message::encode_to_vec(&settings)) {
            Ok(()) => Ok(Some(out)),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Error writing settings to {} file",
                    FolderConfig::TUNINGFORK_SETTINGS_BINARY
                );
                Ok(None)
            }
        }
    }

    fn encode_and_validate_family(
        &self,
        schema_file: &Path,
        fidelity: &MessageSchema,
        errors: &mut ErrorCollector,
    ) -> Vec<PathBuf> {
        if self.fidelity_files.is_empty() {
            tracing::error!("{} files found: FAIL", FolderConfig::DEV_FIDELITY_TEXTPROTO);
        } else {
            let listing: Vec<String> = self
                .fidelity_files
                .iter()
                .map(|f| file_label(f))
                .collect();
            tracing::info!(
                "{} {} files found: OK\n{}",
                self.fidelity_files.len(),
                FolderConfig::DEV_FIDELITY_TEXTPROTO,
                listing.join("\n")
            );
        }
        if errors.has_fidelity_params_errors() {
            tracing::error!(
                "FidelityParams message is not valid, {} files may not encode",
                FolderConfig::DEV_FIDELITY_TEXTPROTO
            );
        }

        let mut written = Vec::new();
        let mut contents = Vec::new();
        for text_file in &self.fidelity_files {
            let label = file_label(text_file);
            let binary = text_file.with_file_name(FolderConfig::binary_name_for_text(&label));
            let binary = match self.compiler.encode_from_text_file(
                &fidelity.full_name,
                schema_file,
                text_file,
                &binary,
                None,
            ) {
                Ok(binary) => binary,
                Err(e) => {
                    errors.add_error(
                        ErrorType::DevFidelityParametersEncoding,
                        format!("Encoding {label} file: {e}"),
                    );
                    continue;
                }
            };
            match fs::read(&binary) {
                Ok(bytes) => contents.push(bytes),
                Err(e) => {
                    errors.add_error(
                        ErrorType::DevFidelityParametersReading,
                        format!("Reading {} file: {e}", file_label(&binary)),
                    );
                    continue;
                }
            }
            written.push(binary);
        }

        if let Some(records) =
            fidelity_rules::validate_dev_fidelity_params(&contents, fidelity, errors)
        {
            fidelity_rules::validate_family(fidelity, &records, errors);
        }
        written
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
