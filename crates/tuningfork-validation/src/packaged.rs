//! # Packaged Artifact Validation
//!
//! Checks the binaries as they ship inside an APK (`assets/tuningfork/`)
//! or an app bundle (`base/assets/tuningfork/`): one compiled descriptor,
//! the binary settings, and the numbered fidelity-parameter binaries.
//!
//! Entries are `(path inside the archive, bytes)` pairs; archive reading is
//! left to the caller. [`collect_packaged_entries`] builds them from an
//! extracted directory tree.

use std::fs;
use std::path::{Path, PathBuf};

use prost::Message as _;
use prost_types::FileDescriptorSet;
use tuningfork_core::{ErrorCollector, ErrorType, FolderConfig, TuningForkPaths};
use tuningfork_schema::SchemaDescriptor;

use crate::fidelity_rules;
use crate::parser::{TuningforkError, ANNOTATION_MESSAGE, FIDELITY_PARAMS_MESSAGE};
use crate::schema_rules;
use crate::settings_rules;

/// A file inside a packaged app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedEntry {
    /// `/`-separated path relative to the archive root.
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Validate the Tuning Fork binaries found under `base`.
///
/// Stops after recording an error when the descriptor is missing,
/// duplicated or undecodable; everything else is reported and skipped.
pub fn validate_packaged_entries(
    entries: &[PackagedEntry],
    base: &str,
    errors: &mut ErrorCollector,
) -> Result<(), TuningforkError> {
    let descriptor_pattern = TuningForkPaths::descriptor_pattern(base)?;
    let settings_pattern = TuningForkPaths::settings_pattern(base)?;
    let fidelity_pattern = TuningForkPaths::fidelity_param_pattern(base)?;

    let descriptors: Vec<&PackagedEntry> = entries
        .iter()
        .filter(|e| descriptor_pattern.is_match(&e.path))
        .collect();
    let descriptor = match descriptors.as_slice() {
        [] => {
            errors.add_error(
                ErrorType::DescriptorMissing,
                format!("{base}{} is missing", FolderConfig::DEV_TUNINGFORK_DESCRIPTOR),
            );
            return Ok(());
        }
        [one] => *one,
        many => {
            errors.add_error(
                ErrorType::TooManyDescriptors,
                format!("found {} descriptor files, expected one", many.len()),
            );
            return Ok(());
        }
    };

    let Some(schema) = decode_descriptor(&descriptor.bytes) else {
        errors.add_error(
            ErrorType::DescriptorParseError,
            format!("{} is not a valid descriptor set", descriptor.path),
        );
        return Ok(());
    };
    tracing::info!(path = %descriptor.path, file = schema.file_name(), "loaded packaged descriptor");

    let annotation = schema.find_message(ANNOTATION_MESSAGE);
    let fidelity = schema.find_message(FIDELITY_PARAMS_MESSAGE);
    let enum_sizes = schema_rules::validate_annotation(annotation, errors);
    schema_rules::validate_fidelity_params(fidelity, errors);

    match entries.iter().find(|e| settings_pattern.is_match(&e.path)) {
        Some(settings) => {
            settings_rules::validate_settings_bytes(&settings.bytes, enum_sizes.as_ref(), errors);
        }
        None => errors.add_error(
            ErrorType::SettingsMissing,
            format!("{base}{} is missing", FolderConfig::TUNINGFORK_SETTINGS_BINARY),
        ),
    }

    let mut family: Vec<(u64, &PackagedEntry)> = entries
        .iter()
        .filter_map(|e| {
            let number = fidelity_pattern.captures(&e.path)?.get(2)?.as_str();
            Some((number.parse().unwrap_or(u64::MAX), e))
        })
        .collect();
    family.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));

    if let Some(fidelity) = fidelity {
        let contents: Vec<&[u8]> = family.iter().map(|(_, e)| e.bytes.as_slice()).collect();
        if let Some(records) =
            fidelity_rules::validate_dev_fidelity_params(&contents, fidelity, errors)
        {
            fidelity_rules::validate_family(fidelity, &records, errors);
        }
    }
    Ok(())
}

/// The descriptor of `dev_tuningfork.proto`, or of the only file when the
/// set was compiled under another name.
fn decode_descriptor(bytes: &[u8]) -> Option<SchemaDescriptor> {
    let set = FileDescriptorSet::decode(bytes).ok()?;
    SchemaDescriptor::from_set(&set, FolderConfig::DEV_TUNINGFORK_PROTO)
        .ok()
        .or_else(|| match set.file.as_slice() {
            [only] => Some(SchemaDescriptor::from_file(only)),
            _ => None,
        })
}

/// Read every file below `root` into entries with root-relative paths,
/// sorted by path.
pub fn collect_packaged_entries(root: &Path) -> Result<Vec<PackagedEntry>, TuningforkError> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    files
        .into_iter()
        .map(|file| {
            let bytes = fs::read(&file).map_err(|e| TuningforkError::io(&file, e))?;
            let relative = file.strip_prefix(root).unwrap_or(&file);
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Ok(PackagedEntry { path, bytes })
        })
        .collect()
}

fn walk(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<(), TuningforkError> {
    let entries = fs::read_dir(dir).map_err(|e| TuningforkError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| TuningforkError::io(dir, e))?.path();
        if path.is_dir() {
            walk(&path, acc)?;
        } else {
            acc.push(path);
        }
    }
    Ok(())
}
