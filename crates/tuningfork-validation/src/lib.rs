//! # tuningfork-validation — Tuning Fork Settings Validation
//!
//! Validates the developer Tuning Fork folder and the packaged binaries.
//!
//! ## Modules
//!
//! - [`schema_rules`] — `Annotation` and `FidelityParams` structure, and the
//!   [`EnumSizeVector`] derived from `Annotation`.
//! - [`settings_rules`] — aggregation, histograms, base URI, API key,
//!   request timeouts and loading annotation index of the settings.
//! - [`fidelity_rules`] — parseability, zero-enum and order heuristics over
//!   the fidelity-parameter family.
//! - [`parser`] — [`DevTuningforkParser`], the folder-level orchestrator
//!   that compiles the schema and writes the binaries.
//! - [`packaged`] — the same rules applied to binaries inside an APK or
//!   app bundle.
//!
//! ## Crate Policy
//!
//! - Bad input is never a Rust error. Every finding is recorded in the
//!   caller's [`tuningfork_core::ErrorCollector`] as an error or a warning.
//! - [`TuningforkError`] is reserved for runs that cannot proceed.

pub mod fidelity_rules;
pub mod packaged;
pub mod parser;
pub mod schema_rules;
pub mod settings_rules;

pub use packaged::{collect_packaged_entries, validate_packaged_entries, PackagedEntry};
pub use parser::{DevTuningforkParser, Stage, TuningforkError, ValidationOutcome};
pub use schema_rules::EnumSizeVector;
