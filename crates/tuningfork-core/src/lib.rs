//! # tuningfork-core — Foundational Types for Tuning Fork Validation
//!
//! The validation and CLI crates build on `tuningfork-core`; it
//! depends on nothing internal.
//!
//! ## Contents
//!
//! - [`ErrorType`] / [`ErrorGroup`] — the closed diagnostic taxonomy. Each
//!   error type belongs to exactly one group, fixed at compile time.
//! - [`ErrorCollector`] — the append-only, per-run accumulator of errors and
//!   warnings that every validator writes into.
//! - [`FolderConfig`] / [`TuningForkPaths`] — file names of the developer
//!   folder and the locations of packaged artifacts inside APKs and bundles.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tuningfork-*` crates.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod collector;
pub mod error_type;
pub mod paths;

pub use collector::{DiagnosticSummary, ErrorCollector, TypeCount};
pub use error_type::{ErrorGroup, ErrorType};
pub use paths::{FolderConfig, TuningForkPaths};
