//! # tuningfork-cli — Tuning Fork Folder Validator
//!
//! Provides the `tuningfork-validate` binary:
//!
//! ```bash
//! tuningfork-validate --tuningforkPath app/src/main/assets/tuningfork \
//!     --protoCompiler /usr/local/bin/protoc --errorOnExit
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in [`validate::ValidateArgs`]; the work is done by
//!   `tuningfork-validation`.
//! - Handlers return a process exit code and leave logging setup to `main`.

pub mod validate;

pub use validate::{run_validate, ValidateArgs};
