//! # Error Collector
//!
//! Per-run accumulator of categorized errors and warnings.
//!
//! Validators never return language-level errors for bad input. They record
//! a diagnostic here and return an empty result, leaving the decision of
//! what to skip to the orchestrator.
//!
//! The collector is append-only: nothing is ever removed within a run, and
//! every count is derived from the stored entries.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::error_type::{ErrorGroup, ErrorType};

/// Collects validation errors and warnings, keyed by [`ErrorType`].
///
/// Insertion order is preserved per key. Construct a fresh collector for
/// every validation run.
#[derive(Debug, Default, Clone)]
pub struct ErrorCollector {
    errors: BTreeMap<ErrorType, Vec<String>>,
    warnings: BTreeMap<ErrorType, Vec<String>>,
}

impl ErrorCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn add_error(&mut self, error_type: ErrorType, message: impl Into<String>) {
        self.errors.entry(error_type).or_default().push(message.into());
    }

    /// Record a warning.
    pub fn add_warning(&mut self, error_type: ErrorType, message: impl Into<String>) {
        self.warnings
            .entry(error_type)
            .or_default()
            .push(message.into());
    }

    /// Total number of recorded errors.
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// Number of recorded errors of one type.
    pub fn error_count_of(&self, error_type: ErrorType) -> usize {
        self.errors.get(&error_type).map_or(0, Vec::len)
    }

    /// Total number of recorded warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.values().map(Vec::len).sum()
    }

    /// Number of recorded warnings of one type.
    pub fn warning_count_of(&self, error_type: ErrorType) -> usize {
        self.warnings.get(&error_type).map_or(0, Vec::len)
    }

    /// True if any recorded error belongs to `group`.
    pub fn has_errors(&self, group: ErrorGroup) -> bool {
        self.errors
            .iter()
            .any(|(ty, messages)| ty.group() == group && !messages.is_empty())
    }

    pub fn has_annotation_errors(&self) -> bool {
        self.has_errors(ErrorGroup::Annotation)
    }

    pub fn has_fidelity_params_errors(&self) -> bool {
        self.has_errors(ErrorGroup::Fidelity)
    }

    pub fn has_settings_errors(&self) -> bool {
        self.has_errors(ErrorGroup::Settings)
    }

    /// Error messages recorded for one type, in insertion order.
    pub fn errors_of(&self, error_type: ErrorType) -> &[String] {
        self.errors.get(&error_type).map_or(&[], Vec::as_slice)
    }

    /// Warning messages recorded for one type, in insertion order.
    pub fn warnings_of(&self, error_type: ErrorType) -> &[String] {
        self.warnings.get(&error_type).map_or(&[], Vec::as_slice)
    }

    /// All errors, grouped by type in taxonomy order.
    pub fn errors(&self) -> impl Iterator<Item = (ErrorType, &str)> {
        flatten(&self.errors)
    }

    /// All warnings, grouped by type in taxonomy order.
    pub fn warnings(&self) -> impl Iterator<Item = (ErrorType, &str)> {
        flatten(&self.warnings)
    }

    /// Human-readable report of every error type with a nonzero count.
    ///
    /// Empty when no errors were recorded.
    pub fn status_report(&self) -> String {
        let mut report = String::new();
        for (error_type, messages) in &self.errors {
            if messages.is_empty() {
                continue;
            }
            let _ = writeln!(report, "{error_type} : {} ERRORS", messages.len());
            for message in messages {
                let _ = writeln!(report, "\t{message}");
            }
        }
        report
    }

    /// Emit every warning and the error report through `tracing`.
    pub fn log_status(&self) {
        for (error_type, message) in self.warnings() {
            tracing::warn!(%error_type, "{message}");
        }
        if self.error_count() > 0 {
            tracing::warn!("validation errors:\n{}", self.status_report());
        }
    }

    /// Serializable per-type counts and messages.
    pub fn summary(&self) -> DiagnosticSummary {
        DiagnosticSummary {
            error_count: self.error_count(),
            warning_count: self.warning_count(),
            errors: type_counts(&self.errors),
            warnings: type_counts(&self.warnings),
        }
    }
}

fn flatten(map: &BTreeMap<ErrorType, Vec<String>>) -> impl Iterator<Item = (ErrorType, &str)> {
    map.iter()
        .flat_map(|(ty, messages)| messages.iter().map(move |m| (*ty, m.as_str())))
}

fn type_counts(map: &BTreeMap<ErrorType, Vec<String>>) -> Vec<TypeCount> {
    map.iter()
        .filter(|(_, messages)| !messages.is_empty())
        .map(|(ty, messages)| TypeCount {
            error_type: *ty,
            group: ty.group(),
            count: messages.len(),
            messages: messages.clone(),
        })
        .collect()
}

/// Snapshot of a collector, suitable for a machine-readable report.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSummary {
    pub error_count: usize,
    pub warning_count: usize,
    pub errors: Vec<TypeCount>,
    pub warnings: Vec<TypeCount>,
}

/// Count and messages recorded for one error type.
#[derive(Debug, Clone, Serialize)]
pub struct TypeCount {
    pub error_type: ErrorType,
    pub group: ErrorGroup,
    pub count: usize,
    pub messages: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collector_has_no_counts() {
        let errors = ErrorCollector::new();
        assert_eq!(errors.error_count(), 0);
        assert_eq!(errors.warning_count(), 0);
        assert!(!errors.has_annotation_errors());
        assert!(!errors.has_fidelity_params_errors());
        assert!(!errors.has_settings_errors());
        assert!(errors.status_report().is_empty());
    }

    #[test]
    fn counts_are_per_type_and_total() {
        let mut errors = ErrorCollector::new();
        errors.add_error(ErrorType::ApiKeyMissing, "api_key is missing");
        errors.add_error(ErrorType::AggregationAnnotations, "first");
        errors.add_error(ErrorType::AggregationAnnotations, "second");
        errors.add_warning(ErrorType::HistogramBucketInvalid, "covers only 30 fps");

        assert_eq!(errors.error_count(), 3);
        assert_eq!(errors.error_count_of(ErrorType::AggregationAnnotations), 2);
        assert_eq!(errors.error_count_of(ErrorType::AnnotationType), 0);
        assert_eq!(errors.warning_count(), 1);
        assert_eq!(errors.warning_count_of(ErrorType::HistogramBucketInvalid), 1);
        assert_eq!(errors.error_count_of(ErrorType::HistogramBucketInvalid), 0);
    }

    #[test]
    fn insertion_order_is_kept_per_key() {
        let mut errors = ErrorCollector::new();
        errors.add_error(ErrorType::AggregationAnnotations, "expected 5, but was 6");
        errors.add_error(ErrorType::AggregationAnnotations, "expected 10, but was 11");
        assert_eq!(
            errors.errors_of(ErrorType::AggregationAnnotations),
            ["expected 5, but was 6", "expected 10, but was 11"]
        );
    }

    #[test]
    fn warnings_do_not_count_as_group_errors() {
        let mut errors = ErrorCollector::new();
        errors.add_warning(ErrorType::LoadingAnnotationIndexMissing, "not set");
        assert!(!errors.has_settings_errors());
        errors.add_error(ErrorType::BaseUriNotUrl, "bad");
        assert!(errors.has_settings_errors());
        assert!(!errors.has_annotation_errors());
    }

    #[test]
    fn group_queries_follow_the_taxonomy() {
        let mut errors = ErrorCollector::new();
        errors.add_error(ErrorType::FidelityParamsComplex, "has oneof");
        assert!(errors.has_fidelity_params_errors());
        assert!(errors.has_errors(ErrorGroup::Fidelity));
        assert!(!errors.has_errors(ErrorGroup::DevFidelity));
    }

    #[test]
    fn iterators_flatten_in_taxonomy_order() {
        let mut errors = ErrorCollector::new();
        errors.add_error(ErrorType::ApiKeyMissing, "b");
        errors.add_error(ErrorType::AnnotationEmpty, "a");
        let collected: Vec<_> = errors.errors().collect();
        assert_eq!(
            collected,
            vec![
                (ErrorType::AnnotationEmpty, "a"),
                (ErrorType::ApiKeyMissing, "b")
            ]
        );
    }

    #[test]
    fn status_report_lists_each_type_with_count() {
        let mut errors = ErrorCollector::new();
        errors.add_error(ErrorType::ApiKeyMissing, "api_key is missing");
        errors.add_error(ErrorType::BaseUriNotUrl, "base_uri is not a valid URL");
        let report = errors.status_report();
        assert!(report.contains("BASE_URI_NOT_URL : 1 ERRORS"));
        assert!(report.contains("API_KEY_MISSING : 1 ERRORS"));
        assert!(report.contains("\tapi_key is missing"));
    }

    #[test]
    fn summary_serializes_counts() {
        let mut errors = ErrorCollector::new();
        errors.add_error(ErrorType::ApiKeyInvalid, "placeholder");
        errors.add_warning(ErrorType::DevFidelityParametersOrder, "order");
        let json = serde_json::to_value(errors.summary()).unwrap();
        assert_eq!(json["error_count"], 1);
        assert_eq!(json["warning_count"], 1);
        assert_eq!(json["errors"][0]["error_type"], "API_KEY_INVALID");
        assert_eq!(json["errors"][0]["group"], "SETTINGS");
        assert_eq!(json["warnings"][0]["error_type"], "DEV_FIDELITY_PARAMETERS_ORDER");
    }
}
