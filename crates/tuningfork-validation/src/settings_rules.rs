//! # Settings Rules
//!
//! Validation of the `Settings` record. Once the record parses, the
//! individual checks run independently against the same collector; none
//! of them stops another.

use prost::Message as _;
use tuningfork_core::{ErrorCollector, ErrorType};
use tuningfork_schema::{Histogram, Settings};

use crate::schema_rules::EnumSizeVector;

/// Upper bound of `max_instrumentation_keys`.
pub const MAX_INSTRUMENTATION_KEYS: i32 = 256;

/// Frame time of 60 fps, in milliseconds.
pub const FRAME_TIME_60FPS_MS: f32 = 16.7;

/// Frame time of 30 fps, in milliseconds.
pub const FRAME_TIME_30FPS_MS: f32 = 33.3;

/// `api_key` value shipped in the samples.
pub const PLACEHOLDER_API_KEY: &str = "enter-your-api-key-here";

/// Parse and validate the text form. `None` when it does not parse.
pub fn validate_settings_text(
    text: &str,
    enum_sizes: Option<&EnumSizeVector>,
    errors: &mut ErrorCollector,
) -> Option<Settings> {
    match Settings::from_text(text) {
        Ok(settings) => {
            validate_settings(&settings, enum_sizes, errors);
            Some(settings)
        }
        Err(e) => {
            errors.add_error(
                ErrorType::SettingsParsing,
                format!("Parsing tuningfork_settings.txt: {e}"),
            );
            None
        }
    }
}

/// Decode and validate the binary form. `None` when it does not decode.
pub fn validate_settings_bytes(
    bytes: &[u8],
    enum_sizes: Option<&EnumSizeVector>,
    errors: &mut ErrorCollector,
) -> Option<Settings> {
    match Settings::decode(bytes) {
        Ok(settings) => {
            validate_settings(&settings, enum_sizes, errors);
            Some(settings)
        }
        Err(e) => {
            errors.add_error(
                ErrorType::SettingsParsing,
                format!("Parsing tuningfork_settings.bin: {e}"),
            );
            None
        }
    }
}

/// Run every settings check. `default_fidelity_parameters_filename` is
/// not validated.
pub fn validate_settings(
    settings: &Settings,
    enum_sizes: Option<&EnumSizeVector>,
    errors: &mut ErrorCollector,
) {
    validate_aggregation(settings, enum_sizes, errors);
    validate_histograms(settings, errors);
    validate_base_uri(settings, errors);
    validate_api_key(settings, errors);
    validate_request_timeouts(settings, errors);
    validate_loading_annotation_index(settings, errors);
}

/// Aggregation strategy: present, a sane key limit and annotation enum
/// sizes that agree with the schema.
///
/// With `enum_sizes` of `None` (the Annotation message was invalid) the
/// annotation comparison is skipped.
pub fn validate_aggregation(
    settings: &Settings,
    enum_sizes: Option<&EnumSizeVector>,
    errors: &mut ErrorCollector,
) {
    let Some(aggregation) = &settings.aggregation_strategy else {
        errors.add_error(ErrorType::AggregationEmpty, "Aggregation message is missing");
        return;
    };

    // A missing key count is also range-checked as its default 0.
    if aggregation.max_instrumentation_keys.is_none() {
        errors.add_error(
            ErrorType::AggregationInstrumentationKey,
            "Aggregation strategy doesn't have max_instrumentation_keys field",
        );
    }
    let keys = aggregation.max_instrumentation_keys.unwrap_or(0);
    if !(1..=MAX_INSTRUMENTATION_KEYS).contains(&keys) {
        errors.add_error(
            ErrorType::AggregationInstrumentationKey,
            format!(
                "max_instrumentation_keys should be between 1 and {MAX_INSTRUMENTATION_KEYS}, \
                 current value is {keys}"
            ),
        );
    }

    let Some(expected) = enum_sizes else {
        tracing::debug!("annotation enum sizes unknown, skipping annotation_enum_size check");
        return;
    };
    let declared = &aggregation.annotation_enum_size;
    if declared.len() != expected.len() {
        errors.add_error(
            ErrorType::AggregationAnnotations,
            format!(
                "\"tuningfork_settings.bin\" should contain the same number of annotations \
                 as \"dev_tuningfork.proto\", expected {}, but was {}",
                expected.len(),
                declared.len()
            ),
        );
        return;
    }
    for (want, got) in expected.as_slice().iter().zip(declared) {
        if want != got {
            errors.add_error(
                ErrorType::AggregationAnnotations,
                format!(
                    "\"tuningfork_settings.bin\" should contain the same annotations as \
                     \"dev_tuningfork.proto\", expected {want}, but was {got}"
                ),
            );
        }
    }
}

/// Histogram bucket sanity. Warnings only.
pub fn validate_histograms(settings: &Settings, errors: &mut ErrorCollector) {
    for histogram in &settings.histograms {
        validate_histogram(histogram, errors);
    }
}

fn validate_histogram(histogram: &Histogram, errors: &mut ErrorCollector) {
    let min = histogram.bucket_min.unwrap_or(0.0);
    let max = histogram.bucket_max.unwrap_or(0.0);
    // Both bounds zero means the runtime picks its defaults.
    if min == 0.0 && max == 0.0 {
        return;
    }

    let n_buckets = histogram.n_buckets.unwrap_or(0);
    if n_buckets < 1 {
        errors.add_warning(
            ErrorType::HistogramBucketInvalid,
            format!("Set n_buckets to a positive integer. It is currently {n_buckets}"),
        );
    }

    let covers_60fps = min < FRAME_TIME_60FPS_MS && max > FRAME_TIME_60FPS_MS;
    let covers_30fps = max > FRAME_TIME_30FPS_MS && min < FRAME_TIME_30FPS_MS;

    if histogram.bucket_max.is_some() && max < min {
        errors.add_warning(
            ErrorType::HistogramBucketInvalid,
            format!(
                "bucket_min has to be less than bucket_max. Max currently is {max}, \
                 min currently is {min}"
            ),
        );
    }
    if min < 0.0 || max < 0.0 {
        errors.add_warning(
            ErrorType::HistogramBucketInvalid,
            "bucket_min or bucket_max covers negative fps",
        );
    }
    if !covers_30fps && !covers_60fps {
        errors.add_warning(
            ErrorType::HistogramBucketInvalid,
            format!(
                "Histogram covers neither 30 nor 60 fps. It covers from {} to {} fps",
                1000.0 / max,
                1000.0 / min
            ),
        );
    }
    if covers_30fps != covers_60fps {
        let fps = if covers_30fps { 30 } else { 60 };
        errors.add_warning(
            ErrorType::HistogramBucketInvalid,
            format!("Histogram covers only {fps} fps"),
        );
    }
}

/// `base_uri` is optional, but when set it must be a URL with a host.
pub fn validate_base_uri(settings: &Settings, errors: &mut ErrorCollector) {
    let Some(base_uri) = &settings.base_uri else {
        return;
    };
    let valid = url::Url::parse(base_uri).is_ok_and(|url| url.has_host());
    if !valid {
        errors.add_error(
            ErrorType::BaseUriNotUrl,
            format!("base_uri is not a valid URL: {base_uri}"),
        );
    }
}

pub fn validate_api_key(settings: &Settings, errors: &mut ErrorCollector) {
    match settings.api_key.as_deref() {
        None => errors.add_error(ErrorType::ApiKeyMissing, "api_key is missing"),
        Some(PLACEHOLDER_API_KEY) => errors.add_error(
            ErrorType::ApiKeyInvalid,
            "api_key not set to a valid value",
        ),
        Some(_) => {}
    }
}

pub fn validate_request_timeouts(settings: &Settings, errors: &mut ErrorCollector) {
    if let Some(ms) = settings.initial_request_timeout_ms.filter(|ms| *ms < 0) {
        errors.add_error(
            ErrorType::InitialRequestTimeoutInvalid,
            format!("initial_request_timeout_ms must not be negative, is {ms}"),
        );
    }
    if let Some(ms) = settings.ultimate_request_timeout_ms.filter(|ms| *ms < 0) {
        errors.add_error(
            ErrorType::UltimateRequestTimeoutInvalid,
            format!("ultimate_request_timeout_ms must not be negative, is {ms}"),
        );
    }
}

pub fn validate_loading_annotation_index(settings: &Settings, errors: &mut ErrorCollector) {
    if settings.loading_annotation_index.is_none() {
        errors.add_warning(
            ErrorType::LoadingAnnotationIndexMissing,
            "loading_annotation_index not set",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuningfork_schema::AggregationStrategy;

    fn sizes(values: &[i32]) -> EnumSizeVector {
        EnumSizeVector::new(values.to_vec())
    }

    fn histogram(min: f32, max: f32, n_buckets: i32) -> Histogram {
        Histogram {
            instrument_key: Some(0),
            bucket_min: Some(min),
            bucket_max: Some(max),
            n_buckets: Some(n_buckets),
        }
    }

    fn histogram_warnings(h: Histogram) -> usize {
        let settings = Settings {
            histograms: vec![h],
            ..Default::default()
        };
        let mut errors = ErrorCollector::new();
        validate_histograms(&settings, &mut errors);
        assert_eq!(errors.error_count(), 0);
        errors.warning_count()
    }

    fn aggregation(enum_sizes: &[i32], max_keys: Option<i32>) -> Settings {
        Settings {
            aggregation_strategy: Some(AggregationStrategy {
                annotation_enum_size: enum_sizes.to_vec(),
                max_instrumentation_keys: max_keys,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn histogram_valid() {
        assert_eq!(histogram_warnings(histogram(6.54, 60.0, 30)), 0);
        assert_eq!(histogram_warnings(histogram(0.0, 100.0, 30)), 0);
    }

    #[test]
    fn histogram_negative_coverage() {
        assert_eq!(histogram_warnings(histogram(-10.0, 10.0, 30)), 2);
    }

    #[test]
    fn histogram_bucket_count_invalid() {
        assert_eq!(histogram_warnings(histogram(0.0, 100.0, -10)), 1);
    }

    #[test]
    fn histogram_covers_neither() {
        assert_eq!(histogram_warnings(histogram(100.0, 1000.0, 30)), 1);
    }

    #[test]
    fn histogram_covers_one() {
        assert_eq!(histogram_warnings(histogram(0.0, 20.0, 30)), 1);
    }

    #[test]
    fn histogram_wrong_min_max_order() {
        assert_eq!(histogram_warnings(histogram(100.0, 0.0, 30)), 2);
    }

    #[test]
    fn histogram_unset_bounds_are_skipped() {
        assert_eq!(histogram_warnings(Histogram::default()), 0);
    }

    #[test]
    fn aggregation_valid() {
        let mut errors = ErrorCollector::new();
        validate_aggregation(&aggregation(&[5, 10], Some(100)), Some(&sizes(&[5, 10])), &mut errors);
        assert_eq!(errors.error_count(), 0);
    }

    #[test]
    fn aggregation_missing() {
        let mut errors = ErrorCollector::new();
        validate_aggregation(&Settings::default(), Some(&sizes(&[5])), &mut errors);
        assert_eq!(errors.error_count_of(ErrorType::AggregationEmpty), 1);
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn aggregation_incorrect_count_short_circuits() {
        let mut errors = ErrorCollector::new();
        validate_aggregation(
            &aggregation(&[5, 10], Some(100)),
            Some(&sizes(&[5, 10, 20])),
            &mut errors,
        );
        assert_eq!(errors.error_count_of(ErrorType::AggregationAnnotations), 1);
        assert_eq!(errors.error_count(), 1);

        let mut errors = ErrorCollector::new();
        validate_aggregation(
            &aggregation(&[5, 10, 20], Some(100)),
            Some(&sizes(&[6, 11, 21, 31])),
            &mut errors,
        );
        assert_eq!(errors.error_count_of(ErrorType::AggregationAnnotations), 1);
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn aggregation_one_error_per_mismatched_position() {
        let mut errors = ErrorCollector::new();
        validate_aggregation(
            &aggregation(&[5, 10, 20], Some(100)),
            Some(&sizes(&[5, 11, 21])),
            &mut errors,
        );
        assert_eq!(
            errors.errors_of(ErrorType::AggregationAnnotations),
            [
                "\"tuningfork_settings.bin\" should contain the same annotations as \
                 \"dev_tuningfork.proto\", expected 11, but was 10",
                "\"tuningfork_settings.bin\" should contain the same annotations as \
                 \"dev_tuningfork.proto\", expected 21, but was 20",
            ]
        );
    }

    #[test]
    fn aggregation_wrong_instrumentation_key() {
        for keys in [0, -1, 257, 99999] {
            let mut errors = ErrorCollector::new();
            validate_aggregation(&aggregation(&[5, 10], Some(keys)), Some(&sizes(&[5, 10])), &mut errors);
            assert_eq!(errors.error_count_of(ErrorType::AggregationInstrumentationKey), 1);
            assert_eq!(errors.error_count(), 1);
        }
        for keys in [1, 256] {
            let mut errors = ErrorCollector::new();
            validate_aggregation(&aggregation(&[], Some(keys)), Some(&sizes(&[])), &mut errors);
            assert_eq!(errors.error_count(), 0);
        }
    }

    #[test]
    fn aggregation_missing_instrumentation_key_is_missing_and_out_of_range() {
        let mut errors = ErrorCollector::new();
        validate_aggregation(&aggregation(&[5], None), Some(&sizes(&[5])), &mut errors);
        assert_eq!(errors.error_count_of(ErrorType::AggregationInstrumentationKey), 2);
        assert_eq!(errors.error_count(), 2);
        let messages = errors.errors_of(ErrorType::AggregationInstrumentationKey);
        assert!(messages[0].contains("doesn't have max_instrumentation_keys"));
        assert!(messages[1].contains("current value is 0"));
    }

    #[test]
    fn settings_text_without_key_count_is_two_errors() {
        let mut errors = ErrorCollector::new();
        let settings = validate_settings_text(
            "aggregation_strategy { annotation_enum_size: 5 }",
            Some(&sizes(&[5])),
            &mut errors,
        );
        assert!(settings.is_some());
        assert_eq!(errors.error_count_of(ErrorType::AggregationInstrumentationKey), 2);
    }

    #[test]
    fn deeply_nested_settings_text_is_a_parsing_error() {
        let depth = 200_000;
        let text = format!("{}{}", "histograms {".repeat(depth), "}".repeat(depth));
        let mut errors = ErrorCollector::new();
        assert!(validate_settings_text(&text, None, &mut errors).is_none());
        assert_eq!(errors.error_count_of(ErrorType::SettingsParsing), 1);
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn aggregation_without_enum_sizes_skips_annotation_check() {
        let mut errors = ErrorCollector::new();
        validate_aggregation(&aggregation(&[1, 2, 3], Some(300)), None, &mut errors);
        assert_eq!(errors.error_count_of(ErrorType::AggregationAnnotations), 0);
        assert_eq!(errors.error_count_of(ErrorType::AggregationInstrumentationKey), 1);
    }

    #[test]
    fn settings_text_valid() {
        let text = r#"
            aggregation_strategy {
              max_instrumentation_keys: 100
              annotation_enum_size: 5
              annotation_enum_size: 10
            }
            histograms { instrument_key: 0 bucket_min: 0 bucket_max: 100 n_buckets: 30 }
            api_key: "test-api-key"
            loading_annotation_index: 1
        "#;
        let mut errors = ErrorCollector::new();
        let settings = validate_settings_text(text, Some(&sizes(&[5, 10])), &mut errors).unwrap();
        assert_eq!(errors.error_count(), 0);
        assert_eq!(errors.warning_count(), 0);
        assert_eq!(settings.api_key.as_deref(), Some("test-api-key"));
    }

    #[test]
    fn settings_text_parse_failure() {
        let mut errors = ErrorCollector::new();
        assert!(validate_settings_text("api_key {", Some(&sizes(&[])), &mut errors).is_none());
        assert_eq!(errors.error_count_of(ErrorType::SettingsParsing), 1);
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn settings_bytes_round_trip_and_failure() {
        let settings = aggregation(&[2], Some(10));
        let mut errors = ErrorCollector::new();
        let decoded =
            validate_settings_bytes(&settings.encode_to_vec(), Some(&sizes(&[2])), &mut errors)
                .unwrap();
        assert_eq!(decoded, settings);

        let mut errors = ErrorCollector::new();
        assert!(validate_settings_bytes(&[0x0a, 0x05, 0x01], None, &mut errors).is_none());
        assert_eq!(errors.error_count_of(ErrorType::SettingsParsing), 1);
    }

    #[test]
    fn empty_settings_warns_about_loading_index() {
        let mut errors = ErrorCollector::new();
        validate_settings_text("", Some(&sizes(&[5, 10])), &mut errors);
        assert_eq!(errors.warning_count_of(ErrorType::LoadingAnnotationIndexMissing), 1);
        assert_eq!(errors.warning_count(), 1);
    }

    #[test]
    fn base_uri_api_key_and_timeouts_invalid() {
        let settings = Settings {
            histograms: vec![Histogram::default()],
            base_uri: Some("not-a-uri*&".to_string()),
            initial_request_timeout_ms: Some(-1),
            ultimate_request_timeout_ms: Some(-1),
            ..aggregation(&[5, 10], Some(100))
        };
        let mut errors = ErrorCollector::new();
        validate_settings(&settings, Some(&sizes(&[5, 10])), &mut errors);
        assert_eq!(errors.error_count_of(ErrorType::BaseUriNotUrl), 1);
        assert_eq!(errors.error_count_of(ErrorType::ApiKeyMissing), 1);
        assert_eq!(errors.error_count_of(ErrorType::ApiKeyInvalid), 0);
        assert_eq!(errors.error_count_of(ErrorType::InitialRequestTimeoutInvalid), 1);
        assert_eq!(errors.error_count_of(ErrorType::UltimateRequestTimeoutInvalid), 1);
    }

    #[test]
    fn placeholder_api_key_is_invalid() {
        let mut settings = Settings {
            api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            ..Default::default()
        };
        let mut errors = ErrorCollector::new();
        validate_api_key(&settings, &mut errors);
        assert_eq!(errors.error_count_of(ErrorType::ApiKeyInvalid), 1);
        assert_eq!(errors.error_count(), 1);

        settings.api_key = Some("real-key".to_string());
        let mut errors = ErrorCollector::new();
        validate_api_key(&settings, &mut errors);
        assert_eq!(errors.error_count(), 0);
    }

    #[test]
    fn base_uri_needs_a_host() {
        let check = |uri: &str| {
            let settings = Settings {
                base_uri: Some(uri.to_string()),
                ..Default::default()
            };
            let mut errors = ErrorCollector::new();
            validate_base_uri(&settings, &mut errors);
            errors.error_count_of(ErrorType::BaseUriNotUrl)
        };
        assert_eq!(check("https://performanceparameters.googleapis.com/v1/"), 0);
        assert_eq!(check("http://localhost:8080"), 0);
        assert_eq!(check("mailto:someone@example.com"), 1);
        assert_eq!(check(""), 1);
    }

    #[test]
    fn zero_timeouts_are_valid() {
        let settings = Settings {
            initial_request_timeout_ms: Some(0),
            ultimate_request_timeout_ms: Some(0),
            ..Default::default()
        };
        let mut errors = ErrorCollector::new();
        validate_request_timeouts(&settings, &mut errors);
        assert_eq!(errors.error_count(), 0);
    }
}
