//! # Error Taxonomy
//!
//! Validation and parse errors. Some of these are shared between the
//! developer-folder validation and the packaged-artifact validation.
//!
//! The taxonomy is closed and flat: a diagnostic is exactly one
//! [`ErrorType`], and each type is pinned to one [`ErrorGroup`].

use std::fmt;

use serde::Serialize;

/// Validation group of an [`ErrorType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorGroup {
    /// The `Annotation` message of the schema.
    Annotation,
    /// The `FidelityParams` message of the schema.
    Fidelity,
    /// The family of developer fidelity-parameter records.
    DevFidelity,
    /// The settings record.
    Settings,
}

impl ErrorGroup {
    /// Returns the canonical upper-case name of the group.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annotation => "ANNOTATION",
            Self::Fidelity => "FIDELITY",
            Self::DevFidelity => "DEV_FIDELITY",
            Self::Settings => "SETTINGS",
        }
    }
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry of the diagnostic taxonomy.
///
/// Declaration order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Annotation message is missing from the schema.
    AnnotationEmpty,
    /// Annotation is too complex: oneofs, nested types or extensions.
    AnnotationComplex,
    /// Annotation may only contain enums.
    AnnotationType,
    /// FidelityParams message is missing from the schema.
    FidelityParamsEmpty,
    /// FidelityParams is too complex: oneofs, nested types or extensions.
    FidelityParamsComplex,
    /// FidelityParams may only contain float, int32 or enum fields.
    FidelityParamsType,
    /// No fidelity parameter records were supplied.
    DevFidelityParametersEmpty,
    /// A fidelity parameter record could not be decoded.
    DevFidelityParametersParsing,
    /// A fidelity parameter text record could not be encoded.
    DevFidelityParametersEncoding,
    /// A fidelity parameter binary could not be read back.
    DevFidelityParametersReading,
    /// Fidelity parameters are not in increasing or decreasing order.
    DevFidelityParametersOrder,
    /// Fidelity parameter enums should not hold zero values.
    DevFidelityParametersEnumsZero,
    /// The settings record could not be parsed.
    SettingsParsing,
    /// The settings record could not be found.
    SettingsMissing,
    /// No histogram specified in the settings.
    HistogramEmpty,
    /// A histogram has an invalid bucket count or bucket range.
    HistogramBucketInvalid,
    /// No aggregation strategy specified in the settings.
    AggregationEmpty,
    /// `max_instrumentation_keys` is missing or out of range.
    AggregationInstrumentationKey,
    /// `annotation_enum_size` disagrees with the Annotation schema.
    AggregationAnnotations,
    /// More than one packaged descriptor was found.
    TooManyDescriptors,
    /// No packaged descriptor was found.
    DescriptorMissing,
    /// The packaged descriptor could not be decoded.
    DescriptorParseError,
    /// `base_uri` is not a URL.
    BaseUriNotUrl,
    /// `api_key` still holds the sample placeholder.
    ApiKeyInvalid,
    /// `api_key` is missing.
    ApiKeyMissing,
    /// `initial_request_timeout_ms` is negative.
    InitialRequestTimeoutInvalid,
    /// `ultimate_request_timeout_ms` is negative.
    UltimateRequestTimeoutInvalid,
    /// `loading_annotation_index` is missing.
    LoadingAnnotationIndexMissing,
}

impl ErrorType {
    /// Every error type, in declaration order.
    pub const ALL: [ErrorType; 28] = [
        Self::AnnotationEmpty,
        Self::AnnotationComplex,
        Self::AnnotationType,
        Self::FidelityParamsEmpty,
        Self::FidelityParamsComplex,
        Self::FidelityParamsType,
        Self::DevFidelityParametersEmpty,
        Self::DevFidelityParametersParsing,
        Self::DevFidelityParametersEncoding,
        Self::DevFidelityParametersReading,
        Self::DevFidelityParametersOrder,
        Self::DevFidelityParametersEnumsZero,
        Self::SettingsParsing,
        Self::SettingsMissing,
        Self::HistogramEmpty,
        Self::HistogramBucketInvalid,
        Self::AggregationEmpty,
        Self::AggregationInstrumentationKey,
        Self::AggregationAnnotations,
        Self::TooManyDescriptors,
        Self::DescriptorMissing,
        Self::DescriptorParseError,
        Self::BaseUriNotUrl,
        Self::ApiKeyInvalid,
        Self::ApiKeyMissing,
        Self::InitialRequestTimeoutInvalid,
        Self::UltimateRequestTimeoutInvalid,
        Self::LoadingAnnotationIndexMissing,
    ];

    /// The group this error type is pinned to.
    pub fn group(&self) -> ErrorGroup {
        match self {
            Self::AnnotationEmpty | Self::AnnotationComplex | Self::AnnotationType => {
                ErrorGroup::Annotation
            }
            Self::FidelityParamsEmpty | Self::FidelityParamsComplex | Self::FidelityParamsType => {
                ErrorGroup::Fidelity
            }
            Self::DevFidelityParametersEmpty
            | Self::DevFidelityParametersParsing
            | Self::DevFidelityParametersEncoding
            | Self::DevFidelityParametersReading
            | Self::DevFidelityParametersOrder
            | Self::DevFidelityParametersEnumsZero
            | Self::TooManyDescriptors
            | Self::DescriptorMissing
            | Self::DescriptorParseError => ErrorGroup::DevFidelity,
            Self::SettingsParsing
            | Self::SettingsMissing
            | Self::HistogramEmpty
            | Self::HistogramBucketInvalid
            | Self::AggregationEmpty
            | Self::AggregationInstrumentationKey
            | Self::AggregationAnnotations
            | Self::BaseUriNotUrl
            | Self::ApiKeyInvalid
            | Self::ApiKeyMissing
            | Self::InitialRequestTimeoutInvalid
            | Self::UltimateRequestTimeoutInvalid
            | Self::LoadingAnnotationIndexMissing => ErrorGroup::Settings,
        }
    }

    /// Returns the canonical upper-case name, e.g. `"ANNOTATION_EMPTY"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnnotationEmpty => "ANNOTATION_EMPTY",
            Self::AnnotationComplex => "ANNOTATION_COMPLEX",
            Self::AnnotationType => "ANNOTATION_TYPE",
            Self::FidelityParamsEmpty => "FIDELITY_PARAMS_EMPTY",
            Self::FidelityParamsComplex => "FIDELITY_PARAMS_COMPLEX",
            Self::FidelityParamsType => "FIDELITY_PARAMS_TYPE",
            Self::DevFidelityParametersEmpty => "DEV_FIDELITY_PARAMETERS_EMPTY",
            Self::DevFidelityParametersParsing => "DEV_FIDELITY_PARAMETERS_PARSING",
            Self::DevFidelityParametersEncoding => "DEV_FIDELITY_PARAMETERS_ENCODING",
            Self::DevFidelityParametersReading => "DEV_FIDELITY_PARAMETERS_READING",
            Self::DevFidelityParametersOrder => "DEV_FIDELITY_PARAMETERS_ORDER",
            Self::DevFidelityParametersEnumsZero => "DEV_FIDELITY_PARAMETERS_ENUMS_ZERO",
            Self::SettingsParsing => "SETTINGS_PARSING",
            Self::SettingsMissing => "SETTINGS_MISSING",
            Self::HistogramEmpty => "HISTOGRAM_EMPTY",
            Self::HistogramBucketInvalid => "HISTOGRAM_BUCKET_INVALID",
            Self::AggregationEmpty => "AGGREGATION_EMPTY",
            Self::AggregationInstrumentationKey => "AGGREGATION_INSTRUMENTATION_KEY",
            Self::AggregationAnnotations => "AGGREGATION_ANNOTATIONS",
            Self::TooManyDescriptors => "TOO_MANY_DESCRIPTORS",
            Self::DescriptorMissing => "DESCRIPTOR_MISSING",
            Self::DescriptorParseError => "DESCRIPTOR_PARSE_ERROR",
            Self::BaseUriNotUrl => "BASE_URI_NOT_URL",
            Self::ApiKeyInvalid => "API_KEY_INVALID",
            Self::ApiKeyMissing => "API_KEY_MISSING",
            Self::InitialRequestTimeoutInvalid => "INITIAL_REQUEST_TIMEOUT_INVALID",
            Self::UltimateRequestTimeoutInvalid => "ULTIMATE_REQUEST_TIMEOUT_INVALID",
            Self::LoadingAnnotationIndexMissing => "LOADING_ANNOTATION_INDEX_MISSING",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
