//! # Settings Message
//!
//! `com.google.tuningfork.Settings`, the proto2 message behind
//! `tuningfork_settings.txt`. The layout is fixed by the runtime library,
//! so the message is a static `prost` type rather than a dynamic record.

use crate::error::TextFormatError;
use crate::text_format::{self, TextField, TextMessage, TextWriter};

/// How telemetry is submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Submission {
    Undefined = 0,
    TimeBased = 1,
    TickBased = 2,
}

impl Submission {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Undefined => "UNDEFINED",
            Self::TimeBased => "TIME_BASED",
            Self::TickBased => "TICK_BASED",
        }
    }

    pub fn from_str_name(name: &str) -> Option<Self> {
        match name {
            "UNDEFINED" => Some(Self::Undefined),
            "TIME_BASED" => Some(Self::TimeBased),
            "TICK_BASED" => Some(Self::TickBased),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AggregationStrategy {
    #[prost(enumeration = "Submission", optional, tag = "1")]
    pub method: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub intervalms_or_count: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub max_instrumentation_keys: Option<i32>,
    /// Number of values of each Annotation enum, in field order.
    #[prost(int32, repeated, packed = "false", tag = "4")]
    pub annotation_enum_size: Vec<i32>,
}

/// Frame-time histogram, bucket bounds in milliseconds.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Histogram {
    #[prost(int32, optional, tag = "1")]
    pub instrument_key: Option<i32>,
    #[prost(float, optional, tag = "2")]
    pub bucket_min: Option<f32>,
    #[prost(float, optional, tag = "3")]
    pub bucket_max: Option<f32>,
    #[prost(int32, optional, tag = "4")]
    pub n_buckets: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Settings {
    #[prost(message, optional, tag = "1")]
    pub aggregation_strategy: Option<AggregationStrategy>,
    #[prost(message, repeated, tag = "2")]
    pub histograms: Vec<Histogram>,
    #[prost(string, optional, tag = "3")]
    pub base_uri: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub api_key: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub default_fidelity_parameters_filename: Option<String>,
    #[prost(int32, optional, tag = "6")]
    pub initial_request_timeout_ms: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub ultimate_request_timeout_ms: Option<i32>,
    #[prost(int32, optional, tag = "8")]
    pub loading_annotation_index: Option<i32>,
    #[prost(int32, optional, tag = "9")]
    pub level_annotation_index: Option<i32>,
}

fn unknown_field(entry: &TextField, message: &str) -> TextFormatError {
    entry.error(format!(
        "message \"com.google.tuningfork.{message}\" has no field named \"{}\"",
        entry.name
    ))
}

impl Settings {
    /// Parse the text-format settings record.
    ///
    /// Unknown fields are errors. A singular field given twice keeps the
    /// last value; a singular message given twice is merged.
    pub fn from_text(text: &str) -> Result<Self, TextFormatError> {
        let message = text_format::parse(text)?;
        let mut settings = Settings::default();
        for entry in &message.fields {
            match entry.name.as_str() {
                "aggregation_strategy" => {
                    let strategy = settings
                        .aggregation_strategy
                        .get_or_insert_with(AggregationStrategy::default);
                    strategy.merge_text(entry.as_message()?)?;
                }
                "histograms" => {
                    let mut histogram = Histogram::default();
                    histogram.merge_text(entry.as_message()?)?;
                    settings.histograms.push(histogram);
                }
                "base_uri" => settings.base_uri = Some(entry.as_string()?),
                "api_key" => settings.api_key = Some(entry.as_string()?),
                "default_fidelity_parameters_filename" => {
                    settings.default_fidelity_parameters_filename = Some(entry.as_string()?)
                }
                "initial_request_timeout_ms" => {
                    settings.initial_request_timeout_ms = Some(entry.as_i32()?)
                }
                "ultimate_request_timeout_ms" => {
                    settings.ultimate_request_timeout_ms = Some(entry.as_i32()?)
                }
                "loading_annotation_index" => {
                    settings.loading_annotation_index = Some(entry.as_i32()?)
                }
                "level_annotation_index" => settings.level_annotation_index = Some(entry.as_i32()?),
                _ => return Err(unknown_field(entry, "Settings")),
            }
        }
        Ok(settings)
    }

    /// Render in text format.
    pub fn to_text(&self) -> String {
        let mut w = TextWriter::new();
        if let Some(strategy) = &self.aggregation_strategy {
            w.begin("aggregation_strategy");
            if let Some(method) = strategy.method {
                match Submission::try_from(method) {
                    Ok(known) => w.scalar("method", known.as_str_name()),
                    Err(_) => w.scalar("method", method),
                }
            }
            if let Some(v) = strategy.intervalms_or_count {
                w.scalar("intervalms_or_count", v);
            }
            if let Some(v) = strategy.max_instrumentation_keys {
                w.scalar("max_instrumentation_keys", v);
            }
            for size in &strategy.annotation_enum_size {
                w.scalar("annotation_enum_size", size);
            }
            w.end();
        }
        for histogram in &self.histograms {
            w.begin("histograms");
            if let Some(v) = histogram.instrument_key {
                w.scalar("instrument_key", v);
            }
            if let Some(v) = histogram.bucket_min {
                w.scalar("bucket_min", v);
            }
            if let Some(v) = histogram.bucket_max {
                w.scalar("bucket_max", v);
            }
            if let Some(v) = histogram.n_buckets {
                w.scalar("n_buckets", v);
            }
            w.end();
        }
        if let Some(v) = &self.base_uri {
            w.string("base_uri", v);
        }
        if let Some(v) = &self.api_key {
            w.string("api_key", v);
        }
        if let Some(v) = &self.default_fidelity_parameters_filename {
            w.string("default_fidelity_parameters_filename", v);
        }
        if let Some(v) = self.initial_request_timeout_ms {
            w.scalar("initial_request_timeout_ms", v);
        }
        if let Some(v) = self.ultimate_request_timeout_ms {
            w.scalar("ultimate_request_timeout_ms", v);
        }
        if let Some(v) = self.loading_annotation_index {
            w.scalar("loading_annotation_index", v);
        }
        if let Some(v) = self.level_annotation_index {
            w.scalar("level_annotation_index", v);
        }
        w.finish()
    }
}

impl AggregationStrategy {
    fn merge_text(&mut self, message: &TextMessage) -> Result<(), TextFormatError> {
        for entry in &message.fields {
            match entry.name.as_str() {
                "method" => {
                    let number = match Submission::from_str_name(&scalar_name(entry)) {
                        Some(known) => known as i32,
                        None => entry.as_i32().map_err(|_| {
                            entry.error(
                                "enum type \"com.google.tuningfork.Submission\" has no such value",
                            )
                        })?,
                    };
                    self.method = Some(number);
                }
                "intervalms_or_count" => self.intervalms_or_count = Some(entry.as_i32()?),
                "max_instrumentation_keys" => {
                    self.max_instrumentation_keys = Some(entry.as_i32()?)
                }
                "annotation_enum_size" => self.annotation_enum_size.push(entry.as_i32()?),
                _ => return Err(unknown_field(entry, "Settings.AggregationStrategy")),
            }
        }
        Ok(())
    }
}

impl Histogram {
    fn merge_text(&mut self, message: &TextMessage) -> Result<(), TextFormatError> {
        for entry in &message.fields {
            match entry.name.as_str() {
                "instrument_key" => self.instrument_key = Some(entry.as_i32()?),
                "bucket_min" => self.bucket_min = Some(entry.as_f32()?),
                "bucket_max" => self.bucket_max = Some(entry.as_f32()?),
                "n_buckets" => self.n_buckets = Some(entry.as_i32()?),
                _ => return Err(unknown_field(entry, "Settings.Histogram")),
            }
        }
        Ok(())
    }
}

/// Identifier text of a scalar entry, empty for anything else.
fn scalar_name(entry: &TextField) -> String {
    match &entry.value {
        text_format::TextValue::Scalar(text_format::Scalar::Identifier {
            negative: false,
            name,
        }) => name.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    const SAMPLE: &str = r#"
        aggregation_strategy {
          method: TIME_BASED
          intervalms_or_count: 600000
          max_instrumentation_keys: 2
          annotation_enum_size: [4, 2]
        }
        histograms {
          instrument_key: 0
          bucket_min: 10
          bucket_max: 40
          n_buckets: 30
        }
        base_uri: "https://performanceparameters.googleapis.com/v1/"
        api_key: "my-key"
        initial_request_timeout_ms: 1000
        ultimate_request_timeout_ms: 100000
        loading_annotation_index: 1
        level_annotation_index: 2
    "#;

    #[test]
    fn parses_every_field() {
        let settings = Settings::from_text(SAMPLE).unwrap();
        let strategy = settings.aggregation_strategy.as_ref().unwrap();
        assert_eq!(strategy.method, Some(Submission::TimeBased as i32));
        assert_eq!(strategy.intervalms_or_count, Some(600000));
        assert_eq!(strategy.max_instrumentation_keys, Some(2));
        assert_eq!(strategy.annotation_enum_size, vec![4, 2]);
        assert_eq!(settings.histograms.len(), 1);
        assert_eq!(settings.histograms[0].bucket_max, Some(40.0));
        assert_eq!(settings.api_key.as_deref(), Some("my-key"));
        assert_eq!(settings.loading_annotation_index, Some(1));
        assert_eq!(settings.level_annotation_index, Some(2));
    }

    #[test]
    fn text_and_wire_forms_agree() {
        let settings = Settings::from_text(SAMPLE).unwrap();
        let bytes = settings.encode_to_vec();
        assert_eq!(Settings::decode(bytes.as_slice()).unwrap(), settings);
        assert_eq!(Settings::from_text(&settings.to_text()).unwrap(), settings);
    }

    #[test]
    fn annotation_enum_size_is_not_packed() {
        let settings = Settings {
            aggregation_strategy: Some(AggregationStrategy {
                annotation_enum_size: vec![5, 10],
                ..Default::default()
            }),
            ..Default::default()
        };
        // outer field 1, length 4, then two separate tag-4 varints
        assert_eq!(
            settings.encode_to_vec(),
            vec![0x0a, 0x04, 0x20, 0x05, 0x20, 0x0a]
        );
    }

    #[test]
    fn presence_is_tracked() {
        let settings = Settings::from_text("api_key: \"\"").unwrap();
        assert_eq!(settings.api_key.as_deref(), Some(""));
        assert!(settings.base_uri.is_none());
        assert!(settings.aggregation_strategy.is_none());
    }

    #[test]
    fn repeated_singular_message_merges() {
        let settings = Settings::from_text(
            "aggregation_strategy { max_instrumentation_keys: 5 }\n\
             aggregation_strategy { annotation_enum_size: 3 }",
        )
        .unwrap();
        let strategy = settings.aggregation_strategy.unwrap();
        assert_eq!(strategy.max_instrumentation_keys, Some(5));
        assert_eq!(strategy.annotation_enum_size, vec![3]);
    }

    #[test]
    fn unknown_fields_and_bad_types_fail() {
        let err = Settings::from_text("no_such_field: 1").unwrap_err();
        assert!(err.message.contains("no field named \"no_such_field\""));
        assert!(Settings::from_text("histograms { bucket_min: \"ten\" }").is_err());
        assert!(Settings::from_text("aggregation_strategy { method: SOMETIMES }").is_err());
        assert!(Settings::from_text("api_key: 12").is_err());
    }

    #[test]
    fn numeric_method_is_accepted() {
        let settings = Settings::from_text("aggregation_strategy { method: 2 }").unwrap();
        assert_eq!(
            settings.aggregation_strategy.unwrap().method,
            Some(Submission::TickBased as i32)
        );
    }
}
