//! # Live `protoc` Tests
//!
//! Runs [`ExternalProtoCompiler`] against a real `protoc` and checks that
//! the in-process codec agrees with it byte for byte.
//!
//! The compiler is taken from `$PROTOC`, else from `PATH`. When neither
//! works the tests return early without asserting anything.

use std::fs;
use std::path::{Path, PathBuf};

use tuningfork_schema::{
    CompilationError, DynamicRecord, ExternalProtoCompiler, FieldType, SchemaCompiler, Settings,
};

const DEV_TUNINGFORK_PROTO: &str = r#"
syntax = "proto2";

package com.google.tuningfork;

enum LoadingState {
  LOADING_INVALID = 0;
  NOT_LOADING = 1;
  LOADING = 2;
}

enum QualitySettings {
  UNKNOWN = 0;
  FASTEST = 1;
  FAST = 2;
  SIMPLE = 3;
  GOOD = 4;
  BEAUTIFUL = 5;
  FANTASTIC = 6;
}

message Annotation {
  optional LoadingState loading = 1;
}

message FidelityParams {
  optional QualitySettings quality_settings = 1;
  optional int32 int_field = 2;
  optional float float_field = 3 [default = 2.5];
}
"#;

const SETTINGS_PROTO: &str = r#"
syntax = "proto2";

package com.google.tuningfork;

message Settings {
  message AggregationStrategy {
    enum Submission {
      UNDEFINED = 0;
      TIME_BASED = 1;
      TICK_BASED = 2;
    }
    optional Submission method = 1;
    optional int32 intervalms_or_count = 2;
    optional int32 max_instrumentation_keys = 3;
    repeated int32 annotation_enum_size = 4 [packed = false];
  }
  message Histogram {
    optional int32 instrument_key = 1;
    optional float bucket_min = 2;
    optional float bucket_max = 3;
    optional int32 n_buckets = 4;
  }
  optional AggregationStrategy aggregation_strategy = 1;
  repeated Histogram histograms = 2;
  optional string base_uri = 3;
  optional string api_key = 4;
  optional string default_fidelity_parameters_filename = 5;
  optional int32 initial_request_timeout_ms = 6;
  optional int32 ultimate_request_timeout_ms = 7;
  optional int32 loading_annotation_index = 8;
  optional int32 level_annotation_index = 9;
}
"#;

/// Locate a working `protoc`, or `None` to skip.
fn protoc() -> Option<PathBuf> {
    let program = std::env::var_os("PROTOC")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("protoc"));
    let output = std::process::Command::new(&program)
        .arg("--version")
        .output()
        .ok()?;
    output.status.success().then_some(program)
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn compiles_dev_tuningfork_proto() {
    let Some(program) = protoc() else {
        eprintln!("protoc not available, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let proto = write(dir.path(), "dev_tuningfork.proto", DEV_TUNINGFORK_PROTO);
    let descriptor_file = dir.path().join("dev_tuningfork.descriptor");

    let compiler = ExternalProtoCompiler::new(program);
    let schema = compiler.compile(&proto, Some(&descriptor_file)).unwrap();

    assert_eq!(schema.package(), "com.google.tuningfork");
    let annotation = schema.find_message("Annotation").unwrap();
    assert_eq!(annotation.fields[0].field_type, FieldType::Enum);
    assert_eq!(annotation.fields[0].enum_type.as_ref().unwrap().values.len(), 3);
    let fidelity = schema.find_message("FidelityParams").unwrap();
    assert_eq!(fidelity.fields.len(), 3);
    assert_eq!(fidelity.fields[2].default_value.as_deref(), Some("2.5"));
    assert!(descriptor_file.is_file());
}

#[test]
fn invalid_proto_is_process_failed() {
    let Some(program) = protoc() else {
        eprintln!("protoc not available, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let proto = write(dir.path(), "compile_invalid.proto", "message {");
    let descriptor_file = dir.path().join("compile_invalid.descriptor");

    let err = ExternalProtoCompiler::new(program)
        .compile(&proto, Some(&descriptor_file))
        .unwrap_err();
    match err {
        CompilationError::ProcessFailed { code, stderr } => {
            assert_ne!(code, 0);
            assert!(stderr.contains("compile_invalid.proto"), "{stderr}");
        }
        other => panic!("expected ProcessFailed, got {other:?}"),
    }
    assert!(!descriptor_file.exists());
}

#[test]
fn protoc_and_dynamic_record_encode_identically() {
    let Some(program) = protoc() else {
        eprintln!("protoc not available, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let proto = write(dir.path(), "dev_tuningfork.proto", DEV_TUNINGFORK_PROTO);
    let text = "quality_settings: FAST\nint_field: -10\nfloat_field: 1.5\n";
    let text_file = write(dir.path(), "dev_tuningfork_fidelityparams_1.txt", text);
    let bin_file = dir.path().join("dev_tuningfork_fidelityparams_1.bin");

    let compiler = ExternalProtoCompiler::new(program);
    let schema = compiler.compile(&proto, None).unwrap();
    compiler
        .encode_from_text_file(
            "com.google.tuningfork.FidelityParams",
            &proto,
            &text_file,
            &bin_file,
            None,
        )
        .unwrap();

    let fidelity = schema.find_message("FidelityParams").unwrap();
    let ours = DynamicRecord::from_text(fidelity, text).unwrap();
    assert_eq!(fs::read(&bin_file).unwrap(), ours.encode());

    let back = dir.path().join("back.txt");
    compiler
        .decode_to_text_file(
            "com.google.tuningfork.FidelityParams",
            &proto,
            &back,
            &bin_file,
            None,
        )
        .unwrap();
    let decoded = DynamicRecord::from_text(fidelity, &fs::read_to_string(&back).unwrap()).unwrap();
    assert_eq!(decoded, ours);
}

#[test]
fn encode_failure_is_process_failed_with_error_file() {
    let Some(program) = protoc() else {
        eprintln!("protoc not available, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let proto = write(dir.path(), "dev_tuningfork.proto", DEV_TUNINGFORK_PROTO);
    let text_file = write(dir.path(), "bad.txt", "no_such_field: 1\n");
    let error_file = dir.path().join("errors.txt");

    let err = ExternalProtoCompiler::new(program)
        .encode_from_text_file(
            "com.google.tuningfork.FidelityParams",
            &proto,
            &text_file,
            &dir.path().join("bad.bin"),
            Some(&error_file),
        )
        .unwrap_err();
    assert!(matches!(err, CompilationError::ProcessFailed { .. }));
    assert!(!fs::read_to_string(&error_file).unwrap().is_empty());
}

#[test]
fn settings_message_matches_protoc_encoding() {
    let Some(program) = protoc() else {
        eprintln!("protoc not available, skipping");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let proto = write(dir.path(), "tuningfork.proto", SETTINGS_PROTO);
    let text = r#"
        aggregation_strategy {
          method: TIME_BASED
          intervalms_or_count: 600000
          max_instrumentation_keys: 2
          annotation_enum_size: 3
          annotation_enum_size: 7
        }
        histograms { instrument_key: 0 bucket_min: 6.54 bucket_max: 60 n_buckets: 30 }
        api_key: "key"
        loading_annotation_index: 1
    "#;
    let text_file = write(dir.path(), "tuningfork_settings.txt", text);
    let bin_file = dir.path().join("tuningfork_settings.bin");

    ExternalProtoCompiler::new(program)
        .encode_from_text_file(
            "com.google.tuningfork.Settings",
            &proto,
            &text_file,
            &bin_file,
            None,
        )
        .unwrap();

    let ours = prost::Message::encode_to_vec(&Settings::from_text(text).unwrap());
    assert_eq!(fs::read(&bin_file).unwrap(), ours);
}
