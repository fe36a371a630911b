//! Shared fixtures: a compiled `dev_tuningfork.proto` built by hand and
//! helpers that lay out a developer folder.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet,
};
use tuningfork_schema::CannedCompiler;

pub const DEV_TUNINGFORK_PROTO: &str = r#"syntax = "proto2";
package com.google.tuningfork;
enum LoadingState { LOADING_INVALID = 0; NOT_LOADING = 1; LOADING = 2; }
enum QualitySettings { UNKNOWN = 0; FASTEST = 1; FAST = 2; SIMPLE = 3; GOOD = 4; BEAUTIFUL = 5; FANTASTIC = 6; }
message Annotation { optional LoadingState loading = 1; }
message FidelityParams {
  optional QualitySettings quality_settings = 1;
  optional int32 int_field = 2;
  optional float float_field = 3;
}
"#;

pub const VALID_SETTINGS: &str = r#"
aggregation_strategy {
  method: TIME_BASED
  intervalms_or_count: 600000
  max_instrumentation_keys: 5
  annotation_enum_size: [3]
}
histograms { instrument_key: 0 bucket_min: 10 bucket_max: 40 n_buckets: 30 }
base_uri: "https://performanceparameters.googleapis.com/v1/"
api_key: "test-api-key"
loading_annotation_index: 1
"#;

fn enum_type(name: &str, values: &[&str]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .zip(0..)
            .map(|(value, number)| EnumValueDescriptorProto {
                name: Some(value.to_string()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn field(name: &str, number: i32, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        ..Default::default()
    }
}

/// The set `protoc` produces for [`DEV_TUNINGFORK_PROTO`].
pub fn descriptor_set() -> FileDescriptorSet {
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("dev_tuningfork.proto".to_string()),
            package: Some("com.google.tuningfork".to_string()),
            syntax: Some("proto2".to_string()),
            enum_type: vec![
                enum_type("LoadingState", &["LOADING_INVALID", "NOT_LOADING", "LOADING"]),
                enum_type(
                    "QualitySettings",
                    &[
                        "UNKNOWN",
                        "FASTEST",
                        "FAST",
                        "SIMPLE",
                        "GOOD",
                        "BEAUTIFUL",
                        "FANTASTIC",
                    ],
                ),
            ],
            message_type: vec![
                DescriptorProto {
                    name: Some("Annotation".to_string()),
                    field: vec![field(
                        "loading",
                        1,
                        Type::Enum,
                        Some(".com.google.tuningfork.LoadingState"),
                    )],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("FidelityParams".to_string()),
                    field: vec![
                        field(
                            "quality_settings",
                            1,
                            Type::Enum,
                            Some(".com.google.tuningfork.QualitySettings"),
                        ),
                        field("int_field", 2, Type::Int32, None),
                        field("float_field", 3, Type::Float, None),
                    ],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
    }
}

pub fn compiler() -> CannedCompiler {
    CannedCompiler::new(descriptor_set())
}

pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

pub fn fidelity_text(quality: &str, int_field: i32, float_field: f32) -> String {
    format!("quality_settings: {quality}\nint_field: {int_field}\nfloat_field: {float_field}\n")
}

/// Schema, valid settings and three ordered fidelity files.
pub fn valid_folder(dir: &Path) {
    write(dir, "dev_tuningfork.proto", DEV_TUNINGFORK_PROTO);
    write(dir, "tuningfork_settings.txt", VALID_SETTINGS);
    write(
        dir,
        "dev_tuningfork_fidelityparams_1.txt",
        &fidelity_text("FAST", 10, 1.2),
    );
    write(
        dir,
        "dev_tuningfork_fidelityparams_2.txt",
        &fidelity_text("SIMPLE", 9, 1.24),
    );
    write(
        dir,
        "dev_tuningfork_fidelityparams_3.txt",
        &fidelity_text("GOOD", 8, 1.29),
    );
}
