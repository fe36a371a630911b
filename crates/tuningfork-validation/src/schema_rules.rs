//! # Schema Rules
//!
//! Structural checks of the two distinguished messages of
//! `dev_tuningfork.proto`.
//!
//! Both checks reject oneofs, nested types and extensions, in that order,
//! with a single error for the first one found. They differ on field
//! types: `Annotation` gives up at the first non-enum field, while
//! `FidelityParams` reports every disallowed field.

use tuningfork_core::{ErrorCollector, ErrorType};
use tuningfork_schema::{FieldType, MessageSchema};

/// Number of values of each Annotation enum field, in declaration order.
///
/// Compared against `annotation_enum_size` of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumSizeVector(Vec<i32>);

impl EnumSizeVector {
    pub fn new(sizes: Vec<i32>) -> Self {
        Self(sizes)
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which of the two checked messages, for message wording.
#[derive(Clone, Copy)]
enum Checked {
    Annotation,
    FidelityParams,
}

impl Checked {
    fn name(self) -> &'static str {
        match self {
            Self::Annotation => "Annotation",
            Self::FidelityParams => "FidelityParams",
        }
    }

    fn complex(self) -> ErrorType {
        match self {
            Self::Annotation => ErrorType::AnnotationComplex,
            Self::FidelityParams => ErrorType::FidelityParamsComplex,
        }
    }
}

/// Record the first structural complexity found. Returns `true` if any.
fn is_complex(message: &MessageSchema, checked: Checked, errors: &mut ErrorCollector) -> bool {
    let found = if message.oneof_count > 0 {
        "has oneofs"
    } else if message.nested_type_count > 0 {
        "has nested types"
    } else if message.extension_count > 0 {
        "has extensions"
    } else {
        return false;
    };
    errors.add_error(
        checked.complex(),
        format!("{} too complex - {found}", checked.name()),
    );
    true
}

/// Validate the `Annotation` message and derive its enum sizes.
///
/// Returns `None` after recording an error when the message is absent,
/// complex, or has a field that is not an enum.
pub fn validate_annotation(
    annotation: Option<&MessageSchema>,
    errors: &mut ErrorCollector,
) -> Option<EnumSizeVector> {
    let Some(annotation) = annotation else {
        errors.add_error(
            ErrorType::AnnotationEmpty,
            "Annotation descriptor does not exist",
        );
        return None;
    };
    if is_complex(annotation, Checked::Annotation, errors) {
        return None;
    }

    let mut sizes = Vec::with_capacity(annotation.fields.len());
    for field in &annotation.fields {
        if field.field_type != FieldType::Enum {
            errors.add_error(
                ErrorType::AnnotationType,
                format!(
                    "Annotation can only contain enums, but contains {} field with type {}",
                    field.name, field.field_type
                ),
            );
            return None;
        }
        let size = field.enum_type.as_ref().map_or(0, |e| e.values.len());
        sizes.push(i32::try_from(size).unwrap_or(i32::MAX));
    }
    Some(EnumSizeVector(sizes))
}

/// Validate the `FidelityParams` message. Every field must be `enum`,
/// `float` or `int32`; each offending field is its own error.
pub fn validate_fidelity_params(fidelity: Option<&MessageSchema>, errors: &mut ErrorCollector) {
    let Some(fidelity) = fidelity else {
        errors.add_error(
            ErrorType::FidelityParamsEmpty,
            "FidelityParams descriptor does not exist",
        );
        return;
    };
    if is_complex(fidelity, Checked::FidelityParams, errors) {
        return;
    }

    for field in &fidelity.fields {
        if !matches!(
            field.field_type,
            FieldType::Enum | FieldType::Float | FieldType::Int32
        ) {
            errors.add_error(
                ErrorType::FidelityParamsType,
                format!(
                    "FidelityParams can only be of type FLOAT, INT32 or ENUM, {} field has type {}",
                    field.name, field.field_type
                ),
            );
        }
    }
}
