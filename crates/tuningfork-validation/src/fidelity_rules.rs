//! # Fidelity Parameter Family Rules
//!
//! Checks over the ordered family of developer fidelity-parameter records.
//!
//! Unset fields take part with their schema default. Only fields with a
//! numeric reading (`enum`, `int32`, `float`) are considered, and values
//! are compared as 32-bit floats.

use tuningfork_core::{ErrorCollector, ErrorType};
use tuningfork_schema::{DynamicRecord, FieldSchema, FieldType, FieldValue, MessageSchema};

/// Decode one binary record. `None` after recording a parse error.
pub fn decode_fidelity_params(
    bytes: &[u8],
    schema: &MessageSchema,
    errors: &mut ErrorCollector,
) -> Option<DynamicRecord> {
    match DynamicRecord::decode(schema, bytes) {
        Ok(record) => Some(record),
        Err(e) => {
            errors.add_error(
                ErrorType::DevFidelityParametersParsing,
                format!("Fidelity parameters not parsed properly: {e}"),
            );
            None
        }
    }
}

/// Decode every record of the family.
///
/// An empty family is an error and yields `None`. Records that fail to
/// decode are reported one by one and left out of the result.
pub fn validate_dev_fidelity_params<B: AsRef<[u8]>>(
    contents: &[B],
    schema: &MessageSchema,
    errors: &mut ErrorCollector,
) -> Option<Vec<DynamicRecord>> {
    if contents.is_empty() {
        errors.add_error(
            ErrorType::DevFidelityParametersEmpty,
            "Fidelity parameters list is empty",
        );
        return None;
    }
    Some(
        contents
            .iter()
            .filter_map(|bytes| decode_fidelity_params(bytes.as_ref(), schema, errors))
            .collect(),
    )
}

fn numeric_fields(schema: &MessageSchema) -> impl Iterator<Item = &FieldSchema> {
    schema.fields.iter().filter(|f| {
        !f.is_repeated()
            && matches!(
                f.field_type,
                FieldType::Enum | FieldType::Int32 | FieldType::Float
            )
    })
}

/// Warn once if any enum field of any record holds the value 0.
pub fn validate_dev_fidelity_params_zero(
    schema: &MessageSchema,
    records: &[DynamicRecord],
    errors: &mut ErrorCollector,
) {
    let zero_field = numeric_fields(schema)
        .filter(|f| f.field_type == FieldType::Enum)
        .find(|field| {
            records
                .iter()
                .any(|record| record.value(field) == Some(FieldValue::Enum(0)))
        });
    if let Some(field) = zero_field {
        errors.add_warning(
            ErrorType::DevFidelityParametersEnumsZero,
            format!(
                "Fidelity parameter enums should not use value 0, but {} does",
                field.name
            ),
        );
    }
}

/// Warn once if some field is neither non-decreasing nor non-increasing
/// across the family.
pub fn validate_dev_fidelity_params_order(
    schema: &MessageSchema,
    records: &[DynamicRecord],
    errors: &mut ErrorCollector,
) {
    let mut total = 0usize;
    let mut increasing = 0usize;
    let mut decreasing = 0usize;
    let mut constant = 0usize;
    let mut unordered = Vec::new();

    for field in numeric_fields(schema) {
        let values: Vec<f32> = records
            .iter()
            .map(|r| r.value(field).map_or(0.0, |v| v.as_f32()))
            .collect();
        let pairs = || values.windows(2).map(|w| (w[0], w[1]));
        let inc = pairs().all(|(a, b)| a <= b);
        let dec = pairs().all(|(a, b)| a >= b);
        let eq = pairs().all(|(a, b)| a == b);

        total += 1;
        increasing += usize::from(inc);
        decreasing += usize::from(dec);
        constant += usize::from(eq);
        if !inc && !dec {
            unordered.push(field.name.as_str());
        }
    }

    if increasing + decreasing - constant != total {
        errors.add_warning(
            ErrorType::DevFidelityParametersOrder,
            format!(
                "Fidelity parameters should be in either increasing or decreasing order, \
                 unordered fields: {}",
                unordered.join(", ")
            ),
        );
    }
}

/// Zero-enum and order checks over an already decoded family.
pub fn validate_family(
    schema: &MessageSchema,
    records: &[DynamicRecord],
    errors: &mut ErrorCollector,
) {
    validate_dev_fidelity_params_zero(schema, records, errors);
    validate_dev_fidelity_params_order(schema, records, errors);
}
