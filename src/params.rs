use serde_json::{Number, Value as JsonValue};

use crate::error::{ConversionError, SqlMiddlewareDbError};
use crate::types::RowValues;

/// Positional parameters in the form the remote service binds them.
///
/// The service speaks SQLite's storage classes only, so booleans travel as `1`/`0` and
/// timestamps as Unix seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(pub Vec<RowValues>);

fn normalize_value(value: &RowValues) -> RowValues {
    match value {
        RowValues::Bool(b) => RowValues::Int(i64::from(*b)),
        RowValues::Timestamp(dt) => RowValues::Int(dt.timestamp()),
        other => other.clone(),
    }
}

fn row_value_to_json(value: &RowValues) -> Result<JsonValue, SqlMiddlewareDbError> {
    Ok(match value {
        RowValues::Null => JsonValue::Null,
        RowValues::Int(i) => JsonValue::from(*i),
        RowValues::UInt(u) => JsonValue::from(*u),
        RowValues::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .ok_or_else(|| ConversionError::new::<JsonValue>(value))?,
        RowValues::Bool(b) => JsonValue::from(i64::from(*b)),
        RowValues::Text(s) => JsonValue::String(s.clone()),
        RowValues::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        RowValues::Timestamp(dt) => JsonValue::from(dt.timestamp()),
    })
}

impl Params {
    /// Normalize caller values for binding.
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Self {
        Params(params.iter().map(normalize_value).collect())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[RowValues] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<RowValues> {
        self.0
    }

    /// Render the wire array.
    ///
    /// # Errors
    ///
    /// Returns a conversion error for non-finite floats, which JSON cannot carry.
    pub fn to_json(&self) -> Result<Vec<JsonValue>, SqlMiddlewareDbError> {
        to_json_params(&self.0)
    }
}

/// Encode positional parameters as the JSON array the remote service expects.
///
/// Blobs become arrays of byte values.
///
/// # Errors
///
/// Returns a conversion error for non-finite floats.
pub fn to_json_params(params: &[RowValues]) -> Result<Vec<JsonValue>, SqlMiddlewareDbError> {
    params.iter().map(row_value_to_json).collect()
}
