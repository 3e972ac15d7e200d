//! Typed structured fields attached to log records.

use opentelemetry::logs::AnyValue;
use serde_json::Value;

/// Value of a structured field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Text value.
    Str(String),
    /// Signed integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// Nested object.
    Object(Vec<Field>),
}

impl FieldValue {
    /// Renders the value as JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(i) => Value::from(*i),
            Self::Bool(b) => Value::Bool(*b),
            Self::Object(fields) => fields_to_json(fields),
        }
    }

    /// Converts the value for an exported OpenTelemetry record.
    ///
    /// Nested objects are exported as their JSON text.
    #[must_use]
    pub fn to_any_value(&self) -> AnyValue {
        match self {
            Self::Str(s) => AnyValue::from(s.clone()),
            Self::Int(i) => AnyValue::from(*i),
            Self::Bool(b) => AnyValue::from(*b),
            Self::Object(_) => AnyValue::from(self.to_json().to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A keyed structured value.
///
/// # Example
///
/// ```
/// use tracelink::logging::Field;
///
/// let fields = [
///     Field::new("user", "ada"),
///     Field::new("attempt", 3_i64),
///     Field::object("client", vec![Field::new("retry", true)]),
/// ];
/// assert_eq!(fields[1].value.to_json(), serde_json::json!(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field name.
    pub key: String,
    /// Field value.
    pub value: FieldValue,
}

impl Field {
    /// Creates a field from any supported value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a nested object field.
    #[must_use]
    pub fn object(key: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            key: key.into(),
            value: FieldValue::Object(fields),
        }
    }
}

/// Renders a field list as a JSON object. Later keys win on duplicates.
#[must_use]
pub fn fields_to_json(fields: &[Field]) -> Value {
    let map = fields
        .iter()
        .map(|f| (f.key.clone(), f.value.to_json()))
        .collect::<serde_json::Map<_, _>>();
    Value::Object(map)
}
