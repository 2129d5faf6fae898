//! Declarative argument shapes and the validator that walks them.
//!
//! A [`Schema`] is an ordered list of [`Field`]s. Validation visits fields in
//! declaration order and stops at the first violation, so the reported error
//! is the same for a given schema and payload on every run.

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Accepted type of a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// A string restricted to a fixed set of literals.
    Enum(Vec<String>),
    Array(Box<FieldType>),
    Object(Schema),
}

impl FieldType {
    /// Enumeration of string literals.
    pub fn one_of<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Enum(literals.into_iter().map(Into::into).collect())
    }

    pub fn array_of(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    /// Human-readable description of what this type accepts.
    pub fn expected(&self) -> String {
        match self {
            FieldType::String => "string".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Number => "number".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Enum(literals) => format!("one of [{}]", literals.join(", ")),
            FieldType::Array(item) => format!("array of {}", item.expected()),
            FieldType::Object(_) => "object".to_string(),
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Enum(literals) => json!({ "type": "string", "enum": literals }),
            FieldType::Array(item) => json!({ "type": "array", "items": item.json_schema() }),
            FieldType::Object(schema) => schema.to_json_schema(),
        }
    }

    /// Check `value` against this type, returning the coerced value.
    fn check(&self, path: &str, value: &Value) -> Result<Value, ValidationError> {
        let mismatch = || ValidationError::new(path, self.expected(), value.clone());

        match self {
            FieldType::String => value.as_str().map(|_| value.clone()).ok_or_else(mismatch),
            FieldType::Integer => {
                if value.is_i64() || value.is_u64() {
                    return Ok(value.clone());
                }
                // Integral floats such as 3.0 are accepted as 3.
                match value.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(mismatch()),
                }
            }
            FieldType::Number => {
                if value.is_number() {
                    Ok(value.clone())
                } else {
                    Err(mismatch())
                }
            }
            FieldType::Boolean => value.as_bool().map(Value::Bool).ok_or_else(mismatch),
            FieldType::Enum(literals) => match value.as_str() {
                Some(s) if literals.iter().any(|l| l == s) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldType::Array(item) => {
                let items = value.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| item.check(&format!("{path}[{i}]"), v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldType::Object(schema) if value.is_object() => {
                schema.check_object(path, value).map(Value::Object)
            }
            FieldType::Object(_) => Err(mismatch()),
        }
    }
}

/// A named field within a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub required: bool,
    pub description: Option<String>,
}

impl Field {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Declarative shape of an argument object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Declaration order is validation order.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Validate a payload against this schema. See [`validate`].
    pub fn validate(&self, payload: &Value) -> Result<Map<String, Value>, ValidationError> {
        self.check_object("", payload)
    }

    /// Render the shape as a JSON Schema object.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut property = field.ty.json_schema();
            if let (Some(description), Some(obj)) = (&field.description, property.as_object_mut()) {
                obj.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            properties.insert(field.name.clone(), property);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }

    fn check_object(&self, path: &str, payload: &Value) -> Result<Map<String, Value>, ValidationError> {
        let empty = Map::new();
        let object = match payload {
            Value::Object(map) => map,
            // Only the root payload may be omitted entirely.
            Value::Null if path.is_empty() => &empty,
            other => {
                let here = if path.is_empty() { "$" } else { path };
                return Err(ValidationError::new(here, "object", other.clone()));
            }
        };

        let mut coerced = Map::new();
        for field in &self.fields {
            let field_path = if path.is_empty() {
                field.name.clone()
            } else {
                format!("{path}.{}", field.name)
            };

            match object.get(&field.name) {
                None if !field.required => continue,
                None => {
                    return Err(ValidationError::new(
                        field_path,
                        field.ty.expected(),
                        Value::Null,
                    ))
                }
                Some(value) => {
                    let checked = field.ty.check(&field_path, value)?;
                    coerced.insert(field.name.clone(), checked);
                }
            }
        }

        Ok(coerced)
    }
}

/// First violation found while validating a payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[error("invalid value at '{path}': expected {expected}, got {actual}")]
pub struct ValidationError {
    pub path: String,
    pub expected: String,
    pub actual: Value,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, actual: Value) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual,
        }
    }
}

/// Validate `payload` against `schema`.
///
/// Returns the payload restricted to the declared fields (unknown keys are
/// dropped, integral floats become integers). Absent optional fields are not
/// violations and stay absent. An explicit `null` never satisfies a field.
pub fn validate(schema: &Schema, payload: &Value) -> Result<Map<String, Value>, ValidationError> {
    schema.validate(payload)
}
