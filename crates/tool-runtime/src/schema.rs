//! Structural argument validation against an [`InputSchema`].
//!
//! Checks two things only: required properties are present, and present
//! declared properties carry the declared primitive type. Properties the
//! schema does not declare are ignored.

use serde::Serialize;
use serde_json::Value;

use crate::tool::{Arguments, InputSchema, PrimitiveType};

/// One property whose value has the wrong primitive type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMismatch {
    pub property: String,
    pub expected: PrimitiveType,
    pub actual: &'static str,
}

/// Every violation found in one argument mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("invalid arguments: {}", self.describe())]
pub struct SchemaError {
    /// Required properties absent from the arguments, in schema order.
    pub missing_required: Vec<String>,
    /// Declared properties whose value has the wrong type, in schema order.
    pub type_mismatches: Vec<TypeMismatch>,
}

impl SchemaError {
    pub fn is_empty(&self) -> bool {
        self.missing_required.is_empty() && self.type_mismatches.is_empty()
    }

    /// Names of every offending property: missing first, then mistyped.
    pub fn fields(&self) -> Vec<&str> {
        self.missing_required
            .iter()
            .map(String::as_str)
            .chain(self.type_mismatches.iter().map(|m| m.property.as_str()))
            .collect()
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_required.is_empty() {
            parts.push(format!("missing required: {}", self.missing_required.join(", ")));
        }
        for m in &self.type_mismatches {
            parts.push(format!("'{}' expected {}, got {}", m.property, m.expected, m.actual));
        }
        parts.join("; ")
    }
}


/// Validate `arguments` against `schema`.
pub fn validate(schema: &InputSchema, arguments: &Arguments) -> Result<(), SchemaError> {
    let mut error = SchemaError::default();

    for name in &schema.required {
        match arguments.get(name) {
            None => error.missing_required.push(name.clone()),
            // An explicit null only satisfies a property declared as null.
            Some(Value::Null)
                if schema
                    .properties
                    .get(name)
                    .is_some_and(|p| p.property_type != PrimitiveType::Null) =>
            {
                error.missing_required.push(name.clone())
            }
            Some(_) => {}
        }
    }

    for (name, property) in &schema.properties {
        if error.missing_required.contains(name) {
            continue;
        }
        if let Some(value) = arguments.get(name) {
            if !property.property_type.matches(value) {
                error.type_mismatches.push(TypeMismatch {
                    property: name.clone(),
                    expected: property.property_type,
                    actual: PrimitiveType::name_of(value),
                });
            }
        }
    }

    if error.is_empty() {
        Ok(())
    } else {
        Err(error)
    }
}
