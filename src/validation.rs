use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::container::{Container, ContainerError};
use crate::exception::Exception;

/// Pipeline stages a validator list can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationStage {
    Params,
    Payload,
    Queries,
    Response,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStage::Params => write!(f, "params"),
            ValidationStage::Payload => write!(f, "payload"),
            ValidationStage::Queries => write!(f, "queries"),
            ValidationStage::Response => write!(f, "response"),
        }
    }
}

/// A single violated rule on a property.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Constraint {
    pub name: String,
    pub message: String,
}

/// Structured error for one invalid property: the property name, the
/// offending value, and every violated constraint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub property: String,
    pub value: Value,
    pub constraints: Vec<Constraint>,
}

impl FieldError {
    #[must_use]
    pub fn new(property: impl Into<String>, value: Value) -> Self {
        Self {
            property: property.into(),
            value,
            constraints: Vec::new(),
        }
    }

    #[must_use]
    pub fn constraint(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.constraints.push(Constraint {
            name: name.into(),
            message: message.into(),
        });
        self
    }
}

/// Black-box rule checker run against one stage's data.
///
/// The pipeline treats validation as an opaque call returning a list of field
/// errors; an empty list means the data passed.
pub trait Validator: Send + Sync {
    fn validate(&self, data: &Value) -> Vec<FieldError>;
}

/// Container-resolvable reference to a validator type attached to a route.
#[derive(Clone)]
pub struct ValidatorRef {
    pub type_name: &'static str,
    resolve: Arc<dyn Fn(&Container) -> Result<Arc<dyn Validator>, ContainerError> + Send + Sync>,
}

impl ValidatorRef {
    #[must_use]
    pub fn of<V: Validator + Send + Sync + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<V>(),
            resolve: Arc::new(|container| {
                container
                    .resolve::<V>()
                    .map(|instance| instance as Arc<dyn Validator>)
            }),
        }
    }

    pub fn resolve(&self, container: &Container) -> Result<Arc<dyn Validator>, ContainerError> {
        (*self.resolve)(container)
    }
}

impl fmt::Debug for ValidatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRef")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Turn a non-empty field-error list into the 400 exception the mapper
/// renders: the first constraint's message is the human-readable summary, the
/// full structured list travels as `data.details`.
#[must_use]
pub fn validation_exception(stage: ValidationStage, errors: Vec<FieldError>) -> Exception {
    let summary = errors
        .first()
        .and_then(|e| e.constraints.first())
        .map(|c| c.message.clone())
        .unwrap_or_else(|| format!("{} validation failed", stage));
    let details = serde_json::to_value(&errors).unwrap_or(Value::Null);
    Exception::validation(summary, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_exception_uses_first_constraint_message() {
        let errors = vec![
            FieldError::new("name", json!("a"))
                .constraint("min_length", "name must be at least 3 characters")
                .constraint("pattern", "name must be alphabetic"),
            FieldError::new("age", json!(-1)).constraint("min", "age must be positive"),
        ];
        let exc = validation_exception(ValidationStage::Payload, errors);
        assert_eq!(exc.status, Some(400));
        assert_eq!(exc.message, "name must be at least 3 characters");

        let data = exc.data.unwrap();
        let details = data["details"].as_array().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0]["property"], "name");
        assert_eq!(details[0]["constraints"][0]["name"], "min_length");
        assert_eq!(details[1]["property"], "age");
    }

    #[test]
    fn test_empty_constraints_fall_back_to_stage_summary() {
        let errors = vec![FieldError::new("name", Value::Null)];
        let exc = validation_exception(ValidationStage::Queries, errors);
        assert_eq!(exc.message, "queries validation failed");
    }
}
