//! Validation gate: aggregates validator output into a tagged failure.
//!
//! Validators are the collaborator interface. They inspect a value and return
//! plain `{field, message}` pairs. The gate runs every registered validator,
//! tags each violation with the entity name and a field path, and fails only
//! after collecting **all** of them.

use serde::{Deserialize, Serialize};

use crate::error::FulfillmentError;

/// A single violated constraint as reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Constraint-checking collaborator.
///
/// Must be pure: the result may only depend on the value's current fields.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, value: &T) -> Vec<Violation>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T) -> Vec<Violation> + Send + Sync,
{
    fn validate(&self, value: &T) -> Vec<Violation> {
        self(value)
    }
}

/// A violation tagged with its entity type and full field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub entity: String,
    /// Dotted path below the entity, e.g. `items[2].quantity`.
    pub path: String,
    pub message: String,
}

impl core::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}: {}", self.entity, self.path, self.message)
    }
}

/// Every violation found in one validation pass (never empty when surfaced).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Violations(Vec<ConstraintViolation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: ConstraintViolation) {
        self.0.push(violation);
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstraintViolation> {
        self.0.iter()
    }

    /// `true` if any violation sits at exactly `entity.path`.
    pub fn contains_path(&self, entity: &str, path: &str) -> bool {
        self.0.iter().any(|v| v.entity == entity && v.path == path)
    }

    /// `Ok(())` when empty, otherwise a `ValidationFailed` carrying everything.
    pub fn into_result(self) -> Result<(), FulfillmentError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FulfillmentError::ValidationFailed(self))
        }
    }
}

impl core::fmt::Display for Violations {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (idx, v) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl IntoIterator for Violations {
    type Item = ConstraintViolation;
    type IntoIter = std::vec::IntoIter<ConstraintViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Runs a fixed set of validators for one entity type.
pub struct ValidationGate<T> {
    entity: &'static str,
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T> ValidationGate<T> {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            validators: Vec::new(),
        }
    }

    pub fn with_validator(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// Collect tagged violations without failing.
    ///
    /// `prefix` locates the value inside a larger aggregate (e.g. `items[1]`);
    /// pass `""` for a top-level entity.
    pub fn collect(&self, value: &T, prefix: &str) -> Violations {
        let mut out = Violations::new();
        for validator in &self.validators {
            for v in validator.validate(value) {
                let path = if prefix.is_empty() {
                    v.field
                } else {
                    format!("{prefix}.{}", v.field)
                };
                out.push(ConstraintViolation {
                    entity: self.entity.to_string(),
                    path,
                    message: v.message,
                });
            }
        }
        out
    }

    /// Validate a value located at `prefix`.
    pub fn check(&self, value: &T, prefix: &str) -> Result<(), FulfillmentError> {
        self.collect(value, prefix).into_result()
    }

    /// Validate a top-level value.
    pub fn validate(&self, value: &T) -> Result<(), FulfillmentError> {
        self.check(value, "")
    }
}

impl<T> core::fmt::Debug for ValidationGate<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("entity", &self.entity)
            .field("validators", &self.validators.len())
            .finish()
    }
}
