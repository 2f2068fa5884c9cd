use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a field failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A required field is absent.
    Missing,
    /// A field is present but its value is not well formed.
    Malformed,
    /// A numeric field is outside its allowed range.
    OutOfRange,
    /// Two fields of the same property contradict each other.
    Inconsistent,
    /// A list contains the same entry more than once.
    Duplicate,
}

/// A single field-level violation reported by a property's `validate()`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON name of the offending field.
    pub field: String,
    pub kind: ViolationKind,
    pub description: String,
}

impl Violation {
    pub fn new(field: &str, kind: ViolationKind, description: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            kind,
            description: description.into(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::new(field, ViolationKind::Missing, "required field is missing")
    }

    pub fn malformed(field: &str, description: impl Into<String>) -> Self {
        Self::new(field, ViolationKind::Malformed, description)
    }

    /// Render a list of violations on one line.
    pub fn join(violations: &[Violation]) -> String {
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.description)
    }
}

/// Report a violation when an optional text value is set but blank.
pub(crate) fn check_not_blank(field: &str, value: Option<&str>, out: &mut Vec<Violation>) {
    if let Some(v) = value {
        if v.trim().is_empty() {
            out.push(Violation::malformed(field, "must not be blank"));
        }
    }
}
