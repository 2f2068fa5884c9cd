use serde::{Deserialize, Serialize};

use crate::properties::{PropertyKind, PropertySet};
use crate::validation::{check_not_blank, Violation};

pub(crate) const FIELDS: &[&str] = &["name"];

/// A human-readable name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl NameProperty {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn clear_name(&mut self) {
        self.name = None;
    }
}

impl PropertySet for NameProperty {
    const KIND: PropertyKind = PropertyKind::Name;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_not_blank("name", self.name(), &mut violations);
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_name_is_valid() {
        assert!(NameProperty::default().validate().is_empty());
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut p = NameProperty::default();
        p.set_name("   ");
        let violations = p.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "name");
    }

    #[test]
    fn set_and_clear() {
        let mut p = NameProperty::default();
        p.set_name("Emotet");
        assert_eq!(p.name(), Some("Emotet"));
        p.clear_name();
        assert_eq!(p.name(), None);
    }
}
