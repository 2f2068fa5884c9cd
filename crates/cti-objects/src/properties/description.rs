use serde::{Deserialize, Serialize};

use crate::properties::{PropertyKind, PropertySet};
use crate::validation::{check_not_blank, Violation};

pub(crate) const FIELDS: &[&str] = &["description"];

/// Free-text description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl DescriptionProperty {
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn clear_description(&mut self) {
        self.description = None;
    }
}

impl PropertySet for DescriptionProperty {
    const KIND: PropertyKind = PropertyKind::Description;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_not_blank("description", self.description(), &mut violations);
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_description_is_valid() {
        assert!(DescriptionProperty::default().validate().is_empty());
    }

    #[test]
    fn blank_description_is_rejected() {
        let mut p = DescriptionProperty::default();
        p.set_description("\t\n ");
        let violations = p.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "description");
    }

    #[test]
    fn set_and_clear() {
        let mut p = DescriptionProperty::default();
        p.set_description("Credential theft via LSASS dumps");
        assert_eq!(p.description(), Some("Credential theft via LSASS dumps"));
        assert!(p.validate().is_empty());
        p.clear_description();
        assert_eq!(p.description(), None);
    }

    #[test]
    fn unset_description_is_omitted_from_json() {
        let json = serde_json::to_value(DescriptionProperty::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
