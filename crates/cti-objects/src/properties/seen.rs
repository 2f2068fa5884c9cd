use cti_types::Timestamp;
use serde::{Deserialize, Serialize};

use crate::properties::{PropertyKind, PropertySet};
use crate::validation::{Violation, ViolationKind};

pub(crate) const FIELDS: &[&str] = &["first_seen", "last_seen"];

/// The observation window of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    first_seen: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_seen: Option<Timestamp>,
}

impl SeenProperty {
    pub fn first_seen(&self) -> Option<Timestamp> {
        self.first_seen
    }

    pub fn set_first_seen(&mut self, at: Option<Timestamp>) {
        self.first_seen = at;
    }

    pub fn last_seen(&self) -> Option<Timestamp> {
        self.last_seen
    }

    pub fn set_last_seen(&mut self, at: Option<Timestamp>) {
        self.last_seen = at;
    }
}

impl PropertySet for SeenProperty {
    const KIND: PropertyKind = PropertyKind::Seen;

    fn validate(&self) -> Vec<Violation> {
        match (self.first_seen, self.last_seen) {
            (Some(first), Some(last)) if last < first => vec![Violation::new(
                "last_seen",
                ViolationKind::Inconsistent,
                "must not be earlier than first_seen",
            )],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_must_be_ordered() {
        let mut p = SeenProperty::default();
        p.set_first_seen(Timestamp::from_millis(2_000));
        p.set_last_seen(Timestamp::from_millis(1_000));
        assert_eq!(p.validate().len(), 1);

        p.set_last_seen(Timestamp::from_millis(2_000));
        assert!(p.validate().is_empty());
    }

    #[test]
    fn half_open_window_is_valid() {
        let mut p = SeenProperty::default();
        p.set_last_seen(Timestamp::from_millis(5));
        assert!(p.validate().is_empty());
    }
}
