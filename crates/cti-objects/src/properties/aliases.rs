use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::properties::{PropertyKind, PropertySet};
use crate::validation::{Violation, ViolationKind};

pub(crate) const FIELDS: &[&str] = &["aliases"];

/// Alternative names the object is known by.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasesProperty {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
}

impl AliasesProperty {
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.aliases.push(alias.into());
    }

    pub fn set_aliases(&mut self, aliases: Vec<String>) {
        self.aliases = aliases;
    }
}

impl PropertySet for AliasesProperty {
    const KIND: PropertyKind = PropertyKind::Aliases;

    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();
        for alias in &self.aliases {
            if alias.trim().is_empty() {
                violations.push(Violation::malformed("aliases", "aliases must not be blank"));
            } else if !seen.insert(alias.as_str()) {
                violations.push(Violation::new(
                    "aliases",
                    ViolationKind::Duplicate,
                    format!("alias {alias:?} listed more than once"),
                ));
            }
        }
        violations
    }
}
