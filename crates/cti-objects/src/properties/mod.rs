//! Reusable property traits.
//!
//! Each property struct owns a disjoint set of JSON fields together with the
//! getters, setters and validation for those fields. Object types are built by
//! composing a fixed list of properties (see [`crate::types`]); a property
//! never reads or writes fields owned by another property.

pub mod aliases;
pub mod common;
pub mod description;
pub mod kill_chain;
pub mod name;
pub mod seen;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::Violation;

pub use aliases::AliasesProperty;
pub use common::CommonProperties;
pub use description::DescriptionProperty;
pub use kill_chain::{KillChainPhase, KillChainPhasesProperty};
pub use name::NameProperty;
pub use seen::SeenProperty;

/// Identifies a property trait. Used by the per-type dispatch table that maps
/// a JSON field name to the property owning it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Common,
    Name,
    Description,
    KillChainPhases,
    Aliases,
    Seen,
}

impl PropertyKind {
    /// JSON fields owned by this property.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Common => common::FIELDS,
            Self::Name => name::FIELDS,
            Self::Description => description::FIELDS,
            Self::KillChainPhases => kill_chain::FIELDS,
            Self::Aliases => aliases::FIELDS,
            Self::Seen => seen::FIELDS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Name => "name",
            Self::Description => "description",
            Self::KillChainPhases => "kill-chain-phases",
            Self::Aliases => "aliases",
            Self::Seen => "seen",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bundle of fields with its own validation.
pub trait PropertySet {
    /// Which property this is.
    const KIND: PropertyKind;

    /// Check this property's fields. Returns every violation found.
    fn validate(&self) -> Vec<Violation>;
}

/// Access to one composed property of an object type.
///
/// Implemented once per property an object type composes, so generic code can
/// work with any object carrying, say, a [`NameProperty`]:
///
/// ```
/// use cti_objects::{AttackPattern, HasProperty, NameProperty};
///
/// fn rename<T: HasProperty<NameProperty>>(obj: &mut T, name: &str) {
///     obj.property_mut().set_name(name);
/// }
///
/// let mut ap = AttackPattern::new();
/// rename(&mut ap, "Spearphishing");
/// assert_eq!(ap.name.name(), Some("Spearphishing"));
/// ```
pub trait HasProperty<P: PropertySet> {
    fn property(&self) -> &P;
    fn property_mut(&mut self) -> &mut P;
}
