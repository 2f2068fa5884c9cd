//! STIX object model for CTI Vault.
//!
//! Objects are assembled from independent, reusable property traits rather
//! than a type hierarchy. Each property owns a disjoint slice of the object's
//! JSON fields along with its accessors and validation; an object type is a
//! fixed combination of properties.
//!
//! # Modules
//!
//! - [`properties`] -- The property traits ([`NameProperty`], [`SeenProperty`], ...)
//! - [`types`] -- Registered object types and the [`StixObject`] trait
//! - [`object`] -- The type-erased [`Object`] and its canonical JSON form
//! - [`validation`] -- Field-level [`Violation`] reporting
//!
//! # Versioning
//!
//! Objects are immutable once published. [`StixObject::new_version`] and
//! [`Object::new_version`] return a copy sharing the same identity with a
//! strictly later `modified` timestamp and never touch their input.

pub mod error;
pub mod object;
pub mod properties;
pub mod types;
pub mod validation;

pub use error::{ObjectError, ObjectResult};
pub use object::Object;
pub use properties::{
    AliasesProperty, CommonProperties, DescriptionProperty, HasProperty, KillChainPhase,
    KillChainPhasesProperty, NameProperty, PropertyKind, PropertySet, SeenProperty,
};
pub use types::{AttackPattern, Campaign, IntrusionSet, Malware, ObjectType, StixObject, Tool};
pub use validation::{Violation, ViolationKind};
