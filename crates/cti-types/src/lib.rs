//! Foundation types for CTI Vault.
//!
//! This crate provides the identity and version primitives shared by the
//! object model and the collection store. Every other CTI Vault crate depends
//! on `cti-types`.
//!
//! # Key Types
//!
//! - [`StixId`] -- Object identity of the form `type--UUID`, shared by all versions
//! - [`CollectionId`] -- UUIDv4 identifier for a collection
//! - [`Timestamp`] -- Millisecond-precision UTC instant with a sortable text form
//! - [`media`] -- Media type constants for submissions

pub mod error;
pub mod identity;
pub mod media;
pub mod temporal;

pub use error::TypeError;
pub use identity::{CollectionId, StixId};
pub use media::{STIX_21_MEDIA_TYPE, TAXII_21_MEDIA_TYPE};
pub use temporal::{Timestamp, MAX_MILLIS, MIN_MILLIS};
