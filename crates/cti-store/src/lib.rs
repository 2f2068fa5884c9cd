//! Collection storage for CTI Vault.
//!
//! A collection is a named, access-controlled grouping of STIX object
//! identities. This crate persists collections, the media types each one
//! accepts, the append-only index of which identities belong to which
//! collection, and the immutable object versions those identities resolve to.
//!
//! # Tables
//!
//! Table names come from a [`SchemaRegistry`] handed to the backend at
//! construction:
//!
//! - `collection` -- one row per registered collection
//! - `collection_media_type` -- accepted media types, many per collection
//! - `collection_content` -- collection to identity rows, append-only
//! - `stix_object_version` -- one row per `(id, modified)` object version
//!
//! # Storage Backends
//!
//! All backends implement [`CollectionStore`] and [`ObjectVersionStore`]:
//!
//! - [`SqliteDatastore`] -- `rusqlite` behind an `r2d2` pool, file or in-memory
//! - [`InMemoryDatastore`] -- `RwLock`-guarded state for tests and embedding
//!
//! # Design Rules
//!
//! 1. Content rows reference object identities, never versions.
//! 2. The content index is never de-duplicated on write; readers de-duplicate.
//! 3. References to objects are weak: content may name an object that has
//!    not been stored yet.
//! 4. Collection id uniqueness is enforced by the storage engine.
//! 5. Engine errors are propagated unmodified; nothing is retried.

pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod schema;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod suite;

pub use config::{MediaTypePolicy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDatastore;
pub use record::{Capabilities, Collection, ContentRecord, NewCollection};
pub use schema::{SchemaRegistry, Table};
pub use sqlite::SqliteDatastore;
pub use traits::{collection_objects, CollectionStore, ObjectVersionStore};
