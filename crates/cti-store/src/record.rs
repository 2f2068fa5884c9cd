//! Rows the collection store reads and writes.

use cti_types::{CollectionId, StixId, Timestamp};
use serde::{Deserialize, Serialize};

/// What clients may do with a collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_read: bool,
    pub can_write: bool,
}

/// A registered collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date_added: Timestamp,
    pub enabled: bool,
    pub can_read: bool,
    pub can_write: bool,
}

impl Collection {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_read: self.can_read,
            can_write: self.can_write,
        }
    }
}

/// Input to `register_collection`.
///
/// Leave `id` unset to have the store generate one; setting it is how a
/// caller re-registers a collection known elsewhere under a fixed id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewCollection {
    pub id: Option<CollectionId>,
    pub title: String,
    pub description: Option<String>,
    pub can_read: bool,
    pub can_write: bool,
}

impl NewCollection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: CollectionId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn readable(mut self, can_read: bool) -> Self {
        self.can_read = can_read;
        self
    }

    pub fn writable(mut self, can_write: bool) -> Self {
        self.can_write = can_write;
        self
    }
}

/// One row of the content index. The same `stix_id` may appear in many rows
/// of one collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub collection_id: CollectionId,
    pub stix_id: StixId,
    pub date_added: Timestamp,
}
