//! Store interfaces shared by every backend.

use std::collections::BTreeSet;

use cti_objects::Object;
use cti_types::{CollectionId, StixId, Timestamp};
use tracing::debug;

use crate::error::StoreResult;
use crate::record::{Capabilities, Collection, ContentRecord, NewCollection};

/// Collections, their accepted media types, and the content index.
///
/// Implementations must satisfy these invariants:
/// - Collection ids are unique. A duplicate registration fails with
///   `Conflict`, enforced by the backend's own uniqueness mechanism.
/// - The content index is append-only. Adding the same object twice keeps
///   both rows; readers de-duplicate.
/// - Content rows reference object identities, never versions.
/// - Write operations naming an unknown collection fail with `NotFound`.
///   Read operations report absence as `None` or an empty result.
pub trait CollectionStore: Send + Sync {
    /// Create every table and index the store needs. Idempotent.
    fn create_schema(&self) -> StoreResult<()>;

    /// Register a collection, enabled, and return its id.
    fn register_collection(&self, new: NewCollection) -> StoreResult<CollectionId>;

    /// Look up one collection.
    fn collection(&self, id: &CollectionId) -> StoreResult<Option<Collection>>;

    /// Every collection, oldest first.
    fn list_collections(&self) -> StoreResult<Vec<Collection>>;

    fn set_enabled(&self, id: &CollectionId, enabled: bool) -> StoreResult<()>;

    /// Record the media types a collection accepts. Whether existing rows
    /// are kept depends on the configured [`MediaTypePolicy`].
    ///
    /// [`MediaTypePolicy`]: crate::config::MediaTypePolicy
    fn set_accepted_media_types(&self, id: &CollectionId, media_types: &[String])
        -> StoreResult<()>;

    /// Stored media types in insertion order. Duplicates are kept.
    fn accepted_media_types(&self, id: &CollectionId) -> StoreResult<Vec<String>>;

    /// Append one row to the content index.
    fn add_to_collection(
        &self,
        collection: &CollectionId,
        stix_id: &StixId,
        date_added: Timestamp,
    ) -> StoreResult<()>;

    /// Every content row of a collection, ordered by `date_added`.
    fn content_records(&self, collection: &CollectionId) -> StoreResult<Vec<ContentRecord>>;

    /// Distinct object identities in a collection.
    ///
    /// Default implementation de-duplicates `content_records()`.
    fn list_content(&self, collection: &CollectionId) -> StoreResult<BTreeSet<StixId>> {
        Ok(self
            .content_records(collection)?
            .into_iter()
            .map(|record| record.stix_id)
            .collect())
    }

    /// Identities with at least one row added strictly after `after`.
    fn content_added_after(
        &self,
        collection: &CollectionId,
        after: Timestamp,
    ) -> StoreResult<BTreeSet<StixId>> {
        Ok(self
            .content_records(collection)?
            .into_iter()
            .filter(|record| record.date_added > after)
            .map(|record| record.stix_id)
            .collect())
    }

    /// `None` when the collection does not exist.
    fn is_enabled(&self, id: &CollectionId) -> StoreResult<Option<bool>> {
        Ok(self.collection(id)?.map(|c| c.enabled))
    }

    /// `None` when the collection does not exist.
    fn capabilities(&self, id: &CollectionId) -> StoreResult<Option<Capabilities>> {
        Ok(self.collection(id)?.map(|c| c.capabilities()))
    }
}

/// Immutable object versions keyed by `(id, modified)`.
pub trait ObjectVersionStore: Send + Sync {
    /// Validate and persist one version. Storing the same version twice is a
    /// `Conflict`.
    fn put_version(&self, object: &Object) -> StoreResult<()>;

    fn get_version(&self, id: &StixId, modified: Timestamp) -> StoreResult<Option<Object>>;

    /// Every version of `id`, ascending by `modified`.
    fn versions(&self, id: &StixId) -> StoreResult<Vec<Object>>;

    /// The version with the greatest `modified`.
    fn latest_version(&self, id: &StixId) -> StoreResult<Option<Object>> {
        Ok(self.versions(id)?.pop())
    }
}

/// Resolve a collection's identities to their latest stored versions.
///
/// Content may be indexed before its objects arrive; such identities are
/// skipped.
pub fn collection_objects<S>(store: &S, collection: &CollectionId) -> StoreResult<Vec<Object>>
where
    S: CollectionStore + ObjectVersionStore + ?Sized,
{
    let mut objects = Vec::new();
    for stix_id in store.list_content(collection)? {
        match store.latest_version(&stix_id)? {
            Some(object) => objects.push(object),
            None => debug!(%collection, %stix_id, "no stored version, skipping"),
        }
    }
    Ok(objects)
}
