use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cti_objects::Object;
use cti_types::{CollectionId, StixId, Timestamp};
use tracing::{debug, info, warn};

use crate::config::MediaTypePolicy;
use crate::error::{StoreError, StoreResult};
use crate::record::{Collection, ContentRecord, NewCollection};
use crate::traits::{CollectionStore, ObjectVersionStore};

#[derive(Default)]
struct State {
    collections: Vec<Collection>,
    media_types: Vec<(CollectionId, String)>,
    content: Vec<ContentRecord>,
    versions: BTreeMap<StixId, BTreeMap<Timestamp, Object>>,
}

impl State {
    fn collection_mut(&mut self, id: &CollectionId) -> StoreResult<&mut Collection> {
        self.collections
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| not_found(id))
    }

    fn require_collection(&self, id: &CollectionId) -> StoreResult<()> {
        if self.collections.iter().any(|c| c.id == *id) {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }
}

fn not_found(id: &CollectionId) -> StoreError {
    StoreError::NotFound {
        entity: "collection",
        id: id.to_string(),
    }
}

/// In-memory datastore with the same semantics as the SQLite backend.
///
/// Intended for tests and embedding. All state sits behind one `RwLock`, so
/// each operation is atomic with respect to the others.
pub struct InMemoryDatastore {
    state: RwLock<State>,
    media_type_policy: MediaTypePolicy,
}

impl InMemoryDatastore {
    pub fn new() -> Self {
        Self::with_policy(MediaTypePolicy::default())
    }

    pub fn with_policy(media_type_policy: MediaTypePolicy) -> Self {
        Self {
            state: RwLock::new(State::default()),
            media_type_policy,
        }
    }

    /// Number of registered collections.
    pub fn collection_count(&self) -> usize {
        self.read().map(|s| s.collections.len()).unwrap_or(0)
    }

    /// Total object versions held.
    pub fn version_count(&self) -> usize {
        self.read()
            .map(|s| s.versions.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for InMemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDatastore")
            .field("collections", &self.collection_count())
            .field("versions", &self.version_count())
            .field("media_type_policy", &self.media_type_policy)
            .finish()
    }
}

impl CollectionStore for InMemoryDatastore {
    fn create_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    fn register_collection(&self, new: NewCollection) -> StoreResult<CollectionId> {
        let id = new.id.unwrap_or_else(CollectionId::new);
        let mut state = self.write()?;
        if state.collections.iter().any(|c| c.id == id) {
            warn!(collection = %id, "collection id already registered");
            return Err(StoreError::Conflict {
                entity: "collection",
                id: id.to_string(),
            });
        }
        let new_title = new.title.clone();
        state.collections.push(Collection {
            id,
            title: new.title,
            description: new.description,
            date_added: Timestamp::now(),
            enabled: true,
            can_read: new.can_read,
            can_write: new.can_write,
        });
        info!(collection = %id, title = %new_title, "registered collection");
        Ok(id)
    }

    fn collection(&self, id: &CollectionId) -> StoreResult<Option<Collection>> {
        let state = self.read()?;
        Ok(state.collections.iter().find(|c| c.id == *id).cloned())
    }

    fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let mut collections = self.read()?.collections.clone();
        collections.sort_by_key(|c| c.date_added);
        Ok(collections)
    }

    fn set_enabled(&self, id: &CollectionId, enabled: bool) -> StoreResult<()> {
        let mut state = self.write()?;
        state.collection_mut(id)?.enabled = enabled;
        debug!(collection = %id, enabled, "updated collection");
        Ok(())
    }

    fn set_accepted_media_types(
        &self,
        id: &CollectionId,
        media_types: &[String],
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        state.require_collection(id)?;
        if self.media_type_policy == MediaTypePolicy::Replace {
            state.media_types.retain(|(owner, _)| owner != id);
        }
        state
            .media_types
            .extend(media_types.iter().map(|m| (*id, m.clone())));
        debug!(
            collection = %id,
            count = media_types.len(),
            policy = ?self.media_type_policy,
            "set accepted media types"
        );
        Ok(())
    }

    fn accepted_media_types(&self, id: &CollectionId) -> StoreResult<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .media_types
            .iter()
            .filter(|(owner, _)| owner == id)
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn add_to_collection(
        &self,
        collection: &CollectionId,
        stix_id: &StixId,
        date_added: Timestamp,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        state.require_collection(collection)?;
        state.content.push(ContentRecord {
            collection_id: *collection,
            stix_id: stix_id.clone(),
            date_added,
        });
        debug!(%collection, %stix_id, %date_added, "added to collection");
        Ok(())
    }

    fn content_records(&self, collection: &CollectionId) -> StoreResult<Vec<ContentRecord>> {
        let state = self.read()?;
        let mut records: Vec<ContentRecord> = state
            .content
            .iter()
            .filter(|r| r.collection_id == *collection)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date_added);
        Ok(records)
    }

    fn list_content(&self, collection: &CollectionId) -> StoreResult<BTreeSet<StixId>> {
        let state = self.read()?;
        Ok(state
            .content
            .iter()
            .filter(|r| r.collection_id == *collection)
            .map(|r| r.stix_id.clone())
            .collect())
    }
}

impl ObjectVersionStore for InMemoryDatastore {
    fn put_version(&self, object: &Object) -> StoreResult<()> {
        object.ensure_valid()?;
        let (id, modified) = object.version_key();
        let mut state = self.write()?;
        let versions = state.versions.entry(id.clone()).or_default();
        if versions.contains_key(&modified) {
            return Err(StoreError::Conflict {
                entity: "object version",
                id: format!("{id}@{modified}"),
            });
        }
        versions.insert(modified, object.clone());
        debug!(%id, %modified, "stored object version");
        Ok(())
    }

    fn get_version(&self, id: &StixId, modified: Timestamp) -> StoreResult<Option<Object>> {
        let state = self.read()?;
        Ok(state
            .versions
            .get(id)
            .and_then(|versions| versions.get(&modified))
            .cloned())
    }

    fn versions(&self, id: &StixId) -> StoreResult<Vec<Object>> {
        let state = self.read()?;
        Ok(state
            .versions
            .get(id)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default())
    }

    fn latest_version(&self, id: &StixId) -> StoreResult<Option<Object>> {
        let state = self.read()?;
        Ok(state
            .versions
            .get(id)
            .and_then(|versions| versions.values().next_back())
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite;

    // ----------------------------------------------------------------
    // Shared behaviour
    // ----------------------------------------------------------------

    #[test]
    fn collections() {
        suite::register_and_lookup(&InMemoryDatastore::new());
        suite::explicit_duplicate_id_conflicts(&InMemoryDatastore::new());
        suite::toggle_enabled(&InMemoryDatastore::new());
        suite::writes_are_logged(&InMemoryDatastore::new());
        suite::unknown_collection(&InMemoryDatastore::new());
    }

    #[test]
    fn content_index() {
        suite::duplicate_add_is_deduplicated(&InMemoryDatastore::new());
        suite::empty_collection_lists_nothing(&InMemoryDatastore::new());
        suite::content_added_after_filters(&InMemoryDatastore::new());
        suite::content_is_scoped_to_collection(&InMemoryDatastore::new());
    }

    #[test]
    fn media_types() {
        suite::media_types_append(&InMemoryDatastore::new());
        suite::media_types_replace(&InMemoryDatastore::with_policy(MediaTypePolicy::Replace));
    }

    #[test]
    fn object_versions() {
        suite::two_version_scenario(&InMemoryDatastore::new());
        suite::same_version_twice_conflicts(&InMemoryDatastore::new());
        suite::invalid_object_rejected(&InMemoryDatastore::new());
        suite::collection_objects_skips_missing(&InMemoryDatastore::new());
        suite::extreme_seen_timestamps_read_back(&InMemoryDatastore::new());
    }

    #[test]
    fn concurrent_registration() {
        suite::concurrent_registration_is_unique(std::sync::Arc::new(InMemoryDatastore::new()));
    }

    // ----------------------------------------------------------------
    // Backend specifics
    // ----------------------------------------------------------------

    #[test]
    fn counts() {
        let store = InMemoryDatastore::default();
        assert_eq!(store.collection_count(), 0);
        assert_eq!(store.version_count(), 0);
        store.register_collection(NewCollection::new("a")).unwrap();
        store.put_version(&Object::new("tool").unwrap()).unwrap();
        assert_eq!(store.collection_count(), 1);
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn debug_impl() {
        let store = InMemoryDatastore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryDatastore"));
        assert!(debug.contains("Append"));
    }

    #[test]
    fn create_schema_is_noop() {
        let store = InMemoryDatastore::new();
        store.create_schema().unwrap();
        store.create_schema().unwrap();
        assert!(store.list_collections().unwrap().is_empty());
    }
}
