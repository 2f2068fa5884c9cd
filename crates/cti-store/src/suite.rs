//! Behaviour every backend must share, run from each backend's tests.

use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;

use cti_objects::{Object, ObjectError};
use cti_types::{
    CollectionId, StixId, Timestamp, MAX_MILLIS, MIN_MILLIS, STIX_21_MEDIA_TYPE,
    TAXII_21_MEDIA_TYPE,
};

use crate::error::StoreError;
use crate::record::{Capabilities, NewCollection};
use crate::traits::{collection_objects, CollectionStore, ObjectVersionStore};

fn feed<S: CollectionStore + ?Sized>(store: &S) -> CollectionId {
    store
        .register_collection(NewCollection::new("feed").readable(true))
        .unwrap()
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a debug-level subscriber on this thread and return its output.
fn captured_logs(f: impl FnOnce()) -> String {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = captured.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

fn stix_id(object_type: &str) -> StixId {
    StixId::generate(object_type).unwrap()
}

pub fn register_and_lookup<S: CollectionStore>(store: &S) {
    store.create_schema().unwrap();
    let first = store
        .register_collection(
            NewCollection::new("Enterprise")
                .with_description("ATT&CK techniques")
                .readable(true),
        )
        .unwrap();
    let second = store
        .register_collection(NewCollection::new("Drop box").writable(true))
        .unwrap();
    assert_ne!(first, second);

    let collection = store.collection(&first).unwrap().unwrap();
    assert_eq!(collection.title, "Enterprise");
    assert_eq!(collection.description.as_deref(), Some("ATT&CK techniques"));
    assert!(collection.enabled);

    assert_eq!(store.is_enabled(&first).unwrap(), Some(true));
    assert_eq!(
        store.capabilities(&first).unwrap(),
        Some(Capabilities {
            can_read: true,
            can_write: false
        })
    );
    assert_eq!(
        store.capabilities(&second).unwrap(),
        Some(Capabilities {
            can_read: false,
            can_write: true
        })
    );

    let ids: Vec<CollectionId> = store
        .list_collections()
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![first, second]);
}

pub fn explicit_duplicate_id_conflicts<S: CollectionStore>(store: &S) {
    let id = CollectionId::new();
    assert_eq!(
        store
            .register_collection(NewCollection::new("one").with_id(id))
            .unwrap(),
        id
    );
    let err = store
        .register_collection(NewCollection::new("two").with_id(id))
        .unwrap_err();
    assert!(err.is_conflict(), "unexpected error: {err}");
    assert_eq!(store.collection(&id).unwrap().unwrap().title, "one");
}

pub fn writes_are_logged<S: CollectionStore>(store: &S) {
    let id = CollectionId::new();
    let logs = captured_logs(|| {
        store
            .register_collection(NewCollection::new("logged").with_id(id))
            .unwrap();
        store
            .register_collection(NewCollection::new("again").with_id(id))
            .unwrap_err();
        store.set_enabled(&id, false).unwrap();
        store
            .set_accepted_media_types(&id, &[STIX_21_MEDIA_TYPE.to_string()])
            .unwrap();
        store
            .add_to_collection(&id, &stix_id("tool"), Timestamp::now())
            .unwrap();
    });

    let line = |message: &str| {
        logs.lines()
            .find(|l| l.contains(message))
            .unwrap_or_else(|| panic!("no {message:?} in:\n{logs}"))
            .to_string()
    };
    assert!(line("registered collection").contains("INFO"));
    assert!(line("registered collection").contains(&id.to_string()));
    assert!(line("collection id already registered").contains("WARN"));
    assert!(line("updated collection").contains("DEBUG"));
    assert!(line("set accepted media types").contains("DEBUG"));
    assert!(line("added to collection").contains("DEBUG"));
}

pub fn toggle_enabled<S: CollectionStore>(store: &S) {
    let id = feed(store);
    store.set_enabled(&id, false).unwrap();
    assert_eq!(store.is_enabled(&id).unwrap(), Some(false));
    store.set_enabled(&id, true).unwrap();
    assert_eq!(store.is_enabled(&id).unwrap(), Some(true));
}

pub fn unknown_collection<S: CollectionStore>(store: &S) {
    let missing = CollectionId::new();
    assert!(store.collection(&missing).unwrap().is_none());
    assert_eq!(store.is_enabled(&missing).unwrap(), None);
    assert_eq!(store.capabilities(&missing).unwrap(), None);
    assert!(store.list_content(&missing).unwrap().is_empty());
    assert!(store.accepted_media_types(&missing).unwrap().is_empty());

    let not_found = |err: StoreError| matches!(err, StoreError::NotFound { .. });
    assert!(not_found(store.set_enabled(&missing, false).unwrap_err()));
    assert!(not_found(
        store
            .set_accepted_media_types(&missing, &[STIX_21_MEDIA_TYPE.to_string()])
            .unwrap_err()
    ));
    assert!(not_found(
        store
            .add_to_collection(&missing, &stix_id("malware"), Timestamp::now())
            .unwrap_err()
    ));
}

pub fn duplicate_add_is_deduplicated<S: CollectionStore>(store: &S) {
    let collection = feed(store);
    let object = stix_id("malware");
    let at = Timestamp::now();
    store.add_to_collection(&collection, &object, at).unwrap();
    store.add_to_collection(&collection, &object, at).unwrap();

    assert_eq!(store.list_content(&collection).unwrap(), BTreeSet::from([object]));
    assert_eq!(store.content_records(&collection).unwrap().len(), 2);
}

pub fn empty_collection_lists_nothing<S: CollectionStore>(store: &S) {
    let collection = feed(store);
    assert!(store.list_content(&collection).unwrap().is_empty());
    assert!(store.content_records(&collection).unwrap().is_empty());
}

pub fn content_added_after_filters<S: CollectionStore>(store: &S) {
    let collection = feed(store);
    let early = stix_id("campaign");
    let late = stix_id("tool");
    let t1 = Timestamp::now();
    let t2 = Timestamp::after(&t1);
    store.add_to_collection(&collection, &late, t2).unwrap();
    store.add_to_collection(&collection, &early, t1).unwrap();

    let records = store.content_records(&collection).unwrap();
    assert_eq!(records[0].stix_id, early);
    assert_eq!(records[1].stix_id, late);

    assert_eq!(
        store.content_added_after(&collection, t1).unwrap(),
        BTreeSet::from([late])
    );
    assert!(store.content_added_after(&collection, t2).unwrap().is_empty());
}

pub fn content_is_scoped_to_collection<S: CollectionStore>(store: &S) {
    let a = feed(store);
    let b = feed(store);
    let object = stix_id("intrusion-set");
    store.add_to_collection(&a, &object, Timestamp::now()).unwrap();
    assert_eq!(store.list_content(&a).unwrap().len(), 1);
    assert!(store.list_content(&b).unwrap().is_empty());
}

pub fn media_types_append<S: CollectionStore>(store: &S) {
    let collection = feed(store);
    store
        .set_accepted_media_types(&collection, &[STIX_21_MEDIA_TYPE.to_string()])
        .unwrap();
    store
        .set_accepted_media_types(&collection, &[TAXII_21_MEDIA_TYPE.to_string()])
        .unwrap();
    assert_eq!(
        store.accepted_media_types(&collection).unwrap(),
        vec![STIX_21_MEDIA_TYPE.to_string(), TAXII_21_MEDIA_TYPE.to_string()]
    );
}

pub fn media_types_replace<S: CollectionStore>(store: &S) {
    let collection = feed(store);
    let other = feed(store);
    store
        .set_accepted_media_types(&other, &[STIX_21_MEDIA_TYPE.to_string()])
        .unwrap();
    store
        .set_accepted_media_types(&collection, &[STIX_21_MEDIA_TYPE.to_string()])
        .unwrap();
    store
        .set_accepted_media_types(&collection, &[TAXII_21_MEDIA_TYPE.to_string()])
        .unwrap();
    assert_eq!(
        store.accepted_media_types(&collection).unwrap(),
        vec![TAXII_21_MEDIA_TYPE.to_string()]
    );
    // Replacing one collection's list leaves the others alone.
    assert_eq!(
        store.accepted_media_types(&other).unwrap(),
        vec![STIX_21_MEDIA_TYPE.to_string()]
    );

    store.set_accepted_media_types(&collection, &[]).unwrap();
    assert!(store.accepted_media_types(&collection).unwrap().is_empty());
}

pub fn two_version_scenario<S: CollectionStore + ObjectVersionStore>(store: &S) {
    let collection = store
        .register_collection(NewCollection::new("C").readable(true).writable(false))
        .unwrap();

    let mut v1 = Object::new("attack-pattern").unwrap();
    if let Object::AttackPattern(ap) = &mut v1 {
        ap.name.set_name("Spearphishing Attachment");
    }
    store.put_version(&v1).unwrap();
    let t1 = Timestamp::now();
    store.add_to_collection(&collection, v1.id(), t1).unwrap();

    let v2 = v1.new_version();
    store.put_version(&v2).unwrap();
    store
        .add_to_collection(&collection, v2.id(), Timestamp::after(&t1))
        .unwrap();

    assert_eq!(
        store.list_content(&collection).unwrap(),
        BTreeSet::from([v1.id().clone()])
    );
    assert_eq!(store.content_records(&collection).unwrap().len(), 2);

    assert_eq!(store.get_version(v1.id(), v1.modified()).unwrap(), Some(v1.clone()));
    assert_eq!(store.get_version(v2.id(), v2.modified()).unwrap(), Some(v2.clone()));
    assert_eq!(store.versions(v1.id()).unwrap(), vec![v1.clone(), v2.clone()]);
    assert_eq!(store.latest_version(v1.id()).unwrap(), Some(v2.clone()));
    assert_eq!(collection_objects(store, &collection).unwrap(), vec![v2]);
}

pub fn extreme_seen_timestamps_read_back<S: CollectionStore + ObjectVersionStore>(store: &S) {
    // One past the last four-digit year is not a timestamp at all.
    assert!(Timestamp::from_millis(MAX_MILLIS + 1).is_none());

    let collection = feed(store);
    let mut object = Object::new("campaign").unwrap();
    if let Object::Campaign(campaign) = &mut object {
        campaign.seen.set_first_seen(Timestamp::from_millis(MIN_MILLIS));
        campaign.seen.set_last_seen(Timestamp::from_millis(MAX_MILLIS));
    }
    assert!(object.validate().is_empty());
    store.put_version(&object).unwrap();
    store
        .add_to_collection(&collection, object.id(), Timestamp::now())
        .unwrap();

    assert_eq!(store.latest_version(object.id()).unwrap(), Some(object.clone()));
    assert_eq!(collection_objects(store, &collection).unwrap(), vec![object]);
}

pub fn same_version_twice_conflicts<S: ObjectVersionStore>(store: &S) {
    let object = Object::new("tool").unwrap();
    store.put_version(&object).unwrap();
    let err = store.put_version(&object).unwrap_err();
    assert!(err.is_conflict(), "unexpected error: {err}");
    assert_eq!(store.versions(object.id()).unwrap().len(), 1);
}

pub fn invalid_object_rejected<S: ObjectVersionStore>(store: &S) {
    let mut object = Object::new("malware").unwrap();
    object.common_mut().set_confidence(Some(250));
    let err = store.put_version(&object).unwrap_err();
    assert!(matches!(err, StoreError::Object(ObjectError::Validation(_))));
    assert!(store.versions(object.id()).unwrap().is_empty());
    assert!(store.latest_version(object.id()).unwrap().is_none());
}

pub fn collection_objects_skips_missing<S: CollectionStore + ObjectVersionStore>(store: &S) {
    let collection = feed(store);
    let stored = Object::new("campaign").unwrap();
    store.put_version(&stored).unwrap();
    let now = Timestamp::now();
    store.add_to_collection(&collection, stored.id(), now).unwrap();
    store
        .add_to_collection(&collection, &stix_id("campaign"), now)
        .unwrap();

    assert_eq!(store.list_content(&collection).unwrap().len(), 2);
    assert_eq!(collection_objects(store, &collection).unwrap(), vec![stored]);
}

pub fn concurrent_registration_is_unique<S: CollectionStore + 'static>(store: Arc<S>) {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 16;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| {
                        store
                            .register_collection(NewCollection::new(format!("c{t}-{i}")))
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = BTreeSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "collection id {id} issued twice");
        }
    }
    assert_eq!(ids.len(), THREADS * PER_THREAD);
    assert_eq!(store.list_collections().unwrap().len(), THREADS * PER_THREAD);

    // Racing on one explicit id: exactly one winner.
    let contested = CollectionId::new();
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.register_collection(NewCollection::new("contested").with_id(contested))
            })
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(StoreError::is_conflict));
}
