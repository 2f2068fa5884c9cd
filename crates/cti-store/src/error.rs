use cti_objects::ObjectError;
use rusqlite::ffi;

/// Errors from collection and object store operations.
///
/// Storage engine failures are carried unmodified; the store never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An insert collided with an existing identity.
    #[error("{entity} already exists: {id}")]
    Conflict { entity: &'static str, id: String },

    /// A single-entity operation named something that does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The storage engine could not complete the operation.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// No connection could be obtained from the pool.
    #[error("connection pool unavailable: {0}")]
    PoolUnavailable(#[from] r2d2::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: String, reason: String },

    /// The object failed validation or could not be encoded.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// Invalid store configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Map an insert failure: a UNIQUE violation is a `Conflict`, anything
    /// else passes through as `StorageUnavailable`.
    pub(crate) fn from_insert(err: rusqlite::Error, entity: &'static str, id: String) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::Conflict { entity, id }
            }
            _ => Self::StorageUnavailable(err),
        }
    }

    /// Returns `true` for identity collisions, which a caller may resolve by
    /// retrying with a new id.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` for engine or pool failures.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::PoolUnavailable(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
