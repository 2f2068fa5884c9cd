use std::collections::BTreeSet;
use std::fmt;

use cti_objects::Object;
use cti_types::{CollectionId, StixId, Timestamp};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::config::{MediaTypePolicy, StoreConfig};
use crate::error::{StoreError, StoreResult};
use crate::record::{Collection, ContentRecord, NewCollection};
use crate::schema::{SchemaRegistry, Table};
use crate::traits::{CollectionStore, ObjectVersionStore};

/// Collection and object version store on SQLite.
///
/// Connections come from an `r2d2` pool, so one datastore can be shared
/// across threads. Each connection waits up to the configured busy timeout
/// for the database lock before giving up.
pub struct SqliteDatastore {
    pool: Pool<SqliteConnectionManager>,
    schema: SchemaRegistry,
    media_type_policy: MediaTypePolicy,
}

/// Raw `collection` row, decoded outside the rusqlite row closure so bad
/// values surface as `Corrupt` rather than engine errors.
struct CollectionRow {
    date_added: String,
    enabled: bool,
    id: String,
    title: String,
    description: Option<String>,
    can_read: bool,
    can_write: bool,
}

const COLLECTION_COLUMNS: &str =
    r#""date_added", "enabled", "id", "title", "description", "can_read", "can_write""#;

impl CollectionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date_added: row.get(0)?,
            enabled: row.get(1)?,
            id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            can_read: row.get(5)?,
            can_write: row.get(6)?,
        })
    }

    fn decode(self, table: &str) -> StoreResult<Collection> {
        Ok(Collection {
            id: CollectionId::parse(&self.id).map_err(|e| corrupt(table, e))?,
            title: self.title,
            description: self.description,
            date_added: Timestamp::parse(&self.date_added).map_err(|e| corrupt(table, e))?,
            enabled: self.enabled,
            can_read: self.can_read,
            can_write: self.can_write,
        })
    }
}

fn corrupt(table: &str, reason: impl fmt::Display) -> StoreError {
    StoreError::Corrupt {
        table: table.to_string(),
        reason: reason.to_string(),
    }
}

impl SqliteDatastore {
    /// Open the database named by `config`. The schema is not created; call
    /// [`CollectionStore::create_schema`] once before first use.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let timeout = config.busy_timeout();

        let pool = if config.is_in_memory() {
            // Every in-memory connection is a separate database, so the pool
            // holds exactly one and never recycles it.
            let manager = SqliteConnectionManager::memory()
                .with_init(move |conn| conn.busy_timeout(timeout));
            Pool::builder()
                .max_size(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .build(manager)?
        } else {
            let manager = SqliteConnectionManager::file(&config.database)
                .with_init(move |conn| conn.busy_timeout(timeout));
            Pool::builder().max_size(config.pool_size).build(manager)?
        };

        info!(
            database = %config.database.display(),
            pool_size = pool.max_size(),
            "opened sqlite datastore"
        );
        Ok(Self::from_pool(pool, config.schema()?, config.media_type_policy))
    }

    /// A private in-memory database with the default configuration.
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(&StoreConfig::in_memory())
    }

    /// Wrap an existing pool.
    pub fn from_pool(
        pool: Pool<SqliteConnectionManager>,
        schema: SchemaRegistry,
        media_type_policy: MediaTypePolicy,
    ) -> Self {
        Self {
            pool,
            schema,
            media_type_policy,
        }
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn media_type_policy(&self) -> MediaTypePolicy {
        self.media_type_policy
    }

    fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn table(&self, table: Table) -> &str {
        self.schema.name(table)
    }

    fn require_collection(
        &self,
        conn: &rusqlite::Connection,
        id: &CollectionId,
    ) -> StoreResult<()> {
        let sql = format!(
            "SELECT 1 FROM \"{}\" WHERE \"id\" = ?1",
            self.table(Table::Collection)
        );
        let exists = conn
            .query_row(&sql, params![id.to_string()], |_| Ok(()))
            .optional()?
            .is_some();
        if exists {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                entity: "collection",
                id: id.to_string(),
            })
        }
    }

    fn decode_object(&self, content: &str) -> StoreResult<Object> {
        Object::from_canonical_form(content.as_bytes())
            .map_err(|e| corrupt(self.table(Table::ObjectVersion), e))
    }
}

impl fmt::Debug for SqliteDatastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.pool.state();
        f.debug_struct("SqliteDatastore")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .field("schema", &self.schema)
            .field("media_type_policy", &self.media_type_policy)
            .finish()
    }
}

impl CollectionStore for SqliteDatastore {
    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        for statement in self.schema.create_statements() {
            if let (Some(check), Some(index)) = (&statement.duplicates, &statement.index) {
                let mut stmt = conn.prepare(check)?;
                let duplicated = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                if !duplicated.is_empty() {
                    warn!(
                        %index,
                        keys = duplicated.len(),
                        first = %duplicated[0],
                        "existing rows repeat a unique key; index not created"
                    );
                    continue;
                }
            }
            conn.execute_batch(&statement.sql)?;
        }
        info!(
            collection = self.table(Table::Collection),
            "schema ready"
        );
        Ok(())
    }

    fn register_collection(&self, new: NewCollection) -> StoreResult<CollectionId> {
        let id = new.id.unwrap_or_else(CollectionId::new);
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO \"{}\" ({COLLECTION_COLUMNS}) VALUES (?1, 1, ?2, ?3, ?4, ?5, ?6)",
            self.table(Table::Collection)
        );
        let inserted = conn.execute(
            &sql,
            params![
                Timestamp::now().to_string(),
                id.to_string(),
                new.title,
                new.description,
                new.can_read,
                new.can_write,
            ],
        );
        match inserted {
            Ok(_) => {
                info!(collection = %id, title = %new.title, "registered collection");
                Ok(id)
            }
            Err(err) => {
                let err = StoreError::from_insert(err, "collection", id.to_string());
                if err.is_conflict() {
                    warn!(collection = %id, "collection id already registered");
                }
                Err(err)
            }
        }
    }

    fn collection(&self, id: &CollectionId) -> StoreResult<Option<Collection>> {
        let conn = self.conn()?;
        let table = self.table(Table::Collection);
        let sql = format!("SELECT {COLLECTION_COLUMNS} FROM \"{table}\" WHERE \"id\" = ?1");
        conn.query_row(&sql, params![id.to_string()], CollectionRow::from_row)
            .optional()?
            .map(|row| row.decode(table))
            .transpose()
    }

    fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let conn = self.conn()?;
        let table = self.table(Table::Collection);
        let sql = format!(
            "SELECT {COLLECTION_COLUMNS} FROM \"{table}\" ORDER BY \"date_added\", \"row_id\""
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], CollectionRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|row| row.decode(table)).collect()
    }

    fn set_enabled(&self, id: &CollectionId, enabled: bool) -> StoreResult<()> {
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE \"{}\" SET \"enabled\" = ?1 WHERE \"id\" = ?2",
            self.table(Table::Collection)
        );
        let updated = conn.execute(&sql, params![enabled, id.to_string()])?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "collection",
                id: id.to_string(),
            });
        }
        debug!(collection = %id, enabled, "updated collection");
        Ok(())
    }

    fn set_accepted_media_types(
        &self,
        id: &CollectionId,
        media_types: &[String],
    ) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let table = self.table(Table::CollectionMediaType);
        let insert = format!(
            "INSERT INTO \"{table}\" (\"collection_id\", \"media_type\") VALUES (?1, ?2)"
        );

        match self.media_type_policy {
            MediaTypePolicy::Append => {
                self.require_collection(&conn, id)?;
                for media_type in media_types {
                    conn.execute(&insert, params![id.to_string(), media_type])?;
                }
            }
            MediaTypePolicy::Replace => {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                self.require_collection(&tx, id)?;
                tx.execute(
                    &format!("DELETE FROM \"{table}\" WHERE \"collection_id\" = ?1"),
                    params![id.to_string()],
                )?;
                for media_type in media_types {
                    tx.execute(&insert, params![id.to_string(), media_type])?;
                }
                tx.commit()?;
            }
        }
        debug!(
            collection = %id,
            count = media_types.len(),
            policy = ?self.media_type_policy,
            "set accepted media types"
        );
        Ok(())
    }

    fn accepted_media_types(&self, id: &CollectionId) -> StoreResult<Vec<String>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"media_type\" FROM \"{}\" WHERE \"collection_id\" = ?1 ORDER BY \"row_id\"",
            self.table(Table::CollectionMediaType)
        );
        let mut stmt = conn.prepare(&sql)?;
        let media_types = stmt
            .query_map(params![id.to_string()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(media_types)
    }

    fn add_to_collection(
        &self,
        collection: &CollectionId,
        stix_id: &StixId,
        date_added: Timestamp,
    ) -> StoreResult<()> {
        let conn = self.conn()?;
        self.require_collection(&conn, collection)?;
        let sql = format!(
            "INSERT INTO \"{}\" (\"date_added\", \"collection_id\", \"stix_id\") VALUES (?1, ?2, ?3)",
            self.table(Table::CollectionContent)
        );
        conn.execute(
            &sql,
            params![
                date_added.to_string(),
                collection.to_string(),
                stix_id.to_string()
            ],
        )?;
        debug!(%collection, %stix_id, %date_added, "added to collection");
        Ok(())
    }

    fn content_records(&self, collection: &CollectionId) -> StoreResult<Vec<ContentRecord>> {
        let conn = self.conn()?;
        let table = self.table(Table::CollectionContent);
        let sql = format!(
            "SELECT \"stix_id\", \"date_added\" FROM \"{table}\" \
             WHERE \"collection_id\" = ?1 ORDER BY \"date_added\", \"row_id\""
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![collection.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(stix_id, date_added)| {
                Ok(ContentRecord {
                    collection_id: *collection,
                    stix_id: StixId::parse(&stix_id).map_err(|e| corrupt(table, e))?,
                    date_added: Timestamp::parse(&date_added).map_err(|e| corrupt(table, e))?,
                })
            })
            .collect()
    }

    fn list_content(&self, collection: &CollectionId) -> StoreResult<BTreeSet<StixId>> {
        let conn = self.conn()?;
        let table = self.table(Table::CollectionContent);
        let sql =
            format!("SELECT DISTINCT \"stix_id\" FROM \"{table}\" WHERE \"collection_id\" = ?1");
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![collection.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.iter()
            .map(|id| StixId::parse(id).map_err(|e| corrupt(table, e)))
            .collect()
    }

    fn content_added_after(
        &self,
        collection: &CollectionId,
        after: Timestamp,
    ) -> StoreResult<BTreeSet<StixId>> {
        let conn = self.conn()?;
        let table = self.table(Table::CollectionContent);
        // Fixed-width UTC text sorts in time order.
        let sql = format!(
            "SELECT DISTINCT \"stix_id\" FROM \"{table}\" \
             WHERE \"collection_id\" = ?1 AND \"date_added\" > ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![collection.to_string(), after.to_string()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        ids.iter()
            .map(|id| StixId::parse(id).map_err(|e| corrupt(table, e)))
            .collect()
    }
}

impl ObjectVersionStore for SqliteDatastore {
    fn put_version(&self, object: &Object) -> StoreResult<()> {
        object.ensure_valid()?;
        let content = String::from_utf8(object.to_canonical_form()?)
            .map_err(|e| corrupt(self.table(Table::ObjectVersion), e))?;
        let (id, modified) = object.version_key();

        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO \"{}\" (\"date_added\", \"id\", \"object_type\", \"modified\", \"content\") \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            self.table(Table::ObjectVersion)
        );
        conn.execute(
            &sql,
            params![
                Timestamp::now().to_string(),
                id.to_string(),
                object.object_type().as_str(),
                modified.to_string(),
                content,
            ],
        )
        .map_err(|e| StoreError::from_insert(e, "object version", format!("{id}@{modified}")))?;

        debug!(%id, %modified, bytes = content.len(), "stored object version");
        Ok(())
    }

    fn get_version(&self, id: &StixId, modified: Timestamp) -> StoreResult<Option<Object>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"content\" FROM \"{}\" WHERE \"id\" = ?1 AND \"modified\" = ?2",
            self.table(Table::ObjectVersion)
        );
        let content: Option<String> = conn
            .query_row(&sql, params![id.to_string(), modified.to_string()], |row| {
                row.get(0)
            })
            .optional()?;
        content.map(|c| self.decode_object(&c)).transpose()
    }

    fn versions(&self, id: &StixId) -> StoreResult<Vec<Object>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"content\" FROM \"{}\" WHERE \"id\" = ?1 ORDER BY \"modified\"",
            self.table(Table::ObjectVersion)
        );
        let mut stmt = conn.prepare(&sql)?;
        let contents = stmt
            .query_map(params![id.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        contents.iter().map(|c| self.decode_object(c)).collect()
    }

    fn latest_version(&self, id: &StixId) -> StoreResult<Option<Object>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT \"content\" FROM \"{}\" WHERE \"id\" = ?1 ORDER BY \"modified\" DESC LIMIT 1",
            self.table(Table::ObjectVersion)
        );
        let content: Option<String> = conn
            .query_row(&sql, params![id.to_string()], |row| row.get(0))
            .optional()?;
        content.map(|c| self.decode_object(&c)).transpose()
    }
}
