//! Schema registry.
//!
//! The tables the store owns are enumerated by [`Table`]; a
//! [`SchemaRegistry`] value resolves each to a concrete table name and renders
//! the DDL. The registry is handed to a backend at construction so no query
//! hard-codes a table name.

use crate::error::{StoreError, StoreResult};

/// Tables owned by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    /// Registered collections.
    Collection,
    /// Media types each collection accepts; many rows per collection.
    CollectionMediaType,
    /// Append-only index mapping a collection to object identities.
    CollectionContent,
    /// Immutable object versions keyed by `(id, modified)`.
    ObjectVersion,
}

/// A secondary index on one table.
struct IndexDef {
    suffix: &'static str,
    unique: bool,
    columns: &'static str,
}

impl Table {
    pub const ALL: [Table; 4] = [
        Self::Collection,
        Self::CollectionMediaType,
        Self::CollectionContent,
        Self::ObjectVersion,
    ];

    pub fn default_name(&self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::CollectionMediaType => "collection_media_type",
            Self::CollectionContent => "collection_content",
            Self::ObjectVersion => "stix_object_version",
        }
    }

    fn index(&self) -> usize {
        match self {
            Self::Collection => 0,
            Self::CollectionMediaType => 1,
            Self::CollectionContent => 2,
            Self::ObjectVersion => 3,
        }
    }

    // collection.id is the UUIDv4 clients address; row_id is internal.
    // collection_content.stix_id names an object identity, never a version
    // row, so one query reaches every version of every member.
    fn columns(&self) -> &'static str {
        match self {
            Self::Collection => {
                r#"
                "row_id" INTEGER PRIMARY KEY,
                "date_added" TEXT NOT NULL,
                "enabled" INTEGER(1,0) NOT NULL DEFAULT 1,
                "id" TEXT NOT NULL,
                "title" TEXT NOT NULL,
                "description" TEXT,
                "can_read" INTEGER(1,0) NOT NULL DEFAULT 0,
                "can_write" INTEGER(1,0) NOT NULL DEFAULT 0
                "#
            }
            Self::CollectionMediaType => {
                r#"
                "row_id" INTEGER PRIMARY KEY,
                "collection_id" TEXT NOT NULL,
                "media_type" TEXT NOT NULL
                "#
            }
            Self::CollectionContent => {
                r#"
                "row_id" INTEGER PRIMARY KEY,
                "date_added" TEXT NOT NULL,
                "collection_id" TEXT NOT NULL,
                "stix_id" TEXT NOT NULL
                "#
            }
            Self::ObjectVersion => {
                r#"
                "row_id" INTEGER PRIMARY KEY,
                "date_added" TEXT NOT NULL,
                "id" TEXT NOT NULL,
                "object_type" TEXT NOT NULL,
                "modified" TEXT NOT NULL,
                "content" TEXT NOT NULL
                "#
            }
        }
    }

    fn indexes(&self) -> &'static [IndexDef] {
        match self {
            Self::Collection => &[IndexDef {
                suffix: "id",
                unique: true,
                columns: r#""id""#,
            }],
            Self::CollectionMediaType => &[IndexDef {
                suffix: "collection",
                unique: false,
                columns: r#""collection_id""#,
            }],
            Self::CollectionContent => &[
                IndexDef {
                    suffix: "collection",
                    unique: false,
                    columns: r#""collection_id", "date_added""#,
                },
                IndexDef {
                    suffix: "stix",
                    unique: false,
                    columns: r#""stix_id""#,
                },
            ],
            Self::ObjectVersion => &[IndexDef {
                suffix: "version",
                unique: true,
                columns: r#""id", "modified""#,
            }],
        }
    }
}

/// One DDL statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaStatement {
    pub sql: String,
    /// For a unique index, a query yielding one row per key that already
    /// occurs more than once. Creating the index fails while it yields rows.
    pub duplicates: Option<String>,
    /// Index name, for unique indexes.
    pub index: Option<String>,
}

/// Resolved table names plus DDL rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaRegistry {
    names: [String; 4],
}

impl SchemaRegistry {
    /// Registry using the default table names.
    pub fn new() -> Self {
        Self {
            names: Table::ALL.map(|t| t.default_name().to_string()),
        }
    }

    /// Registry whose table names all start with `prefix`.
    ///
    /// The prefix is spliced into SQL, so it is restricted to lowercase ASCII
    /// letters, digits and `_`.
    pub fn with_prefix(prefix: &str) -> StoreResult<Self> {
        if !prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(StoreError::Config(format!(
                "table prefix {prefix:?} may only contain a-z, 0-9 and '_'"
            )));
        }
        Ok(Self {
            names: Table::ALL.map(|t| format!("{prefix}{}", t.default_name())),
        })
    }

    /// Concrete name of a table.
    pub fn name(&self, table: Table) -> &str {
        &self.names[table.index()]
    }

    /// `CREATE ... IF NOT EXISTS` statements for every table and index, in
    /// dependency-free order. Safe to run against an existing database.
    pub fn create_statements(&self) -> Vec<SchemaStatement> {
        let mut statements = Vec::new();
        for table in Table::ALL {
            let name = self.name(table);
            statements.push(SchemaStatement {
                sql: format!("CREATE TABLE IF NOT EXISTS \"{name}\" ({})", table.columns()),
                duplicates: None,
                index: None,
            });
            for index in table.indexes() {
                let index_name = format!("idx_{name}_{}", index.suffix);
                let unique = if index.unique { "UNIQUE " } else { "" };
                statements.push(SchemaStatement {
                    sql: format!(
                        "CREATE {unique}INDEX IF NOT EXISTS \"{index_name}\" ON \"{name}\" ({})",
                        index.columns
                    ),
                    duplicates: index.unique.then(|| {
                        format!(
                            "SELECT {cols} FROM \"{name}\" GROUP BY {cols} HAVING COUNT(*) > 1",
                            cols = index.columns
                        )
                    }),
                    index: index.unique.then(|| index_name.clone()),
                });
            }
        }
        statements
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
