use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::schema::SchemaRegistry;

/// How `set_accepted_media_types` treats rows already present for a
/// collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaTypePolicy {
    /// Insert the new list after whatever is already stored.
    #[default]
    Append,
    /// Delete the collection's rows, then insert the new list, atomically.
    Replace,
}

/// Store configuration, usually read from a TOML file.
///
/// ```toml
/// database = "cti-vault.db"
/// pool_size = 8
/// busy_timeout_ms = 5000
/// table_prefix = "taxii_"
/// media_type_policy = "replace"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file, or `:memory:` for a private in-memory database.
    pub database: PathBuf,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
    pub table_prefix: Option<String>,
    pub media_type_policy: MediaTypePolicy,
}

impl StoreConfig {
    /// Database path that selects the in-memory engine.
    pub const IN_MEMORY: &'static str = ":memory:";

    /// Configuration for a throwaway in-memory database.
    pub fn in_memory() -> Self {
        Self {
            database: PathBuf::from(Self::IN_MEMORY),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database.as_os_str() == Self::IN_MEMORY
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Table names resolved from `table_prefix`.
    pub fn schema(&self) -> StoreResult<SchemaRegistry> {
        match &self.table_prefix {
            Some(prefix) => SchemaRegistry::with_prefix(prefix),
            None => Ok(SchemaRegistry::new()),
        }
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.pool_size == 0 {
            return Err(StoreError::Config("pool_size must be at least 1".into()));
        }
        if self.database.as_os_str().is_empty() {
            return Err(StoreError::Config("database must not be empty".into()));
        }
        self.schema().map(|_| ())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("cti-vault.db"),
            pool_size: 8,
            busy_timeout_ms: 5_000,
            table_prefix: None,
            media_type_policy: MediaTypePolicy::Append,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Table;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.database, PathBuf::from("cti-vault.db"));
        assert_eq!(c.pool_size, 8);
        assert_eq!(c.busy_timeout(), Duration::from_secs(5));
        assert_eq!(c.media_type_policy, MediaTypePolicy::Append);
        assert!(!c.is_in_memory());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = StoreConfig::from_toml_str(
            r#"
            database = ":memory:"
            media_type_policy = "replace"
            "#,
        )
        .unwrap();
        assert!(c.is_in_memory());
        assert_eq!(c.media_type_policy, MediaTypePolicy::Replace);
        assert_eq!(c.pool_size, 8);
    }

    #[test]
    fn prefix_reaches_schema() {
        let c = StoreConfig::from_toml_str(r#"table_prefix = "feed_""#).unwrap();
        assert_eq!(c.schema().unwrap().name(Table::Collection), "feed_collection");
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            StoreConfig::from_toml_str("pool_size = 0"),
            Err(StoreError::Config(_))
        ));
        assert!(StoreConfig::from_toml_str(r#"table_prefix = "a b""#).is_err());
        assert!(StoreConfig::from_toml_str(r#"media_type_policy = "merge""#).is_err());
        assert!(StoreConfig::from_toml_str("pool_size = ").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");
        std::fs::write(&path, "busy_timeout_ms = 250\n").unwrap();
        let c = StoreConfig::load(&path).unwrap();
        assert_eq!(c.busy_timeout(), Duration::from_millis(250));

        assert!(StoreConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
