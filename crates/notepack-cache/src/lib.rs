//! # notepack-cache
//!
//! Persistent module content cache.
//!
//! Fetched module bodies are memoized under their fully-qualified content
//! URL so repeat bundles skip the network. Keys that embed an exact package
//! version are content-addressed by convention, so entries are immutable
//! once written: there is no TTL and no eviction.
//!
//! Two implementations of [`ContentCache`] are provided: [`ModuleCache`]
//! (redb-backed, survives restarts) and [`MemoryCache`] (tests, ephemeral
//! embedding).

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

/// Cache table: content URL -> bincode-serialized [`CachedModule`].
const MODULE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("modules");

/// How the bundling engine should treat a cached body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Loader {
    /// JavaScript parsed with JSX grammar (the default for fetched modules).
    Jsx,
    /// Plain JavaScript.
    Js,
    /// Raw CSS. Loader output for CSS is pre-wrapped into JS, so this tag
    /// only appears if a caller stores unwrapped stylesheets.
    Css,
}

/// A loader result record: the module body plus resolution context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedModule {
    pub loader: Loader,
    pub contents: String,
    /// Directory of the final (post-redirect) response URL; nested relative
    /// imports resolve against this.
    pub resolve_dir: Option<String>,
}

/// Error types for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<redb::DatabaseError> for CacheError {
    fn from(err: redb::DatabaseError) -> Self {
        CacheError::Database(err.to_string())
    }
}

impl From<redb::TableError> for CacheError {
    fn from(err: redb::TableError) -> Self {
        CacheError::Database(err.to_string())
    }
}

impl From<redb::TransactionError> for CacheError {
    fn from(err: redb::TransactionError) -> Self {
        CacheError::Database(err.to_string())
    }
}

impl From<redb::StorageError> for CacheError {
    fn from(err: redb::StorageError) -> Self {
        CacheError::Database(err.to_string())
    }
}

impl From<redb::CommitError> for CacheError {
    fn from(err: redb::CommitError) -> Self {
        CacheError::Database(err.to_string())
    }
}

/// Key-value memoization layer over module fetches.
///
/// `get` and `set` are safe to call concurrently for different keys. Two
/// concurrent misses for the same key may both fetch and both write; the
/// last write wins and both writes carry equivalent content, so no
/// single-key locking is required.
pub trait ContentCache: Send + Sync {
    /// Look up a record by content URL. A missing or undecodable entry is
    /// a miss, never an error surfaced to the loader.
    fn get(&self, url: &str) -> Result<Option<CachedModule>, CacheError>;

    /// Store a record under a content URL, overwriting any previous value.
    fn set(&self, url: &str, module: &CachedModule) -> Result<(), CacheError>;
}

/// redb-backed persistent cache.
pub struct ModuleCache {
    db: Database,
}

impl ModuleCache {
    /// Open or create the cache at `<cache_dir>/modules.redb`.
    pub fn open(cache_dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(cache_dir)?;
        let db = Database::create(cache_dir.join("modules.redb"))?;

        // Make sure the table exists before any read transaction runs.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MODULE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

impl ContentCache for ModuleCache {
    fn get(&self, url: &str) -> Result<Option<CachedModule>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MODULE_TABLE)?;

        let Some(value) = table.get(url)? else {
            return Ok(None);
        };

        match bincode::deserialize(value.value()) {
            Ok(module) => Ok(Some(module)),
            Err(err) => {
                // A corrupt entry behaves like a miss; the loader will
                // re-fetch and overwrite it.
                tracing::warn!(url, error = %err, "dropping undecodable cache entry");
                Ok(None)
            }
        }
    }

    fn set(&self, url: &str, module: &CachedModule) -> Result<(), CacheError> {
        let bytes =
            bincode::serialize(module).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MODULE_TABLE)?;
            table.insert(url, bytes.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }
}

/// In-memory cache for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryCache {
    entries: parking_lot::Mutex<rustc_hash::FxHashMap<String, CachedModule>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ContentCache for MemoryCache {
    fn get(&self, url: &str) -> Result<Option<CachedModule>, CacheError> {
        Ok(self.entries.lock().get(url).cloned())
    }

    fn set(&self, url: &str, module: &CachedModule) -> Result<(), CacheError> {
        self.entries.lock().insert(url.to_string(), module.clone());
        Ok(())
    }
}
