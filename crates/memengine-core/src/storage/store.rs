//! The `Store` handle
//!
//! One `Store` per agent/session, matching spec section 5's single-writer,
//! single-threaded-per-store concurrency model. Unlike the teacher's
//! `Storage` (which splits reader/writer connections to stay `Send + Sync`
//! under concurrent FSRS scheduling), this engine has no such contention —
//! spec explicitly scopes concurrent access from two tasks on one store as
//! undefined behavior — so a single `Mutex<Connection>` is the whole SQL
//! Gateway binding. The mutex exists only so `Store` itself can be held
//! behind `Arc` by a host without `unsafe`; it is never expected to block.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::blocks::Block;
use crate::config::MemoryEngineConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{EngineError, Result};
use crate::kv::KvEntry;
use crate::llm::LlmProvider;

use super::migrations;

/// The durable memory engine's single-co-located-SQL-store handle.
///
/// Owns the SQLite connection, the best-effort in-process caches for
/// `kv_memory` and core `blocks` rows (spec section 3's "Ownership &
/// lifecycle"), and the two external collaborators (embedding + LLM
/// gateways) content and summarization operations dispatch to.
pub struct Store {
    pub(crate) conn: Mutex<Connection>,
    pub(crate) config: MemoryEngineConfig,
    pub(crate) embeddings: Arc<dyn EmbeddingProvider>,
    pub(crate) llm: Option<Arc<dyn LlmProvider>>,
    pub(crate) kv_cache: Mutex<HashMap<String, KvEntry>>,
    pub(crate) block_cache: Mutex<HashMap<String, Block>>,
}

impl Store {
    /// Open (creating if necessary) the SQLite database at `db_path`, or at
    /// a platform-specific default location when `None`, matching the
    /// teacher's `Storage::new(None)` convention.
    pub fn open(
        db_path: Option<PathBuf>,
        config: MemoryEngineConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let dirs = directories::ProjectDirs::from("com", "memengine", "core")
                    .ok_or_else(|| {
                        EngineError::Init("could not determine project directories".to_string())
                    })?;
                let data_dir = dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let _ = std::fs::set_permissions(data_dir, std::fs::Permissions::from_mode(0o700));
                }
                data_dir.join("memengine.db")
            }
        };

        let conn = Connection::open(&path).map_err(EngineError::storage("open"))?;
        Self::configure_connection(&conn)?;
        migrations::apply_migrations(&conn).map_err(EngineError::storage("migrate"))?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600));
        }

        let store = Self {
            conn: Mutex::new(conn),
            config,
            embeddings,
            llm,
            kv_cache: Mutex::new(HashMap::new()),
            block_cache: Mutex::new(HashMap::new()),
        };

        // Best-effort cache warm: a freshly migrated store has empty
        // tables, and a store opened against a not-yet-migrated legacy
        // database tolerates missing tables here (spec section 3, "Core
        // block cache ... populated at open (best-effort)").
        let _ = store.kv_load_all();
        let _ = store.get_all_blocks(None);

        Ok(store)
    }

    /// Open an in-memory store. Useful for tests and short-lived sessions
    /// that don't need to persist across process restarts.
    pub fn open_in_memory(
        config: MemoryEngineConfig,
        embeddings: Arc<dyn EmbeddingProvider>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(EngineError::storage("open"))?;
        Self::configure_connection(&conn)?;
        migrations::apply_migrations(&conn).map_err(EngineError::storage("migrate"))?;

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            embeddings,
            llm,
            kv_cache: Mutex::new(HashMap::new()),
            block_cache: Mutex::new(HashMap::new()),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(EngineError::storage("configure"))?;
        Ok(())
    }

    pub fn config(&self) -> &MemoryEngineConfig {
        &self.config
    }
}
