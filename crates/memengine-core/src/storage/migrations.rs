//! Database schema
//!
//! The seven logical tables of the persistence contract (spec section 3),
//! created with `IF NOT EXISTS` so `initialize()` is idempotent across every
//! component, mirroring the teacher's versioned-migration list. This engine
//! ships one schema version: there is no prior on-disk shape to migrate
//! away from, so a single "initial schema" migration is enough, applied the
//! same way the teacher applies `MIGRATIONS` in order at `Storage::new`.

/// A single forward-only schema migration.
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: kv_memory, blocks, archival, embeddings, summaries",
    up: MIGRATION_V1_UP,
}];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS kv_memory (
    purpose TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_kv_memory_updated ON kv_memory(updated_at DESC);

CREATE TABLE IF NOT EXISTS blocks (
    id TEXT PRIMARY KEY,
    label TEXT NOT NULL,
    content TEXT NOT NULL,
    type TEXT NOT NULL DEFAULT 'core',
    updated_at INTEGER NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_blocks_type_updated ON blocks(type, updated_at DESC);
CREATE INDEX IF NOT EXISTS idx_blocks_label ON blocks(label);

CREATE TABLE IF NOT EXISTS archival (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    vector_id TEXT
);
CREATE INDEX IF NOT EXISTS idx_archival_created ON archival(created_at DESC);

CREATE TABLE IF NOT EXISTS block_embeddings (
    block_id TEXT PRIMARY KEY,
    embedding TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS archival_embeddings (
    entry_id TEXT PRIMARY KEY,
    embedding TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    summary TEXT NOT NULL,
    summary_level INTEGER NOT NULL,
    message_count INTEGER NOT NULL,
    parent_summary_id INTEGER REFERENCES summaries(id),
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_summaries_level_created ON summaries(summary_level, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_summaries_parent ON summaries(parent_summary_id);
"#;

/// Apply every migration in order against `conn`. Idempotent: re-running
/// against an already-migrated database is a no-op (every statement is
/// `IF NOT EXISTS`).
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    for migration in MIGRATIONS {
        tracing::debug!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        conn.execute_batch(migration.up)?;
    }
    Ok(())
}
