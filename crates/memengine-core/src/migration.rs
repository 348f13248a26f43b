//! Migration: legacy `kv_memory` → typed `blocks` (C7)
//!
//! One-time upgrade path for stores created before the block model
//! existed, plus its inverse and the reverse export used by hosts that
//! still want a flat key/value snapshot.

use serde::{Deserialize, Serialize};

use crate::blocks::{BlockType, InsertPosition};
use crate::error::{EngineError, Result};
use crate::storage::Store;

const STANDARD_BLOCKS: &[&str] = &["human", "persona", "context"];

/// Result of `migrate_kv_to_blocks`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    pub total: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Classify a `kv_memory` purpose into the core block it belongs in.
/// Matching is case-insensitive substring matching against the three
/// alternations spec'd; no `regex` dependency is pulled in for three
/// `contains` checks.
fn classify(purpose: &str) -> &'static str {
    let p = purpose.to_lowercase();
    const HUMAN: &[&str] = &["user", "customer", "person", "human", "client", "people"];
    const PERSONA: &[&str] = &["agent", "persona", "identity", "role", "assistant"];

    if HUMAN.iter().any(|kw| p.contains(kw)) {
        "human"
    } else if PERSONA.iter().any(|kw| p.contains(kw)) {
        "persona"
    } else {
        "context"
    }
}

fn table_exists(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|row| row.is_some())
}

use rusqlite::OptionalExtension;

impl Store {
    /// `true` iff `kv_memory` exists with at least one row AND `blocks` is
    /// empty or missing. Missing tables resolve either query to `false`
    /// rather than erroring, since "no such table" just means there is
    /// nothing to migrate.
    pub fn migration_needed(&self) -> Result<bool> {
        let conn = self.conn.lock().unwrap();

        let kv_has_rows = if table_exists(&conn, "kv_memory")
            .map_err(EngineError::storage("migration_needed"))?
        {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM kv_memory", [], |row| row.get(0))
                .unwrap_or(0);
            count >= 1
        } else {
            false
        };

        if !kv_has_rows {
            return Ok(false);
        }

        let blocks_empty = if table_exists(&conn, "blocks")
            .map_err(EngineError::storage("migration_needed"))?
        {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
                .unwrap_or(0);
            count == 0
        } else {
            true
        };

        Ok(blocks_empty)
    }

    /// Move every `kv_memory` row into the appropriate standard core
    /// block, then rename `kv_memory` out of the way. Individual row
    /// failures are collected into `errors` and counted as skipped; they
    /// do not abort the migration.
    pub async fn migrate_kv_to_blocks(&self) -> Result<MigrationReport> {
        for label in STANDARD_BLOCKS {
            if self.get_block(label)?.is_none() {
                self.create_block(label, label, "", BlockType::Core).await?;
            }
        }

        let rows = {
            let conn = self.conn.lock().unwrap();
            if !table_exists(&conn, "kv_memory").map_err(EngineError::storage("migrate_kv_to_blocks"))? {
                drop(conn);
                return Ok(MigrationReport::default());
            }
            let mut stmt = conn
                .prepare("SELECT purpose, text FROM kv_memory ORDER BY updated_at ASC")
                .map_err(EngineError::storage("migrate_kv_to_blocks"))?;
            let rows = stmt
                .query_map([], |row| {
                    let purpose: String = row.get(0)?;
                    let text: String = row.get(1)?;
                    Ok((purpose, text))
                })
                .map_err(EngineError::storage("migrate_kv_to_blocks"))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(EngineError::storage("migrate_kv_to_blocks"))?);
            }
            out
        };

        let mut report = MigrationReport {
            total: rows.len(),
            ..Default::default()
        };

        for (purpose, text) in rows {
            let target = classify(&purpose);
            let entry = format!("**{}**\n{}", purpose, text);
            match self.insert_content(target, &entry, InsertPosition::End).await {
                Ok(_) => report.migrated += 1,
                Err(e) => {
                    report.skipped += 1;
                    report.errors.push(format!("{purpose}: {e}"));
                }
            }
        }

        if report.migrated > 0 {
            let conn = self.conn.lock().unwrap();
            if let Err(e) = conn.execute_batch("ALTER TABLE kv_memory RENAME TO kv_memory_backup") {
                tracing::warn!(error = %e, "kv_memory rename to backup failed; leaving original table in place");
            }
        }

        Ok(report)
    }

    /// Reverse a migration: require `kv_memory_backup` to exist, drop any
    /// `kv_memory` that was recreated since, and rename the backup back.
    pub fn rollback_migration(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        if !table_exists(&conn, "kv_memory_backup").map_err(EngineError::storage("rollback_migration"))? {
            return Err(EngineError::MemoryFailure {
                operation: "rollback_migration",
                reason: "no kv_memory_backup table to restore from".to_string(),
            });
        }
        conn.execute_batch(
            "DROP TABLE IF EXISTS kv_memory; ALTER TABLE kv_memory_backup RENAME TO kv_memory",
        )
        .map_err(EngineError::storage("rollback_migration"))?;
        Ok(())
    }

    /// Snapshot every core block back into `kv_memory` as
    /// `purpose = lowercase(label, spaces -> underscores)`. Returns the
    /// number of blocks exported.
    pub fn export_blocks_to_kv(&self) -> Result<usize> {
        self.kv_initialize()?;
        let blocks = self.get_all_blocks(Some(BlockType::Core))?;
        for block in &blocks {
            let purpose = block.label.to_lowercase().replace(' ', "_");
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO kv_memory (purpose, text, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(purpose) DO UPDATE SET text = excluded.text, updated_at = excluded.updated_at",
                rusqlite::params![purpose, block.content, block.updated_at],
            )
            .map_err(EngineError::storage("export_blocks_to_kv"))?;
        }
        Ok(blocks.len())
    }
}
