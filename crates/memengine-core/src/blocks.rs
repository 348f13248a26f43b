//! Block Store (C4)
//!
//! Typed, labeled content blocks (`core` or `archival`) with edit
//! semantics, plus append-only archival entries. Every content-mutating
//! operation here schedules a best-effort embedding refresh through C5
//! (`crate::search`); the embedding step never aborts a successful SQL
//! write (spec section 4.5's graceful-degradation invariant).

use chrono::{TimeZone, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::storage::Store;

/// Whether a block is always-on prompt content or retrieved on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Core,
    Archival,
}

impl BlockType {
    fn as_str(self) -> &'static str {
        match self {
            BlockType::Core => "core",
            BlockType::Archival => "archival",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "archival" => BlockType::Archival,
            _ => BlockType::Core,
        }
    }
}

/// Where to splice newly inserted content relative to a block's existing
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Start,
    End,
}

/// A `blocks` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub label: String,
    pub content: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub updated_at: i64,
    pub metadata: serde_json::Value,
}

/// An `archival` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivalEntry {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub metadata: serde_json::Value,
    pub vector_id: Option<String>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn new_archival_id() -> String {
    // uuid v4's hex representation is already lowercase alphanumeric;
    // eight characters gives ample collision resistance for the weak
    // "globally unique" requirement on archival ids.
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("archival_{}_{}", now_ms(), &suffix[..8])
}

fn row_to_block(
    id: String,
    label: String,
    content: String,
    block_type: String,
    updated_at: i64,
    metadata: String,
) -> Block {
    let metadata = serde_json::from_str(&metadata).unwrap_or_else(|_| serde_json::json!({}));
    Block {
        id,
        label,
        content,
        block_type: BlockType::parse(&block_type),
        updated_at,
        metadata,
    }
}

impl Store {
    /// Create `blocks` and `archival`, if absent. Idempotent.
    pub fn blocks_initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocks (
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
            CREATE INDEX IF NOT EXISTS idx_archival_created ON archival(created_at DESC);",
        )
        .map_err(EngineError::storage("blocks_initialize"))?;
        Ok(())
    }

    /// Cache lookup, falling through to a row query on miss.
    pub fn get_block(&self, id: &str) -> Result<Option<Block>> {
        if let Some(block) = self.block_cache.lock().unwrap().get(id) {
            return Ok(Some(block.clone()));
        }

        let conn = self.conn.lock().unwrap();
        let block = conn
            .query_row(
                "SELECT id, label, content, type, updated_at, metadata FROM blocks WHERE id = ?1",
                params![id],
                |row| {
                    Ok(row_to_block(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(EngineError::storage("get_block"))?;
        drop(conn);

        if let Some(ref block) = block {
            self.block_cache
                .lock()
                .unwrap()
                .insert(block.id.clone(), block.clone());
        }
        Ok(block)
    }

    /// All blocks, newest-updated first, optionally filtered by type.
    /// Refreshes the cache for every row returned.
    pub fn get_all_blocks(&self, block_type: Option<BlockType>) -> Result<Vec<Block>> {
        let conn = self.conn.lock().unwrap();
        let mut blocks = Vec::new();

        let mut collect = |sql: &str, params: &[&dyn rusqlite::ToSql]| -> Result<()> {
            let mut stmt = conn.prepare(sql).map_err(EngineError::storage("get_all_blocks"))?;
            let rows = stmt
                .query_map(params, |row| {
                    Ok(row_to_block(
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                })
                .map_err(EngineError::storage("get_all_blocks"))?;
            for row in rows {
                blocks.push(row.map_err(EngineError::storage("get_all_blocks"))?);
            }
            Ok(())
        };

        match block_type {
            Some(t) => collect(
                "SELECT id, label, content, type, updated_at, metadata FROM blocks \
                 WHERE type = ?1 ORDER BY updated_at DESC",
                params![t.as_str()],
            )?,
            None => collect(
                "SELECT id, label, content, type, updated_at, metadata FROM blocks \
                 ORDER BY updated_at DESC",
                params![],
            )?,
        }
        drop(conn);

        let mut cache = self.block_cache.lock().unwrap();
        for block in &blocks {
            cache.insert(block.id.clone(), block.clone());
        }
        Ok(blocks)
    }

    /// Insert a new block. Fails with `BlockConflict` if `id` already
    /// exists. Schedules a best-effort embedding refresh.
    pub async fn create_block(
        &self,
        id: &str,
        label: &str,
        content: &str,
        block_type: BlockType,
    ) -> Result<Block> {
        if self.get_block(id)?.is_some() {
            return Err(EngineError::BlockConflict(id.to_string()));
        }

        let updated_at = now_ms();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO blocks (id, label, content, type, updated_at, metadata) \
                 VALUES (?1, ?2, ?3, ?4, ?5, '{}')",
                params![id, label, content, block_type.as_str(), updated_at],
            )
            .map_err(EngineError::storage("create_block"))?;
        }

        let block = Block {
            id: id.to_string(),
            label: label.to_string(),
            content: content.to_string(),
            block_type,
            updated_at,
            metadata: serde_json::json!({}),
        };
        self.block_cache
            .lock()
            .unwrap()
            .insert(id.to_string(), block.clone());

        self.refresh_block_embedding(id, content).await;
        Ok(block)
    }

    /// In-place content update. Schedules a best-effort embedding refresh.
    pub async fn update_block(&self, id: &str, content: &str) -> Result<Block> {
        let mut block = self
            .get_block(id)?
            .ok_or_else(|| EngineError::BlockNotFound(id.to_string()))?;

        let updated_at = now_ms();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "UPDATE blocks SET content = ?1, updated_at = ?2 WHERE id = ?3",
                params![content, updated_at, id],
            )
            .map_err(EngineError::storage("update_block"))?;
        }

        block.content = content.to_string();
        block.updated_at = updated_at;
        self.block_cache.lock().unwrap().insert(id.to_string(), block.clone());

        self.refresh_block_embedding(id, content).await;
        Ok(block)
    }

    /// Delete a block. Schedules best-effort embedding deletion.
    pub async fn delete_block(&self, id: &str) -> Result<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute("DELETE FROM blocks WHERE id = ?1", params![id])
                .map_err(EngineError::storage("delete_block"))?;
        }
        self.block_cache.lock().unwrap().remove(id);
        if let Err(e) = self.delete_block_embedding(id) {
            tracing::warn!(block_id = id, error = %e, "failed to delete stale block embedding");
        }
        Ok(())
    }

    /// Merge `new_text` into an existing block's content, separated by
    /// exactly one newline, then trim the result. Fails `BlockNotFound` if
    /// the block doesn't exist.
    pub async fn insert_content(
        &self,
        id: &str,
        new_text: &str,
        position: InsertPosition,
    ) -> Result<Block> {
        let block = self
            .get_block(id)?
            .ok_or_else(|| EngineError::BlockNotFound(id.to_string()))?;

        let merged = match position {
            InsertPosition::End => format!("{}\n{}", block.content, new_text),
            InsertPosition::Start => format!("{}\n{}", new_text, block.content),
        };
        let trimmed = merged.trim().to_string();
        self.update_block(id, &trimmed).await
    }

    /// Replace the first occurrence of `old_substr` with `new_substr`.
    /// Returns `ContentNotFound` if `old_substr` is absent — a structured
    /// failure, not a storage-layer error.
    pub async fn replace_content(
        &self,
        id: &str,
        old_substr: &str,
        new_substr: &str,
    ) -> Result<Block> {
        let block = self
            .get_block(id)?
            .ok_or_else(|| EngineError::BlockNotFound(id.to_string()))?;

        let Some(pos) = block.content.find(old_substr) else {
            return Err(EngineError::ContentNotFound(id.to_string()));
        };

        let mut replaced = String::with_capacity(block.content.len());
        replaced.push_str(&block.content[..pos]);
        replaced.push_str(new_substr);
        replaced.push_str(&block.content[pos + old_substr.len()..]);

        self.update_block(id, &replaced).await
    }

    /// Unconditional content replacement after a read-through existence
    /// check. `reason` is logged, never persisted.
    pub async fn rethink_block(
        &self,
        id: &str,
        new_content: &str,
        reason: Option<&str>,
    ) -> Result<Block> {
        if self.get_block(id)?.is_none() {
            return Err(EngineError::BlockNotFound(id.to_string()));
        }
        if let Some(reason) = reason {
            tracing::info!(block_id = id, reason, "rethinking block");
        }
        self.update_block(id, new_content).await
    }

    /// Append-only archival entry. Returns the generated id. Schedules a
    /// best-effort embedding of `content`.
    pub async fn insert_archival(
        &self,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<String> {
        let id = new_archival_id();
        let created_at = now_ms();
        let metadata = metadata.unwrap_or_else(|| serde_json::json!({}));
        let metadata_text = serde_json::to_string(&metadata)
            .map_err(|e| EngineError::MemoryFailure {
                operation: "insert_archival",
                reason: e.to_string(),
            })?;

        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO archival (id, content, created_at, metadata, vector_id) \
                 VALUES (?1, ?2, ?3, ?4, NULL)",
                params![id, content, created_at, metadata_text],
            )
            .map_err(EngineError::storage("insert_archival"))?;
        }

        self.refresh_archival_embedding(&id, content).await;
        Ok(id)
    }

    /// Fallback substring search over archival content.
    pub fn search_archival_text(&self, query: &str, limit: usize) -> Result<Vec<ArchivalEntry>> {
        let conn = self.conn.lock().unwrap();
        let pattern = format!("%{}%", query);
        let mut stmt = conn
            .prepare(
                "SELECT id, content, created_at, metadata, vector_id FROM archival \
                 WHERE content LIKE ?1 ORDER BY created_at DESC LIMIT ?2",
            )
            .map_err(EngineError::storage("search_archival_text"))?;
        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                let metadata_text: String = row.get(3)?;
                Ok(ArchivalEntry {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    created_at: row.get(2)?,
                    metadata: serde_json::from_str(&metadata_text).unwrap_or(serde_json::json!({})),
                    vector_id: row.get(4)?,
                })
            })
            .map_err(EngineError::storage("search_archival_text"))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(EngineError::storage("search_archival_text"))?);
        }
        Ok(entries)
    }

    /// Full scan of `archival`, newest first.
    pub fn get_all_archival(&self) -> Result<Vec<ArchivalEntry>> {
        self.search_archival_text("", usize::MAX)
    }

    /// `## Core Memory` prompt fragment. Empty string if there are no core
    /// blocks.
    pub fn build_core_prompt_fragment(&self) -> Result<String> {
        let blocks = self.get_all_blocks(Some(BlockType::Core))?;
        if blocks.is_empty() {
            return Ok(String::new());
        }

        let mut out = String::new();
        out.push_str("## Core Memory\n\n");
        for block in &blocks {
            let ts = Utc
                .timestamp_millis_opt(block.updated_at)
                .single()
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| block.updated_at.to_string());
            out.push_str(&format!(
                "### {} ({})\n*Last updated: {}*\n\n{}\n\n---\n\n",
                block.label, block.id, ts, block.content
            ));
        }
        out.push_str(
            "Use `memory_insert`, `memory_replace`, or `memory_rethink` to edit these blocks.\n",
        );
        Ok(out)
    }
}
