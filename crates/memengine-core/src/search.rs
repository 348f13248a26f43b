//! Semantic Index (C5)
//!
//! Parallel embedding tables keyed by block-id / archival-id, cosine
//! ranking, and the best-effort refresh/ensure passes that keep them
//! loosely in sync with `blocks` and `archival` content (spec section 3's
//! weak-reference semantics: these rows are a lossy cache, never a
//! consistency guarantee).

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::params;

use crate::blocks::{ArchivalEntry, Block};
use crate::embeddings::cosine_similarity;
use crate::error::{EngineError, Result};
use crate::storage::Store;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn encode(vector: &[f32]) -> Result<String> {
    serde_json::to_string(vector).map_err(|e| EngineError::MemoryFailure {
        operation: "encode_embedding",
        reason: e.to_string(),
    })
}

fn decode(text: &str) -> Result<Vec<f32>> {
    serde_json::from_str(text).map_err(|e| EngineError::MemoryFailure {
        operation: "decode_embedding",
        reason: e.to_string(),
    })
}

impl Store {
    pub fn store_block_embedding(&self, id: &str, vector: &[f32]) -> Result<()> {
        let encoded = encode(vector)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO block_embeddings (block_id, embedding, updated_at) \
             VALUES (?1, ?2, ?3)",
            params![id, encoded, now_ms()],
        )
        .map_err(EngineError::storage("store_block_embedding"))?;
        Ok(())
    }

    pub fn store_archival_embedding(&self, id: &str, vector: &[f32]) -> Result<()> {
        let encoded = encode(vector)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO archival_embeddings (entry_id, embedding, updated_at) \
             VALUES (?1, ?2, ?3)",
            params![id, encoded, now_ms()],
        )
        .map_err(EngineError::storage("store_archival_embedding"))?;
        Ok(())
    }

    pub fn delete_block_embedding(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM block_embeddings WHERE block_id = ?1", params![id])
            .map_err(EngineError::storage("delete_block_embedding"))?;
        Ok(())
    }

    pub fn delete_archival_embedding(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM archival_embeddings WHERE entry_id = ?1", params![id])
            .map_err(EngineError::storage("delete_archival_embedding"))?;
        Ok(())
    }

    pub fn load_all_block_embeddings(&self) -> Result<HashMap<String, Vec<f32>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT block_id, embedding FROM block_embeddings")
            .map_err(EngineError::storage("load_all_block_embeddings"))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let encoded: String = row.get(1)?;
                Ok((id, encoded))
            })
            .map_err(EngineError::storage("load_all_block_embeddings"))?;

        let mut out = HashMap::new();
        for row in rows {
            let (id, encoded) = row.map_err(EngineError::storage("load_all_block_embeddings"))?;
            out.insert(id, decode(&encoded)?);
        }
        Ok(out)
    }

    pub fn load_all_archival_embeddings(&self) -> Result<HashMap<String, Vec<f32>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT entry_id, embedding FROM archival_embeddings")
            .map_err(EngineError::storage("load_all_archival_embeddings"))?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let encoded: String = row.get(1)?;
                Ok((id, encoded))
            })
            .map_err(EngineError::storage("load_all_archival_embeddings"))?;

        let mut out = HashMap::new();
        for row in rows {
            let (id, encoded) = row.map_err(EngineError::storage("load_all_archival_embeddings"))?;
            out.insert(id, decode(&encoded)?);
        }
        Ok(out)
    }

    /// Best-effort: embed `content` and store it for `id`, swallowing any
    /// embedding-gateway failure at warning level. Called inline by every
    /// block-mutating operation so the SQL write itself never depends on
    /// embedding availability.
    pub(crate) async fn refresh_block_embedding(&self, id: &str, content: &str) {
        match self.embeddings.embed(content).await {
            Ok(vector) => {
                if let Err(e) = self.store_block_embedding(id, &vector) {
                    tracing::warn!(block_id = id, error = %e, "failed to persist block embedding");
                }
            }
            Err(e) => {
                tracing::warn!(block_id = id, error = %e, "embedding refresh unavailable");
            }
        }
    }

    pub(crate) async fn refresh_archival_embedding(&self, id: &str, content: &str) {
        match self.embeddings.embed(content).await {
            Ok(vector) => {
                if let Err(e) = self.store_archival_embedding(id, &vector) {
                    tracing::warn!(entry_id = id, error = %e, "failed to persist archival embedding");
                }
            }
            Err(e) => {
                tracing::warn!(entry_id = id, error = %e, "embedding refresh unavailable");
            }
        }
    }

    /// For every block without a stored embedding, generate and store one.
    /// Continues past per-item failures; returns the count of successful
    /// generations (spec section 4.5's preferred policy).
    pub async fn ensure_block_embeddings(&self, blocks: &[Block]) -> Result<usize> {
        let existing = self.load_all_block_embeddings()?;
        let mut generated = 0;
        for block in blocks {
            if existing.contains_key(&block.id) {
                continue;
            }
            match self.embeddings.embed(&block.content).await {
                Ok(vector) => {
                    if let Err(e) = self.store_block_embedding(&block.id, &vector) {
                        tracing::warn!(block_id = %block.id, error = %e, "failed to store embedding");
                        continue;
                    }
                    generated += 1;
                }
                Err(e) => {
                    tracing::warn!(block_id = %block.id, error = %e, "skipping embedding generation");
                }
            }
        }
        Ok(generated)
    }

    /// Same contract as `ensure_block_embeddings`, for archival entries.
    pub async fn ensure_archival_embeddings(&self, entries: &[ArchivalEntry]) -> Result<usize> {
        let existing = self.load_all_archival_embeddings()?;
        let mut generated = 0;
        for entry in entries {
            if existing.contains_key(&entry.id) {
                continue;
            }
            match self.embeddings.embed(&entry.content).await {
                Ok(vector) => {
                    if let Err(e) = self.store_archival_embedding(&entry.id, &vector) {
                        tracing::warn!(entry_id = %entry.id, error = %e, "failed to store embedding");
                        continue;
                    }
                    generated += 1;
                }
                Err(e) => {
                    tracing::warn!(entry_id = %entry.id, error = %e, "skipping embedding generation");
                }
            }
        }
        Ok(generated)
    }

    /// Semantic search over `blocks`: embeds `query`, scores every input
    /// block that already has a stored embedding, keeps scores at or above
    /// `threshold`, and returns the top `limit` by score (stable tie-break
    /// on input order). Blocks without an embedding are silently skipped,
    /// not scored as zero. Fails if the embedding gateway is unavailable —
    /// callers must fall back to `search_archival_text`/substring search.
    pub async fn search_blocks(
        &self,
        query: &str,
        blocks: &[Block],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<(Block, f32)>> {
        let q = self
            .embeddings
            .embed(query)
            .await
            .map_err(|e| EngineError::EmbeddingUnavailable(e.to_string()))?;
        let all_embeddings = self.load_all_block_embeddings()?;

        let mut scored: Vec<(usize, Block, f32)> = Vec::new();
        for (idx, block) in blocks.iter().enumerate() {
            let Some(embedding) = all_embeddings.get(&block.id) else {
                continue;
            };
            let score = cosine_similarity(&q, embedding)?;
            if score >= threshold {
                scored.push((idx, block.clone(), score));
            }
        }

        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, block, score)| (block, score))
            .collect())
    }

    /// Identical contract to `search_blocks`, against archival entries.
    pub async fn search_archival_semantic(
        &self,
        query: &str,
        entries: &[ArchivalEntry],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<(ArchivalEntry, f32)>> {
        let q = self
            .embeddings
            .embed(query)
            .await
            .map_err(|e| EngineError::EmbeddingUnavailable(e.to_string()))?;
        let all_embeddings = self.load_all_archival_embeddings()?;

        let mut scored: Vec<(usize, ArchivalEntry, f32)> = Vec::new();
        for (idx, entry) in entries.iter().enumerate() {
            let Some(embedding) = all_embeddings.get(&entry.id) else {
                continue;
            };
            let score = cosine_similarity(&q, embedding)?;
            if score >= threshold {
                scored.push((idx, entry.clone(), score));
            }
        }

        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, entry, score)| (entry, score))
            .collect())
    }
}
