//! KV Memory Store (C3)
//!
//! The flat `purpose -> text` legacy surface, plus the prompt-fragment
//! builder the host concatenates into the agent's system prompt.

use chrono::{TimeZone, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::storage::Store;

/// A single `kv_memory` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvEntry {
    pub purpose: String,
    pub text: String,
    /// Milliseconds since epoch.
    pub updated_at: i64,
}

/// Markers that, when present case-insensitively in an entry's text, mark
/// it as sensitive in the directory listing (spec section 4.3).
const PRIVACY_MARKERS: &[&str] = &["[PRIVATE]", "[CONFIDENTIAL]", "[DO NOT SHARE]", "[PERSONAL]"];

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn truncate_preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push('…');
    }
    preview
}

fn has_privacy_marker(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRIVACY_MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

impl Store {
    /// Create `kv_memory` and its index, if absent. Idempotent.
    pub fn kv_initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_memory (
                purpose TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_kv_memory_updated ON kv_memory(updated_at DESC);",
        )
        .map_err(EngineError::storage("kv_initialize"))?;
        Ok(())
    }

    /// Load and cache every `kv_memory` row, newest first.
    pub fn kv_load_all(&self) -> Result<Vec<KvEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT purpose, text, updated_at FROM kv_memory ORDER BY updated_at DESC")
            .map_err(EngineError::storage("kv_load_all"))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(KvEntry {
                    purpose: row.get(0)?,
                    text: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            })
            .map_err(EngineError::storage("kv_load_all"))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(EngineError::storage("kv_load_all"))?);
        }
        drop(conn);

        let mut cache = self.kv_cache.lock().unwrap();
        cache.clear();
        for entry in &entries {
            cache.insert(entry.purpose.clone(), entry.clone());
        }

        Ok(entries)
    }

    /// Upsert `purpose -> text` with `updated_at = now`.
    pub fn kv_write(&self, purpose: &str, text: &str) -> Result<KvEntry> {
        let updated_at = now_ms();
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO kv_memory (purpose, text, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(purpose) DO UPDATE SET text = excluded.text, updated_at = excluded.updated_at",
                params![purpose, text, updated_at],
            )
            .map_err(EngineError::storage("kv_write"))?;
        }

        let entry = KvEntry {
            purpose: purpose.to_string(),
            text: text.to_string(),
            updated_at,
        };
        self.kv_cache
            .lock()
            .unwrap()
            .insert(purpose.to_string(), entry.clone());
        Ok(entry)
    }

    /// Cache-first lookup; falls through to a row query on miss.
    pub fn kv_read(&self, purpose: &str) -> Result<Option<KvEntry>> {
        if let Some(entry) = self.kv_cache.lock().unwrap().get(purpose) {
            return Ok(Some(entry.clone()));
        }

        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                "SELECT purpose, text, updated_at FROM kv_memory WHERE purpose = ?1",
                params![purpose],
                |row| {
                    Ok(KvEntry {
                        purpose: row.get(0)?,
                        text: row.get(1)?,
                        updated_at: row.get(2)?,
                    })
                },
            )
            .ok();
        drop(conn);

        if let Some(ref entry) = entry {
            self.kv_cache
                .lock()
                .unwrap()
                .insert(purpose.to_string(), entry.clone());
        }
        Ok(entry)
    }

    /// Remove a `kv_memory` row and its cache entry.
    pub fn kv_delete(&self, purpose: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM kv_memory WHERE purpose = ?1", params![purpose])
            .map_err(EngineError::storage("kv_delete"))?;
        drop(conn);
        self.kv_cache.lock().unwrap().remove(purpose);
        Ok(())
    }

    /// Build the instructional prompt fragment: a directory of every
    /// cached entry, the full entries with human-readable timestamps, and
    /// a fixed policy section. Never fails.
    pub fn kv_build_prompt_fragment(&self) -> String {
        let cache = self.kv_cache.lock().unwrap();
        let mut entries: Vec<&KvEntry> = cache.values().collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        if entries.is_empty() {
            return kv_policy_section();
        }

        let mut out = String::new();
        out.push_str("## Memory Directory\n\n");
        for entry in &entries {
            let preview = truncate_preview(&entry.text, 60);
            let lock = if has_privacy_marker(&entry.text) { " 🔒" } else { "" };
            out.push_str(&format!("- {}{}: {}\n", entry.purpose, lock, preview));
        }
        out.push('\n');

        out.push_str("## Memory Entries\n\n");
        for entry in &entries {
            let ts = format_timestamp(entry.updated_at);
            out.push_str(&format!(
                "### {}\n*Last updated: {}*\n\n{}\n\n---\n\n",
                entry.purpose, ts, entry.text
            ));
        }

        out.push_str(&kv_policy_section());
        out
    }
}

fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

fn kv_policy_section() -> String {
    "## Memory Policy\n\n\
     **When to write:** record durable facts about the user, the agent's persona, \
     or ongoing context as soon as they are established — do not wait to be asked.\n\n\
     **What to store:** stable facts, preferences, and identity information. Prefer \
     core blocks over this legacy key/value store for anything that should render \
     as structured, always-on context.\n\n\
     **Read before write:** always read an existing entry before overwriting it, so \
     you preserve details the new write doesn't mention.\n\n\
     **Block organization:** prefer `human`, `persona`, and `context` core blocks for \
     anything that belongs in every prompt; use archival entries for everything else.\n"
        .to_string()
}
