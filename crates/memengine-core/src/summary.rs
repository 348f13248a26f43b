//! Summary Ladder (C6)
//!
//! Hierarchical conversation-summary store with promotion rules and
//! context formatting. Level 0 summarizes raw messages; level L+1
//! summarizes a batch of `recursive_threshold` level-L summaries.

use chrono::{TimeZone, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::llm::LlmError;
use crate::storage::Store;

/// One turn of the conversation being summarized. `is_tool_result` renders
/// as the literal `[tool result]` instead of `content` in the transcript.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub is_tool_result: bool,
}

/// The caller's persona: a system-prompt prefix plus whatever model
/// selection the injected `LlmProvider` already carries. The engine only
/// needs the prefix for the summarization prompts it builds.
#[derive(Debug, Clone, Default)]
pub struct Persona {
    pub system_prompt: String,
}

/// A `summaries` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: i64,
    pub summary: String,
    pub level: i64,
    pub message_count: i64,
    pub parent_summary_id: Option<i64>,
    pub created_at: i64,
}

/// The result of `check_promotion_needed`.
#[derive(Debug, Clone)]
pub struct PromotionNeeded {
    pub level: i64,
    pub summaries: Vec<Summary>,
}

/// Everything `load_for_context` gathered, ready for `build_prompt_fragment`.
#[derive(Debug, Clone, Default)]
pub struct LoadedSummaries {
    pub recent: Vec<Summary>,
    pub long_term: Vec<Summary>,
}

const BASE_SYSTEM_PROMPT: &str =
    "Summarize the following conversation excerpt in 2-3 sentences, capturing the \
     key facts, decisions, and open threads.";
const RECURSIVE_SYSTEM_PROMPT: &str =
    "Consolidate the following summaries into a single 3-4 sentence summary that \
     preserves the key facts, decisions, and open threads across all of them.";

fn row_to_summary(
    id: i64,
    summary: String,
    level: i64,
    message_count: i64,
    parent_summary_id: Option<i64>,
    created_at: i64,
) -> Summary {
    Summary {
        id,
        summary,
        level,
        message_count,
        parent_summary_id,
        created_at,
    }
}

fn build_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let content = if m.is_tool_result {
                "[tool result]"
            } else {
                m.content.as_str()
            };
            format!("{}: {}", m.role, content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn build_recursive_text(summaries: &[Summary]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Summary {}: {}", i + 1, s.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

impl Store {
    /// Create `summaries` and its indexes, if absent. Idempotent.
    pub fn summaries_initialize(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                summary TEXT NOT NULL,
                summary_level INTEGER NOT NULL,
                message_count INTEGER NOT NULL,
                parent_summary_id INTEGER REFERENCES summaries(id),
                created_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_summaries_level_created ON summaries(summary_level, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_summaries_parent ON summaries(parent_summary_id);",
        )
        .map_err(EngineError::storage("summaries_initialize"))?;
        Ok(())
    }

    /// Summarize a batch of raw messages at level 0. Fails with
    /// `EngineError::LlmFailure` (no row inserted) if no `LlmProvider` is
    /// configured or generation fails.
    pub async fn create_base_summary(&self, messages: &[Message], persona: &Persona) -> Result<i64> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| EngineError::LlmFailure("no llm provider configured".to_string()))?;

        let transcript = build_transcript(messages);
        let system = format!("{}\n\n{}", persona.system_prompt, BASE_SYSTEM_PROMPT);
        let text = llm
            .generate(&system, &transcript, 0.3)
            .await
            .map_err(|LlmError::Failed(reason)| EngineError::LlmFailure(reason))?;

        let created_at = Utc::now().timestamp_millis();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO summaries (summary, summary_level, message_count, parent_summary_id, created_at) \
             VALUES (?1, 0, ?2, NULL, ?3)",
            params![text, messages.len() as i64, created_at],
        )
        .map_err(EngineError::storage("create_base_summary"))?;
        Ok(conn.last_insert_rowid())
    }

    /// For `L = 0 .. max_level - 1`, scan unconsolidated summaries at level
    /// `L`. Returns the first level whose unconsolidated count meets
    /// `recursive_threshold`, along with exactly `recursive_threshold` of
    /// them (oldest first). `None` if no level qualifies.
    pub fn check_promotion_needed(&self) -> Result<Option<PromotionNeeded>> {
        let recursive_threshold = self.config.recursive_threshold as i64;
        let max_level = self.config.max_level as i64;

        let conn = self.conn.lock().unwrap();
        for level in 0..max_level {
            let mut stmt = conn
                .prepare(
                    "SELECT id, summary, summary_level, message_count, parent_summary_id, created_at \
                     FROM summaries WHERE summary_level = ?1 AND parent_summary_id IS NULL \
                     ORDER BY created_at ASC LIMIT ?2",
                )
                .map_err(EngineError::storage("check_promotion_needed"))?;
            let rows = stmt
                .query_map(
                    params![level, recursive_threshold + 1],
                    |row| {
                        Ok(row_to_summary(
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .map_err(EngineError::storage("check_promotion_needed"))?;

            let mut candidates = Vec::new();
            for row in rows {
                candidates.push(row.map_err(EngineError::storage("check_promotion_needed"))?);
            }

            if candidates.len() as i64 >= recursive_threshold {
                candidates.truncate(recursive_threshold as usize);
                return Ok(Some(PromotionNeeded {
                    level: level + 1,
                    summaries: candidates,
                }));
            }
        }
        Ok(None)
    }

    /// Consolidate `summaries` into a single level-`target_level` summary.
    /// Fails (no row inserted) if generation fails. Does NOT mark the
    /// inputs consolidated; callers (or `promote_if_needed` when
    /// `auto_consolidate` is set) must call `mark_consolidated` afterward.
    pub async fn create_recursive_summary(
        &self,
        summaries: &[Summary],
        target_level: i64,
        persona: &Persona,
    ) -> Result<i64> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| EngineError::LlmFailure("no llm provider configured".to_string()))?;

        let text_in = build_recursive_text(summaries);
        let system = format!("{}\n\n{}", persona.system_prompt, RECURSIVE_SYSTEM_PROMPT);
        let text = llm
            .generate(&system, &text_in, 0.3)
            .await
            .map_err(|LlmError::Failed(reason)| EngineError::LlmFailure(reason))?;

        let message_count: i64 = summaries.iter().map(|s| s.message_count).sum();
        let created_at = Utc::now().timestamp_millis();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO summaries (summary, summary_level, message_count, parent_summary_id, created_at) \
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![text, target_level, message_count, created_at],
        )
        .map_err(EngineError::storage("create_recursive_summary"))?;
        Ok(conn.last_insert_rowid())
    }

    /// Set `parent_summary_id = parent_id` for every id in `ids`.
    pub fn mark_consolidated(&self, ids: &[i64], parent_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        for id in ids {
            conn.execute(
                "UPDATE summaries SET parent_summary_id = ?1 WHERE id = ?2",
                params![parent_id, id],
            )
            .map_err(EngineError::storage("mark_consolidated"))?;
        }
        Ok(())
    }

    /// Run `check_promotion_needed` and, if a promotion is due, create the
    /// recursive summary. When `config.auto_consolidate` is set (the
    /// default), also calls `mark_consolidated` on the inputs — the
    /// redesigned behavior recommended over the legacy "never wired"
    /// coupling (see DESIGN.md). Returns the new summary's id, or `None` if
    /// no promotion was needed.
    pub async fn promote_if_needed(&self, persona: &Persona) -> Result<Option<i64>> {
        let Some(promotion) = self.check_promotion_needed()? else {
            return Ok(None);
        };

        let new_id = self
            .create_recursive_summary(&promotion.summaries, promotion.level, persona)
            .await?;

        if self.config.auto_consolidate {
            let ids: Vec<i64> = promotion.summaries.iter().map(|s| s.id).collect();
            self.mark_consolidated(&ids, new_id)?;
        }

        Ok(Some(new_id))
    }

    /// Load up to `recent_count` unconsolidated level-0 rows (newest
    /// first), and up to 2 rows with `level > 0` (highest level and
    /// newest first) — the "2 rows total, not per level" behavior carried
    /// forward unchanged.
    pub fn load_for_context(&self) -> Result<LoadedSummaries> {
        let conn = self.conn.lock().unwrap();

        let mut recent_stmt = conn
            .prepare(
                "SELECT id, summary, summary_level, message_count, parent_summary_id, created_at \
                 FROM summaries WHERE summary_level = 0 ORDER BY created_at DESC LIMIT ?1",
            )
            .map_err(EngineError::storage("load_for_context"))?;
        let recent_rows = recent_stmt
            .query_map(params![self.config.recent_count as i64], |row| {
                Ok(row_to_summary(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(EngineError::storage("load_for_context"))?;
        let mut recent = Vec::new();
        for row in recent_rows {
            recent.push(row.map_err(EngineError::storage("load_for_context"))?);
        }

        let mut long_term_stmt = conn
            .prepare(
                "SELECT id, summary, summary_level, message_count, parent_summary_id, created_at \
                 FROM summaries WHERE summary_level > 0 ORDER BY summary_level DESC, created_at DESC LIMIT 2",
            )
            .map_err(EngineError::storage("load_for_context"))?;
        let long_term_rows = long_term_stmt
            .query_map([], |row| {
                Ok(row_to_summary(
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(EngineError::storage("load_for_context"))?;
        let mut long_term = Vec::new();
        for row in long_term_rows {
            long_term.push(row.map_err(EngineError::storage("load_for_context"))?);
        }

        Ok(LoadedSummaries { recent, long_term })
    }

    /// `## Conversation History` prompt fragment, empty if both sets are
    /// empty.
    pub fn build_summary_prompt_fragment(&self, loaded: &LoadedSummaries) -> String {
        if loaded.recent.is_empty() && loaded.long_term.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        out.push_str("## Conversation History\n\n");

        if !loaded.long_term.is_empty() {
            out.push_str("### Long-term Context\n\n");
            for s in &loaded.long_term {
                out.push_str(&format!(
                    "- [Level {}, {} messages, {}] {}\n",
                    s.level,
                    s.message_count,
                    format_timestamp(s.created_at),
                    s.summary
                ));
            }
            out.push('\n');
        }

        if !loaded.recent.is_empty() {
            out.push_str("### Recent Conversations\n\n");
            for s in &loaded.recent {
                out.push_str(&format!(
                    "- [{} messages, {}] {}\n",
                    s.message_count,
                    format_timestamp(s.created_at),
                    s.summary
                ));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryEngineConfig;
    use crate::embeddings::NullEmbeddingProvider;
    use crate::llm::{LlmError, LlmProvider};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        async fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn generate(&self, _system: &str, _user: &str, _temperature: f32) -> Result<String, LlmError> {
            Err(LlmError::Failed("model unreachable".to_string()))
        }
    }

    fn test_store(llm: Option<Arc<dyn LlmProvider>>) -> Store {
        Store::open_in_memory(
            MemoryEngineConfig::default(),
            Arc::new(NullEmbeddingProvider::new(768)),
            llm,
        )
        .unwrap()
    }

    fn messages() -> Vec<Message> {
        vec![
            Message { role: "user".into(), content: "hi".into(), is_tool_result: false },
            Message { role: "assistant".into(), content: "hello".into(), is_tool_result: false },
            Message { role: "tool".into(), content: "{}".into(), is_tool_result: true },
        ]
    }

    #[tokio::test]
    async fn create_base_summary_inserts_level_zero_row() {
        let store = test_store(Some(Arc::new(FixedLlm("a short summary"))));
        let persona = Persona::default();
        let id = store.create_base_summary(&messages(), &persona).await.unwrap();
        let loaded = store.load_for_context().unwrap();
        assert_eq!(loaded.recent.len(), 1);
        assert_eq!(loaded.recent[0].id, id);
        assert_eq!(loaded.recent[0].message_count, 3);
    }

    #[tokio::test]
    async fn create_base_summary_fails_without_llm() {
        let store = test_store(None);
        let err = store.create_base_summary(&messages(), &Persona::default()).await;
        assert!(matches!(err, Err(EngineError::LlmFailure(_))));
    }

    #[tokio::test]
    async fn create_base_summary_fails_on_llm_error_without_inserting() {
        let store = test_store(Some(Arc::new(FailingLlm)));
        let err = store.create_base_summary(&messages(), &Persona::default()).await;
        assert!(err.is_err());
        let loaded = store.load_for_context().unwrap();
        assert!(loaded.recent.is_empty());
    }

    #[tokio::test]
    async fn promotion_triggers_at_recursive_threshold() {
        let store = test_store(Some(Arc::new(FixedLlm("s"))));
        for _ in 0..10 {
            store.create_base_summary(&messages(), &Persona::default()).await.unwrap();
        }
        let promotion = store.check_promotion_needed().unwrap().unwrap();
        assert_eq!(promotion.level, 1);
        assert_eq!(promotion.summaries.len(), 10);
    }

    #[tokio::test]
    async fn promotion_not_needed_below_threshold() {
        let store = test_store(Some(Arc::new(FixedLlm("s"))));
        for _ in 0..9 {
            store.create_base_summary(&messages(), &Persona::default()).await.unwrap();
        }
        assert!(store.check_promotion_needed().unwrap().is_none());
    }

    #[tokio::test]
    async fn promote_if_needed_consolidates_by_default() {
        let store = test_store(Some(Arc::new(FixedLlm("s"))));
        for _ in 0..10 {
            store.create_base_summary(&messages(), &Persona::default()).await.unwrap();
        }
        let new_id = store.promote_if_needed(&Persona::default()).await.unwrap().unwrap();

        // All 10 inputs are now consolidated; a fresh promotion check finds
        // nothing left unconsolidated at level 0.
        assert!(store.check_promotion_needed().unwrap().is_none());

        let loaded = store.load_for_context().unwrap();
        assert_eq!(loaded.long_term.len(), 1);
        assert_eq!(loaded.long_term[0].id, new_id);
        assert_eq!(loaded.long_term[0].message_count, 30);
    }

    #[tokio::test]
    async fn auto_consolidate_false_leaves_inputs_unconsolidated() {
        let mut config = MemoryEngineConfig::default();
        config.auto_consolidate = false;
        let store = Store::open_in_memory(
            config,
            Arc::new(NullEmbeddingProvider::new(768)),
            Some(Arc::new(FixedLlm("s"))),
        )
        .unwrap();
        for _ in 0..10 {
            store.create_base_summary(&messages(), &Persona::default()).await.unwrap();
        }
        store.promote_if_needed(&Persona::default()).await.unwrap();
        // Legacy behavior preserved: inputs remain unconsolidated and the
        // next check sees the same 10 rows again.
        let promotion = store.check_promotion_needed().unwrap().unwrap();
        assert_eq!(promotion.summaries.len(), 10);
    }

    #[test]
    fn load_for_context_caps_long_term_at_two_regardless_of_level_count() {
        let store = test_store(None);
        let conn = store.conn.lock().unwrap();
        for level in 1..=3 {
            for _ in 0..3 {
                conn.execute(
                    "INSERT INTO summaries (summary, summary_level, message_count, parent_summary_id, created_at) \
                     VALUES ('s', ?1, 1, NULL, ?2)",
                    params![level, Utc::now().timestamp_millis()],
                )
                .unwrap();
            }
        }
        drop(conn);
        let loaded = store.load_for_context().unwrap();
        assert_eq!(loaded.long_term.len(), 2);
    }

    #[test]
    fn prompt_fragment_empty_when_nothing_loaded() {
        let loaded = LoadedSummaries::default();
        let store = test_store(None);
        assert_eq!(store.build_summary_prompt_fragment(&loaded), "");
    }

    #[test]
    fn prompt_fragment_sections_appear_in_order() {
        let store = test_store(None);
        let loaded = LoadedSummaries {
            recent: vec![Summary {
                id: 1,
                summary: "recent one".into(),
                level: 0,
                message_count: 5,
                parent_summary_id: None,
                created_at: 0,
            }],
            long_term: vec![Summary {
                id: 2,
                summary: "long term one".into(),
                level: 1,
                message_count: 20,
                parent_summary_id: None,
                created_at: 0,
            }],
        };
        let fragment = store.build_summary_prompt_fragment(&loaded);
        let long_idx = fragment.find("Long-term Context").unwrap();
        let recent_idx = fragment.find("Recent Conversations").unwrap();
        assert!(long_idx < recent_idx);
    }
}
