//! `archival_search` tool: semantic search over archival entries, with a
//! substring fallback when semantic search isn't requested or isn't
//! available.

use chrono::{TimeZone, Utc};
use memengine_core::{ArchivalEntry, Store};
use serde::Deserialize;
use serde_json::Value;

fn timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": { "type": "string" },
            "limit": { "type": "integer", "default": 10, "minimum": 1 },
            "useSemanticSearch": { "type": "boolean", "default": false }
        },
        "required": ["query"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default, rename = "useSemanticSearch")]
    use_semantic_search: bool,
}

fn round2(x: f32) -> f64 {
    ((x as f64) * 100.0).round() / 100.0
}

fn to_result(entry: &ArchivalEntry, score: f64) -> Value {
    serde_json::json!({
        "id": entry.id,
        "content": entry.content,
        "created_at": timestamp(entry.created_at),
        "metadata": entry.metadata,
        "score": score,
    })
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    let limit = args.limit.unwrap_or(10).max(1);

    if !args.use_semantic_search {
        let entries = store
            .search_archival_text(&args.query, limit)
            .map_err(|e| e.to_string())?;
        let results: Vec<Value> = entries.iter().map(|e| to_result(e, 1.0)).collect();
        return Ok(serde_json::json!({ "results": results }));
    }

    let all = store.get_all_archival().map_err(|e| e.to_string())?;
    match store
        .search_archival_semantic(&args.query, &all, limit, 0.0)
        .await
    {
        Ok(scored) => {
            let results: Vec<Value> = scored
                .iter()
                .map(|(e, score)| to_result(e, round2(*score)))
                .collect();
            Ok(serde_json::json!({ "results": results }))
        }
        Err(_) => {
            let entries = store
                .search_archival_text(&args.query, limit)
                .map_err(|e| e.to_string())?;
            let results: Vec<Value> = entries.iter().map(|e| to_result(e, 1.0)).collect();
            Ok(serde_json::json!({ "results": results }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memengine_core::{MemoryEngineConfig, NullEmbeddingProvider};
    use std::sync::Arc;

    fn test_store() -> Store {
        Store::open_in_memory(
            MemoryEngineConfig::default(),
            Arc::new(NullEmbeddingProvider::new(768)),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn default_search_is_substring_match() {
        let store = test_store();
        store.insert_archival("met a client about coffee beans", None).await.unwrap();
        store.insert_archival("reviewed quarterly budget", None).await.unwrap();

        let result = execute(&store, Some(serde_json::json!({ "query": "coffee" })))
            .await
            .unwrap();
        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["score"], 1.0);
    }

    #[tokio::test]
    async fn semantic_search_falls_back_without_embedding_provider() {
        let store = test_store();
        store.insert_archival("met a client about coffee beans", None).await.unwrap();

        let result = execute(
            &store,
            Some(serde_json::json!({ "query": "coffee", "useSemanticSearch": true })),
        )
        .await
        .unwrap();
        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["score"], 1.0);
    }

    #[tokio::test]
    async fn respects_limit() {
        let store = test_store();
        for i in 0..5 {
            store.insert_archival(&format!("entry about coffee {}", i), None).await.unwrap();
        }
        let result = execute(
            &store,
            Some(serde_json::json!({ "query": "coffee", "limit": 2 })),
        )
        .await
        .unwrap();
        assert_eq!(result["results"].as_array().unwrap().len(), 2);
    }
}
