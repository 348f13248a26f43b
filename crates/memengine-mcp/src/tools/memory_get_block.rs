//! `memory_get_block` tool: fetch a single block by id.

use chrono::{TimeZone, Utc};
use memengine_core::Store;
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "block_id": {
                "type": "string",
                "description": "The id of the block to retrieve"
            }
        },
        "required": ["block_id"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    block_id: String,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    let block = store.get_block(&args.block_id).map_err(|e| e.to_string())?;

    match block {
        Some(block) => Ok(serde_json::json!({
            "block_id": block.id,
            "label": block.label,
            "content": block.content,
            "updated_at": timestamp(block.updated_at),
        })),
        None => Ok(serde_json::json!({
            "success": false,
            "message": format!("block '{}' does not exist", args.block_id),
        })),
    }
}

fn timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memengine_core::{BlockType, MemoryEngineConfig, NullEmbeddingProvider};
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
    async fn returns_block_fields_when_present() {
        let store = test_store();
        store
            .create_block("human", "Human", "likes tea", BlockType::Core)
            .await
            .unwrap();

        let result = execute(&store, Some(serde_json::json!({ "block_id": "human" })))
            .await
            .unwrap();
        assert_eq!(result["block_id"], "human");
        assert_eq!(result["content"], "likes tea");
        assert!(result["updated_at"].is_string());
    }

    #[tokio::test]
    async fn reports_missing_block_in_band() {
        let store = test_store();
        let result = execute(&store, Some(serde_json::json!({ "block_id": "ghost" })))
            .await
            .unwrap();
        assert_eq!(result["success"], false);
        assert!(result["message"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn missing_arguments_fails() {
        let store = test_store();
        let result = execute(&store, None).await;
        assert!(result.is_err());
    }

    #[test]
    fn schema_requires_block_id() {
        let s = schema();
        assert!(s["required"].as_array().unwrap().contains(&serde_json::json!("block_id")));
    }
}
