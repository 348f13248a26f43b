//! `memory_create_block` tool: create a new core or archival block.

use memengine_core::{BlockType, EngineError, Store};
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "block_id": { "type": "string" },
            "label": { "type": "string" },
            "content": { "type": "string" },
            "type": {
                "type": "string",
                "enum": ["core", "archival"],
                "default": "core"
            }
        },
        "required": ["block_id", "label", "content"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    block_id: String,
    label: String,
    content: String,
    #[serde(default, rename = "type")]
    block_type: Option<String>,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    let block_type = match args.block_type.as_deref() {
        Some("archival") => BlockType::Archival,
        _ => BlockType::Core,
    };

    match store
        .create_block(&args.block_id, &args.label, &args.content, block_type)
        .await
    {
        Ok(block) => Ok(serde_json::json!({
            "success": true,
            "message": format!("block '{}' created", block.id),
            "block_id": block.id,
        })),
        Err(EngineError::BlockConflict(id)) => Ok(serde_json::json!({
            "success": false,
            "message": format!("block '{}' already exists", id),
            "block_id": id,
        })),
        Err(e) => Ok(serde_json::json!({
            "success": false,
            "message": e.to_string(),
        })),
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
    async fn creates_core_block_by_default() {
        let store = test_store();
        let result = execute(
            &store,
            Some(serde_json::json!({ "block_id": "human", "label": "Human", "content": "likes tea" })),
        )
        .await
        .unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["block_id"], "human");
    }

    #[tokio::test]
    async fn reports_conflict_on_duplicate_id() {
        let store = test_store();
        execute(
            &store,
            Some(serde_json::json!({ "block_id": "human", "label": "Human", "content": "a" })),
        )
        .await
        .unwrap();
        let result = execute(
            &store,
            Some(serde_json::json!({ "block_id": "human", "label": "Human", "content": "b" })),
        )
        .await
        .unwrap();
        assert_eq!(result["success"], false);
    }
}
