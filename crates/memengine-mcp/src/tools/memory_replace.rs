//! `memory_replace` tool: replace the first occurrence of a substring.

use memengine_core::{EngineError, Store};
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "block_id": { "type": "string" },
            "old_content": { "type": "string", "description": "Substring to replace (first occurrence only)" },
            "new_content": { "type": "string", "description": "Replacement text" }
        },
        "required": ["block_id", "old_content", "new_content"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    block_id: String,
    old_content: String,
    new_content: String,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    match store
        .replace_content(&args.block_id, &args.old_content, &args.new_content)
        .await
    {
        Ok(_) => Ok(serde_json::json!({
            "success": true,
            "message": format!("content replaced in block '{}'", args.block_id),
        })),
        Err(EngineError::ContentNotFound(id)) => Ok(serde_json::json!({
            "success": false,
            "message": format!("'{}' not found in block '{}'", args.old_content, id),
        })),
        Err(e) => Ok(serde_json::json!({
            "success": false,
            "message": e.to_string(),
        })),
    }
}
