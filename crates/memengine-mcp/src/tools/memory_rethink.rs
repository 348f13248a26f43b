//! `memory_rethink` tool: unconditionally overwrite a block's content.

use memengine_core::Store;
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "block_id": { "type": "string" },
            "new_content": { "type": "string" },
            "reason": {
                "type": "string",
                "description": "Optional rationale, logged but not persisted"
            }
        },
        "required": ["block_id", "new_content"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    block_id: String,
    new_content: String,
    #[serde(default)]
    reason: Option<String>,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    match store
        .rethink_block(&args.block_id, &args.new_content, args.reason.as_deref())
        .await
    {
        Ok(_) => Ok(serde_json::json!({
            "success": true,
            "message": format!("block '{}' rewritten", args.block_id),
        })),
        Err(e) => Ok(serde_json::json!({
            "success": false,
            "message": e.to_string(),
        })),
    }
}
