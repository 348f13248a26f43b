//! `memory_insert` tool: append or prepend text into an existing block.

use memengine_core::{InsertPosition, Store};
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "block_id": { "type": "string", "description": "The block to insert into" },
            "content": { "type": "string", "description": "Text to merge into the block" },
            "position": {
                "type": "string",
                "enum": ["start", "end"],
                "default": "end",
                "description": "Where to splice the new text relative to existing content"
            }
        },
        "required": ["block_id", "content"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    block_id: String,
    content: String,
    #[serde(default)]
    position: Option<String>,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    let position = match args.position.as_deref() {
        Some("start") => InsertPosition::Start,
        _ => InsertPosition::End,
    };

    match store.insert_content(&args.block_id, &args.content, position).await {
        Ok(_) => Ok(serde_json::json!({
            "success": true,
            "message": format!("content inserted into block '{}'", args.block_id),
        })),
        Err(e) => Ok(serde_json::json!({
            "success": false,
            "message": e.to_string(),
        })),
    }
}
