//! `memory_write` tool: legacy key/value upsert, kept for backward
//! compatibility with agents that predate the block store.

use memengine_core::Store;
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "purpose": { "type": "string" },
            "text": { "type": "string" }
        },
        "required": ["purpose", "text"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    purpose: String,
    text: String,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    match store.kv_write(&args.purpose, &args.text) {
        Ok(_) => Ok(serde_json::json!({
            "success": true,
            "message": format!("value stored for purpose '{}'", args.purpose),
        })),
        Err(e) => Ok(serde_json::json!({
            "success": false,
            "message": e.to_string(),
        })),
    }
}
