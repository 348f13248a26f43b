//! `memory_read` tool: legacy key/value read, kept for backward
//! compatibility with agents that predate the block store.

use chrono::{TimeZone, Utc};
use memengine_core::Store;
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
            "purpose": { "type": "string" }
        },
        "required": ["purpose"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    purpose: String,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    match store.kv_read(&args.purpose).map_err(|e| e.to_string())? {
        Some(entry) => Ok(serde_json::json!({
            "purpose": entry.purpose,
            "text": entry.text,
            "updated_at": timestamp(entry.updated_at),
        })),
        None => Ok(serde_json::json!({
            "success": false,
            "message": format!("no value stored for purpose '{}'", args.purpose),
        })),
    }
}
