//! `archival_insert` tool: append a new entry to the archival store.

use memengine_core::Store;
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "content": { "type": "string" },
            "metadata": {
                "type": "object",
                "description": "Arbitrary caller-supplied metadata stored alongside the entry"
            }
        },
        "required": ["content"]
    })
}

#[derive(Debug, Deserialize)]
struct Args {
    content: String,
    #[serde(default)]
    metadata: Option<Value>,
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    match store.insert_archival(&args.content, args.metadata).await {
        Ok(id) => Ok(serde_json::json!({
            "success": true,
            "message": "archival entry created",
            "id": id,
        })),
        Err(e) => Ok(serde_json::json!({
            "success": false,
            "message": e.to_string(),
        })),
    }
}
