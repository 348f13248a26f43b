//! `memory_list_blocks` tool: list blocks with a short content preview.

use chrono::{TimeZone, Utc};
use memengine_core::{BlockType, Store};
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "type": {
                "type": "string",
                "enum": ["core", "archival"],
                "description": "Filter by block type; omit for all blocks"
            }
        }
    })
}

#[derive(Debug, Deserialize, Default)]
struct Args {
    #[serde(default, rename = "type")]
    block_type: Option<String>,
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}

fn timestamp(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => Args::default(),
    };

    let block_type = match args.block_type.as_deref() {
        Some("core") => Some(BlockType::Core),
        Some("archival") => Some(BlockType::Archival),
        _ => None,
    };

    let blocks = store.get_all_blocks(block_type).map_err(|e| e.to_string())?;
    let entries: Vec<Value> = blocks
        .iter()
        .map(|b| {
            serde_json::json!({
                "id": b.id,
                "label": b.label,
                "type": b.block_type,
                "preview": preview(&b.content, 100),
                "updated_at": timestamp(b.updated_at),
            })
        })
        .collect();

    Ok(serde_json::json!({ "blocks": entries }))
}
