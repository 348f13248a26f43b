//! `memory_search` tool: semantic search over blocks, with a substring
//! fallback when semantic search isn't requested or isn't available.

use memengine_core::{Block, Store};
use serde::Deserialize;
use serde_json::Value;

pub fn schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": { "type": "string" },
            "blocks": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Restrict the search to these block ids; omit to search every block"
            },
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
    blocks: Option<Vec<String>>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default, rename = "useSemanticSearch")]
    use_semantic_search: bool,
}

fn round2(x: f32) -> f64 {
    ((x as f64) * 100.0).round() / 100.0
}

fn substring_fallback(query: &str, candidates: &[Block], limit: usize) -> Vec<Value> {
    let needle = query.to_lowercase();
    candidates
        .iter()
        .filter(|b| b.content.to_lowercase().contains(&needle))
        .take(limit)
        .map(|b| {
            serde_json::json!({
                "block_id": b.id,
                "label": b.label,
                "content": b.content,
                "score": 1.0,
            })
        })
        .collect()
}

pub async fn execute(store: &Store, args: Option<Value>) -> Result<Value, String> {
    let args: Args = match args {
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid arguments: {}", e))?,
        None => return Err("Missing arguments".to_string()),
    };

    let limit = args.limit.unwrap_or(10).max(1);

    let candidates = match &args.blocks {
        Some(ids) => {
            let mut out = Vec::new();
            for id in ids {
                if let Some(b) = store.get_block(id).map_err(|e| e.to_string())? {
                    out.push(b);
                }
            }
            out
        }
        None => store.get_all_blocks(None).map_err(|e| e.to_string())?,
    };

    if !args.use_semantic_search {
        return Ok(serde_json::json!({ "results": substring_fallback(&args.query, &candidates, limit) }));
    }

    match store.search_blocks(&args.query, &candidates, limit, 0.0).await {
        Ok(scored) => {
            let results: Vec<Value> = scored
                .into_iter()
                .map(|(b, score)| {
                    serde_json::json!({
                        "block_id": b.id,
                        "label": b.label,
                        "content": b.content,
                        "score": round2(score),
                    })
                })
                .collect();
            Ok(serde_json::json!({ "results": results }))
        }
        Err(_) => Ok(serde_json::json!({ "results": substring_fallback(&args.query, &candidates, limit) })),
    }
}
