//! MCP Server Core
//!
//! Handles the main MCP server logic, routing requests to the tool and
//! resource handlers.

use std::collections::HashMap;
use std::sync::Arc;

use memengine_core::Store;
use tracing::{debug, warn};

use crate::protocol::messages::{
    CallToolRequest, CallToolResult, InitializeRequest, InitializeResult, ListResourcesResult,
    ListToolsResult, ReadResourceRequest, ReadResourceResult, ResourceContents,
    ResourceDescription, ServerCapabilities, ServerInfo, ToolDescription, ToolResultContent,
};
use crate::protocol::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_VERSION};
use crate::tools;

/// MCP Server implementation
pub struct McpServer {
    store: Arc<Store>,
    initialized: bool,
}

impl McpServer {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            initialized: false,
        }
    }

    /// Handle an incoming JSON-RPC request
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("Handling request: {}", request.method);

        if !self.initialized
            && request.method != "initialize"
            && request.method != "notifications/initialized"
        {
            warn!("Rejecting request '{}': server not initialized", request.method);
            return Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::server_not_initialized(),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "notifications/initialized" => return None,
            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params).await,
            "resources/list" => self.handle_resources_list().await,
            "resources/read" => self.handle_resources_read(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => {
                warn!("Unknown method: {}", method);
                Err(JsonRpcError::method_not_found())
            }
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error),
        })
    }

    async fn handle_initialize(
        &mut self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: InitializeRequest = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => InitializeRequest::default(),
        };

        let negotiated_version = if request.protocol_version.as_str() < MCP_VERSION {
            request.protocol_version.clone()
        } else {
            MCP_VERSION.to_string()
        };

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: negotiated_version,
            server_info: ServerInfo {
                name: "memengine".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some({
                    let mut map = HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
                resources: Some({
                    let mut map = HashMap::new();
                    map.insert("listChanged".to_string(), serde_json::json!(false));
                    map
                }),
                prompts: None,
            },
            instructions: Some(
                "This server exposes a durable, block-structured memory for a long-lived \
                 conversational agent. Core blocks (human, persona, context) stay in the \
                 prompt at all times; edit them with memory_insert/memory_replace/memory_rethink. \
                 Use archival_insert to record anything that shouldn't live in a core block, \
                 and memory_search / archival_search to retrieve it later."
                    .to_string(),
            ),
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let tools = vec![
            ToolDescription {
                name: "memory_get_block".to_string(),
                description: Some("Fetch a single block by id.".to_string()),
                input_schema: tools::memory_get_block::schema(),
            },
            ToolDescription {
                name: "memory_insert".to_string(),
                description: Some(
                    "Append or prepend content to an existing block.".to_string(),
                ),
                input_schema: tools::memory_insert::schema(),
            },
            ToolDescription {
                name: "memory_replace".to_string(),
                description: Some(
                    "Replace the first occurrence of a substring within a block.".to_string(),
                ),
                input_schema: tools::memory_replace::schema(),
            },
            ToolDescription {
                name: "memory_rethink".to_string(),
                description: Some(
                    "Overwrite a block's content entirely.".to_string(),
                ),
                input_schema: tools::memory_rethink::schema(),
            },
            ToolDescription {
                name: "memory_create_block".to_string(),
                description: Some("Create a new core or archival block.".to_string()),
                input_schema: tools::memory_create_block::schema(),
            },
            ToolDescription {
                name: "memory_list_blocks".to_string(),
                description: Some(
                    "List blocks, optionally filtered by type, with a short preview.".to_string(),
                ),
                input_schema: tools::memory_list_blocks::schema(),
            },
            ToolDescription {
                name: "memory_search".to_string(),
                description: Some(
                    "Search blocks by content, semantically if requested.".to_string(),
                ),
                input_schema: tools::memory_search::schema(),
            },
            ToolDescription {
                name: "archival_insert".to_string(),
                description: Some("Append a new entry to the archival store.".to_string()),
                input_schema: tools::archival_insert::schema(),
            },
            ToolDescription {
                name: "archival_search".to_string(),
                description: Some(
                    "Search archival entries by content, semantically if requested.".to_string(),
                ),
                input_schema: tools::archival_search::schema(),
            },
            ToolDescription {
                name: "memory_read".to_string(),
                description: Some("Legacy key/value read.".to_string()),
                input_schema: tools::memory_read::schema(),
            },
            ToolDescription {
                name: "memory_write".to_string(),
                description: Some("Legacy key/value upsert.".to_string()),
                input_schema: tools::memory_write::schema(),
            },
        ];

        let result = ListToolsResult { tools };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: CallToolRequest = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("Missing tool call parameters")),
        };

        let result = match request.name.as_str() {
            "memory_get_block" => tools::memory_get_block::execute(&self.store, request.arguments).await,
            "memory_insert" => tools::memory_insert::execute(&self.store, request.arguments).await,
            "memory_replace" => tools::memory_replace::execute(&self.store, request.arguments).await,
            "memory_rethink" => tools::memory_rethink::execute(&self.store, request.arguments).await,
            "memory_create_block" => {
                tools::memory_create_block::execute(&self.store, request.arguments).await
            }
            "memory_list_blocks" => {
                tools::memory_list_blocks::execute(&self.store, request.arguments).await
            }
            "memory_search" => tools::memory_search::execute(&self.store, request.arguments).await,
            "archival_insert" => tools::archival_insert::execute(&self.store, request.arguments).await,
            "archival_search" => tools::archival_search::execute(&self.store, request.arguments).await,
            "memory_read" => tools::memory_read::execute(&self.store, request.arguments).await,
            "memory_write" => tools::memory_write::execute(&self.store, request.arguments).await,
            name => {
                return Err(JsonRpcError::method_not_found_with_message(&format!(
                    "Unknown tool: {}",
                    name
                )));
            }
        };

        let call_result = match result {
            Ok(content) => CallToolResult {
                content: vec![ToolResultContent {
                    content_type: "text".to_string(),
                    text: serde_json::to_string_pretty(&content)
                        .unwrap_or_else(|_| content.to_string()),
                }],
                is_error: Some(false),
            },
            Err(e) => CallToolResult {
                content: vec![ToolResultContent {
                    content_type: "text".to_string(),
                    text: serde_json::json!({ "error": e }).to_string(),
                }],
                is_error: Some(true),
            },
        };

        serde_json::to_value(call_result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_resources_list(&self) -> Result<serde_json::Value, JsonRpcError> {
        let resources = vec![
            ResourceDescription {
                uri: "memory://blocks".to_string(),
                name: "Blocks".to_string(),
                description: Some("All core and archival blocks.".to_string()),
                mime_type: Some("application/json".to_string()),
            },
            ResourceDescription {
                uri: "memory://archival".to_string(),
                name: "Archival Entries".to_string(),
                description: Some("Every archival entry, newest first.".to_string()),
                mime_type: Some("application/json".to_string()),
            },
        ];

        let result = ListResourcesResult { resources };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }

    async fn handle_resources_read(
        &self,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, JsonRpcError> {
        let request: ReadResourceRequest = match params {
            Some(p) => serde_json::from_value(p)
                .map_err(|e| JsonRpcError::invalid_params(&e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("Missing resource URI")),
        };

        let text = match request.uri.as_str() {
            "memory://blocks" => {
                let blocks = self
                    .store
                    .get_all_blocks(None)
                    .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
                serde_json::to_string_pretty(&blocks)
                    .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?
            }
            "memory://archival" => {
                let entries = self
                    .store
                    .get_all_archival()
                    .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?;
                serde_json::to_string_pretty(&entries)
                    .map_err(|e| JsonRpcError::internal_error(&e.to_string()))?
            }
            uri => return Err(JsonRpcError::resource_not_found(uri)),
        };

        let result = ReadResourceResult {
            contents: vec![ResourceContents {
                uri: request.uri.clone(),
                mime_type: Some("application/json".to_string()),
                text,
            }],
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(&e.to_string()))
    }
}
