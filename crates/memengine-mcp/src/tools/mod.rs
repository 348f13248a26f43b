//! MCP Tools
//!
//! One module per tool exposed to the LLM. Each module exports a
//! `schema()` (JSON Schema for its arguments) and an `execute()` that
//! takes the shared `Store` plus the raw argument value and returns the
//! tool's JSON result, or an `Err(String)` for malformed/missing
//! arguments.

pub mod archival_insert;
pub mod archival_search;
pub mod memory_create_block;
pub mod memory_get_block;
pub mod memory_insert;
pub mod memory_list_blocks;
pub mod memory_read;
pub mod memory_replace;
pub mod memory_rethink;
pub mod memory_search;
pub mod memory_write;
