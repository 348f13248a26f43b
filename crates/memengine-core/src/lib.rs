//! # memengine-core
//!
//! A durable memory engine for long-lived conversational agents: a flat
//! key/value store for legacy callers, typed core/archival blocks with
//! read-before-write edit semantics, a semantic index over both, a
//! hierarchical summary ladder for conversation history, and the
//! migration path between the flat and typed models.
//!
//! Everything hangs off a single [`Store`] handle, opened once per agent
//! session against a SQLite database (or in-memory, for tests and
//! short-lived sessions).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use memengine_core::{MemoryEngineConfig, NullEmbeddingProvider, Store};
//! use std::sync::Arc;
//!
//! # fn main() -> memengine_core::Result<()> {
//! let store = Store::open_in_memory(
//!     MemoryEngineConfig::default(),
//!     Arc::new(NullEmbeddingProvider::new(768)),
//!     None,
//! )?;
//! store.kv_write("customer_notes", "prefers dark roast coffee")?;
//! let prompt = store.assemble_prompt("You are a helpful assistant.")?;
//! assert!(prompt.contains("Memory Policy"));
//! # Ok(())
//! # }
//! ```

pub mod blocks;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod kv;
pub mod llm;
pub mod migration;
pub mod search;
pub mod storage;
pub mod summary;

pub use blocks::{ArchivalEntry, Block, BlockType, InsertPosition};
pub use config::MemoryEngineConfig;
pub use embeddings::{cosine_similarity, EmbeddingError, EmbeddingProvider, NullEmbeddingProvider};
#[cfg(feature = "local-embeddings")]
pub use embeddings::LocalEmbeddingProvider;
pub use error::{EngineError, Result};
pub use kv::KvEntry;
pub use llm::{LlmError, LlmProvider};
pub use migration::MigrationReport;
pub use storage::{Migration, Store, MIGRATIONS};
pub use summary::{LoadedSummaries, Message, Persona, PromotionNeeded, Summary};

/// Crate version, for hosts that want to report it alongside a database
/// path.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient imports for the common case of a host embedding this crate
/// directly.
pub mod prelude {
    pub use crate::{
        ArchivalEntry, Block, BlockType, EmbeddingProvider, EngineError, InsertPosition,
        LlmProvider, MemoryEngineConfig, Message, NullEmbeddingProvider, Persona, Result, Store,
        Summary,
    };
}
