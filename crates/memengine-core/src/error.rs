//! Error types
//!
//! One engine-wide error enum, matching the error kinds spec'd as
//! recognizable and distinguishable by callers: storage/content failures
//! are fatal to the operation that raised them, while `BlockNotFound`,
//! `ContentNotFound`, and `BlockConflict` are logical failures meant to be
//! surfaced as structured `{success: false}` tool responses rather than
//! propagated as hard errors.

use thiserror::Error;

/// Engine-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// Any SQL error. Fatal to the operation, surfaced to the caller.
    #[error("storage failure during {operation}: {source}")]
    StorageFailure {
        operation: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Content-layer error: cache/JSON metadata parse failures and the like.
    #[error("memory failure during {operation}: {reason}")]
    MemoryFailure {
        operation: &'static str,
        reason: String,
    },

    /// A block with this id does not exist.
    #[error("block not found: {0}")]
    BlockNotFound(String),

    /// A `replace_content` substring was not present in the block.
    #[error("content not found in block {0}")]
    ContentNotFound(String),

    /// `create_block` was called with an id that already exists.
    #[error("block already exists: {0}")]
    BlockConflict(String),

    /// The embedding gateway could not be reached or returned a bad vector.
    /// Swallowed (logged at warning level) by content operations; only
    /// surfaced to direct callers of semantic search.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Two vectors compared for cosine similarity had different lengths.
    /// A programmer error, never tolerated silently.
    #[error("dimension mismatch: {a} vs {b}")]
    DimensionMismatch { a: usize, b: usize },

    /// Summarization LLM call failed. Fatal to the summarization operation;
    /// never corrupts already-committed state.
    #[error("llm failure: {0}")]
    LlmFailure(String),

    /// IO error opening/creating the database file or its parent directory.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Store could not be initialized (e.g. no platform data directory).
    #[error("initialization error: {0}")]
    Init(String),
}

impl EngineError {
    pub(crate) fn storage(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> EngineError {
        move |source| EngineError::StorageFailure { operation, source }
    }
}
