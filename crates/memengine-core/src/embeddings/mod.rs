//! Embedding Gateway (C2)
//!
//! Exposes `embed(text) -> vector` of fixed dimension behind a trait so the
//! host can supply any text-to-vector capability, or none at all. Absence
//! or failure of this gateway must never block content operations — it
//! degrades semantic search to substring search (spec section 4.2).

mod local;
mod provider;

pub use local::cosine_similarity;
pub use provider::{EmbeddingError, EmbeddingProvider, NullEmbeddingProvider};

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbeddingProvider;
