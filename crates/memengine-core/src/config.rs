//! Engine configuration
//!
//! Defaults mirror spec section 4.6's summary-ladder thresholds. Everything
//! else (db path, embedding dimension) has a sane default the way the
//! teacher's `Storage::new(None)` falls back to a platform data directory.

/// Tunable parameters for the summary ladder (C6) and the embedding
/// dimension expected by C5.
#[derive(Debug, Clone)]
pub struct MemoryEngineConfig {
    /// Minimum messages buffered before a level-0 summary is eligible.
    /// The engine does not enforce this itself; the host decides when to call
    /// `create_base_summary`. Kept here so hosts have one place to read it from.
    pub base_threshold: usize,

    /// Number of unconsolidated summaries at level L that triggers creation
    /// of a level L+1 summary.
    pub recursive_threshold: usize,

    /// No summary level above this may be produced.
    pub max_level: u32,

    /// Number of level-0 summaries loaded into the prompt fragment.
    pub recent_count: usize,

    /// Expected embedding vector dimension. `DimensionMismatch` is raised
    /// when a provider returns something else.
    pub embedding_dimension: usize,

    /// Whether `check_promotion_needed`'s caller-side promotion should also
    /// call `mark_consolidated` on success. Spec flags the source's failure
    /// to do this as suspect; this engine defaults to wiring it in (see
    /// DESIGN.md), but the knob is kept so the legacy "never consolidate"
    /// behavior is still expressible without forking the ladder.
    pub auto_consolidate: bool,
}

impl Default for MemoryEngineConfig {
    fn default() -> Self {
        Self {
            base_threshold: 20,
            recursive_threshold: 10,
            max_level: 3,
            recent_count: 3,
            embedding_dimension: 768,
            auto_consolidate: true,
        }
    }
}
