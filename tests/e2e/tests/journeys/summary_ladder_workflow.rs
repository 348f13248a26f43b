//! Summary ladder: base summaries accumulate, promotion triggers at the
//! configured threshold, and consolidated summaries are frozen.

use std::sync::Arc;

use memengine_core::{MemoryEngineConfig, MemoryEngineConfig as Config, Message, Persona, Store};

use harness::{DeterministicEmbeddingProvider, FixedLlmProvider};

fn small_ladder_store(response: &str) -> Store {
    let config = Config {
        recursive_threshold: 3,
        max_level: 2,
        recent_count: 2,
        ..MemoryEngineConfig::default()
    };
    Store::open_in_memory(
        config,
        Arc::new(DeterministicEmbeddingProvider),
        Some(Arc::new(FixedLlmProvider {
            response: response.to_string(),
        })),
    )
    .expect("open_in_memory")
}

fn one_message(text: &str) -> Vec<Message> {
    vec![Message {
        role: "user".to_string(),
        content: text.to_string(),
        is_tool_result: false,
    }]
}

#[tokio::test]
async fn base_summary_create_and_load() {
    let store = small_ladder_store("the user asked about pricing");
    let persona = Persona {
        system_prompt: "You are an assistant.".to_string(),
    };

    let id = store
        .create_base_summary(&one_message("what does the pro plan cost?"), &persona)
        .await
        .unwrap();
    assert!(id > 0);

    let loaded = store.load_for_context().unwrap();
    assert_eq!(loaded.recent.len(), 1);
    assert_eq!(loaded.recent[0].summary, "the user asked about pricing");
    assert!(loaded.recent[0].parent_summary_id.is_none());

    let fragment = store.build_summary_prompt_fragment(&loaded);
    assert!(fragment.contains("## Conversation History"));
    assert!(fragment.contains("### Recent Conversations"));
    assert!(fragment.contains("the user asked about pricing"));
}

#[tokio::test]
async fn promotion_triggers_at_threshold_and_consolidates() {
    let store = small_ladder_store("consolidated summary of three turns");
    let persona = Persona {
        system_prompt: "You are an assistant.".to_string(),
    };

    for i in 0..3 {
        store
            .create_base_summary(&one_message(&format!("turn {i}")), &persona)
            .await
            .unwrap();
    }

    // Not yet promoted: still 3 unconsolidated level-0 summaries.
    let needed = store.check_promotion_needed().unwrap();
    assert!(needed.is_some());
    let needed = needed.unwrap();
    assert_eq!(needed.level, 1);
    assert_eq!(needed.summaries.len(), 3);

    let new_id = store.promote_if_needed(&persona).await.unwrap();
    assert!(new_id.is_some());

    // Promotion is monotone: the three level-0 rows are now consolidated
    // and no longer reported by check_promotion_needed.
    assert!(store.check_promotion_needed().unwrap().is_none());

    let loaded = store.load_for_context().unwrap();
    assert!(loaded.recent.is_empty());
    assert_eq!(loaded.long_term.len(), 1);
    assert_eq!(loaded.long_term[0].level, 1);
    assert_eq!(loaded.long_term[0].message_count, 3);
    assert_eq!(loaded.long_term[0].summary, "consolidated summary of three turns");
}

#[tokio::test]
async fn llm_failure_leaves_no_row_and_is_retryable() {
    let store = Store::open_in_memory(
        MemoryEngineConfig::default(),
        Arc::new(DeterministicEmbeddingProvider),
        None, // no LlmProvider configured -> generation fails
    )
    .unwrap();
    let persona = Persona::default();

    let err = store
        .create_base_summary(&one_message("hello"), &persona)
        .await
        .expect_err("no llm provider must fail create_base_summary");
    assert!(matches!(err, memengine_core::EngineError::LlmFailure(_)));

    let loaded = store.load_for_context().unwrap();
    assert!(loaded.recent.is_empty());
}
