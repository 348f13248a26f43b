//! The embedding side-channel must never block content operations: a store
//! with no embedding service configured still accepts writes, and semantic
//! search fails in a way callers can catch and fall back from.

use harness::TestDatabaseManager;
use memengine_core::{BlockType, EngineError};

#[tokio::test]
async fn create_block_succeeds_without_an_embedding_service() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    let block = store
        .create_block("no-embed", "No Embed", "some content", BlockType::Core)
        .await
        .expect("create_block must succeed even though embeddings are unavailable");
    assert_eq!(block.content, "some content");

    // No row was ever written to block_embeddings for this id.
    let embeddings = store.load_all_block_embeddings().unwrap();
    assert!(!embeddings.contains_key("no-embed"));
}

#[tokio::test]
async fn update_block_succeeds_without_an_embedding_service() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    store
        .create_block("b", "B", "v1", BlockType::Core)
        .await
        .unwrap();
    let updated = store
        .update_block("b", "v2")
        .await
        .expect("update must succeed despite embedding refresh failing");
    assert_eq!(updated.content, "v2");
}

#[tokio::test]
async fn semantic_search_fails_and_callers_fall_back_to_substring() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    store
        .create_block("a", "A", "likes dark roast coffee", BlockType::Core)
        .await
        .unwrap();

    let blocks = store.get_all_blocks(Some(BlockType::Core)).unwrap();
    let err = store
        .search_blocks("coffee", &blocks, 5, 0.5)
        .await
        .expect_err("semantic search must fail when no embedding service is configured");
    assert!(matches!(err, EngineError::EmbeddingUnavailable(_)));

    // Fallback path: substring search over the archival text index still
    // works (blocks don't have a text-search fallback of their own in this
    // engine; archival content does, via search_archival_text).
    store
        .insert_archival("likes dark roast coffee", None)
        .await
        .unwrap();
    let fallback = store.search_archival_text("dark roast", 10).unwrap();
    assert_eq!(fallback.len(), 1);
}

#[tokio::test]
async fn ensure_block_embeddings_generates_zero_when_service_unavailable() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    store
        .create_block("a", "A", "content", BlockType::Core)
        .await
        .unwrap();
    let blocks = store.get_all_blocks(None).unwrap();

    let generated = store.ensure_block_embeddings(&blocks).await.unwrap();
    assert_eq!(generated, 0);
}
