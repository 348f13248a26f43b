//! Full block lifecycle: create, read-before-write edits, archival, and
//! semantic search over a store wired up with the deterministic embedding
//! double.

use memengine_core::{BlockType, EngineError, InsertPosition};

use harness::TestDatabaseManager;

#[tokio::test]
async fn create_edit_and_fetch_round_trips() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    let block = store
        .create_block("test-block", "Test Block", "Test content", BlockType::Core)
        .await
        .expect("create_block");
    assert_eq!(block.id, "test-block");
    assert_eq!(block.content, "Test content");

    let fetched = store
        .get_block("test-block")
        .expect("get_block")
        .expect("block exists");
    assert_eq!(fetched.label, "Test Block");
    assert_eq!(fetched.content, "Test content");
    assert_eq!(fetched.block_type, BlockType::Core);
}

#[tokio::test]
async fn create_block_conflict_is_not_fatal() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("dup", "Dup", "first", BlockType::Core)
        .await
        .unwrap();

    let err = store
        .create_block("dup", "Dup", "second", BlockType::Core)
        .await
        .expect_err("second create with same id must fail");
    assert!(matches!(err, EngineError::BlockConflict(id) if id == "dup"));

    // Original content is untouched by the failed conflicting create.
    let still_there = store.get_block("dup").unwrap().unwrap();
    assert_eq!(still_there.content, "first");
}

#[tokio::test]
async fn insert_content_merges_with_newline_separator() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("b", "B", "Original content", BlockType::Core)
        .await
        .unwrap();

    store
        .insert_content("b", "New content", InsertPosition::End)
        .await
        .unwrap();
    let after_end = store.get_block("b").unwrap().unwrap();
    assert_eq!(after_end.content, "Original content\nNew content");

    store
        .insert_content("b", "Prefix", InsertPosition::Start)
        .await
        .unwrap();
    let after_start = store.get_block("b").unwrap().unwrap();
    assert_eq!(after_start.content, "Prefix\nOriginal content\nNew content");
}

#[tokio::test]
async fn insert_content_against_missing_block_is_block_not_found() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    let err = store
        .insert_content("ghost", "x", InsertPosition::End)
        .await
        .expect_err("missing block must fail");
    assert!(matches!(err, EngineError::BlockNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn replace_content_first_occurrence() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("b", "B", "The old text here", BlockType::Core)
        .await
        .unwrap();

    store
        .replace_content("b", "old text", "new text")
        .await
        .unwrap();

    let after = store.get_block("b").unwrap().unwrap();
    assert_eq!(after.content, "The new text here");
}

#[tokio::test]
async fn replace_content_missing_substring_is_content_not_found() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("b", "B", "hello world", BlockType::Core)
        .await
        .unwrap();

    let err = store
        .replace_content("b", "nowhere", "anywhere")
        .await
        .expect_err("absent substring must fail");
    assert!(matches!(err, EngineError::ContentNotFound(id) if id == "b"));

    // Content is unchanged after a failed replace.
    let after = store.get_block("b").unwrap().unwrap();
    assert_eq!(after.content, "hello world");
}

#[tokio::test]
async fn rethink_block_overwrites_unconditionally() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("b", "B", "stale", BlockType::Core)
        .await
        .unwrap();

    store
        .rethink_block("b", "fresh", Some("correcting a stale fact"))
        .await
        .unwrap();

    let after = store.get_block("b").unwrap().unwrap();
    assert_eq!(after.content, "fresh");
}

#[tokio::test]
async fn archival_insert_id_pattern_and_search() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    let id = store
        .insert_archival("Historical fact", Some(serde_json::json!({"category": "history"})))
        .await
        .unwrap();

    let re_prefix = "archival_";
    assert!(id.starts_with(re_prefix));
    let rest = &id[re_prefix.len()..];
    let mut parts = rest.splitn(2, '_');
    let ms_part = parts.next().unwrap();
    let rand_part = parts.next().unwrap();
    assert!(!ms_part.is_empty() && ms_part.chars().all(|c| c.is_ascii_digit()));
    assert!(!rand_part.is_empty() && rand_part.chars().all(|c| c.is_ascii_alphanumeric()));

    let found = store.search_archival_text("Historical", 10).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, id);
    assert_eq!(found[0].metadata["category"], "history");
}

#[tokio::test]
async fn semantic_search_over_core_blocks() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("a", "A", "likes dark roast coffee", BlockType::Core)
        .await
        .unwrap();
    store
        .create_block("c", "C", "works as a software engineer", BlockType::Core)
        .await
        .unwrap();

    let blocks = store.get_all_blocks(Some(BlockType::Core)).unwrap();
    let results = store
        .search_blocks("likes dark roast coffee", &blocks, 5, 0.0)
        .await
        .expect("search with deterministic embedding provider must succeed");

    assert!(!results.is_empty());
    // The identical-text block must score highest against its own query.
    assert_eq!(results[0].0.id, "a");
}

#[tokio::test]
async fn delete_block_removes_row_and_cache() {
    let db = TestDatabaseManager::new_with_doubles("unused");
    let store = &db.store;

    store
        .create_block("gone", "Gone", "temp", BlockType::Core)
        .await
        .unwrap();
    store.delete_block("gone").await.unwrap();

    assert!(store.get_block("gone").unwrap().is_none());
}
