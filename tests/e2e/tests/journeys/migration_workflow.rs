//! Legacy `kv_memory` -> typed `blocks` migration, followed by rollback,
//! exercised end to end against a real on-disk store.

use harness::TestDatabaseManager;
use memengine_core::BlockType;

#[tokio::test]
async fn classifies_rows_into_standard_blocks_and_renames_kv_memory() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    store.kv_write("customer_notes", "prefers dark roast coffee").unwrap();
    store.kv_write("user_preferences", "likes terse replies").unwrap();
    store.kv_write("agent_info", "friendly support persona").unwrap();

    assert!(store.migration_needed().unwrap());

    let report = store.migrate_kv_to_blocks().await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.migrated, 3);
    assert_eq!(report.skipped, 0);
    assert!(report.errors.is_empty());

    // customer_notes + user_preferences -> human, agent_info -> persona.
    let human = store.get_block("human").unwrap().unwrap();
    assert!(human.content.contains("customer_notes"));
    assert!(human.content.contains("user_preferences"));
    assert!(human.content.contains("prefers dark roast coffee"));

    let persona = store.get_block("persona").unwrap().unwrap();
    assert!(persona.content.contains("agent_info"));
    assert!(persona.content.contains("friendly support persona"));

    let context = store.get_block("context").unwrap().unwrap();
    assert_eq!(context.block_type, BlockType::Core);

    // No longer needed: blocks now hold at least one row.
    assert!(!store.migration_needed().unwrap());
}

#[tokio::test]
async fn rollback_restores_kv_memory_row_for_row() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    store.kv_write("human_notes", "left-handed").unwrap();
    let before = store.kv_load_all().unwrap();

    store.migrate_kv_to_blocks().await.unwrap();
    store.rollback_migration().unwrap();

    let after = store.kv_load_all().unwrap();
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.purpose, a.purpose);
        assert_eq!(b.text, a.text);
        assert_eq!(b.updated_at, a.updated_at);
    }
}

#[tokio::test]
async fn rollback_without_prior_migration_fails() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    assert!(store.rollback_migration().is_err());
}

#[tokio::test]
async fn export_blocks_to_kv_round_trips_core_content() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    store
        .create_block("human", "Human", "likes tea", BlockType::Core)
        .await
        .unwrap();
    store
        .create_block("persona", "Persona", "is a helpful assistant", BlockType::Core)
        .await
        .unwrap();

    let exported = store.export_blocks_to_kv().unwrap();
    assert_eq!(exported, 2);

    let human_entry = store.kv_read("human").unwrap().expect("human kv row");
    assert_eq!(human_entry.text, "likes tea");
}

#[tokio::test]
async fn migration_with_no_kv_rows_is_a_no_op() {
    let db = TestDatabaseManager::new_bare();
    let store = &db.store;

    assert!(!store.migration_needed().unwrap());
    let report = store.migrate_kv_to_blocks().await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.migrated, 0);
}
