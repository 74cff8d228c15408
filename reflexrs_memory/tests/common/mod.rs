#![allow(dead_code)]

use reflexrs_core::{CacheConfig, Pattern, StoreConfig};
use reflexrs_memory::PatternStore;
use tempfile::TempDir;

/// Fresh store over a SQLite file in a temp dir. Keep the dir alive for the
/// duration of the test.
pub async fn store() -> (TempDir, PatternStore) {
    store_with(&CacheConfig::default()).await
}

pub async fn store_with(cache: &CacheConfig) -> (TempDir, PatternStore) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = StoreConfig::sqlite_file(&dir.path().join("reflex.db"));
    let store = PatternStore::connect(&config, cache)
        .await
        .expect("Failed to open store");
    (dir, store)
}

pub fn pattern_with_id(id: &str, trigger: &str, response: &str) -> Pattern {
    let mut p = Pattern::new(trigger, response);
    p.id = id.to_string();
    p
}
