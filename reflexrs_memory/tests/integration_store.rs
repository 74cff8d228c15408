//! Integration tests for single-row pattern operations against SQLite.

mod common;

use std::time::Duration;

use common::{pattern_with_id, store, store_with};
use reflexrs_core::{
    CacheConfig, GLOBAL_SPACE, Note, NoteRepo, Pattern, PatternFilter, PatternRepo, Space,
    SpaceRepo, StoreError,
};
use reflexrs_entities::patterns;
use sea_orm::EntityTrait;

#[tokio::test]
async fn test_save_then_get_applies_defaults() {
    let (_dir, store) = store().await;

    let saved = store
        .save(&Pattern::new("hello", "Hi there!"))
        .await
        .expect("Failed to save");
    let loaded = store.get(&saved.id).await.expect("Failed to get");

    assert_eq!(loaded.trigger, "hello");
    assert_eq!(loaded.response, "Hi there!");
    assert!(loaded.strength.abs() < f64::EPSILON);
    assert!((loaded.threshold - 50.0).abs() < f64::EPSILON);
    assert!((loaded.decay_rate - 0.05).abs() < f64::EPSILON);
    assert_eq!(loaded.space_id, GLOBAL_SPACE);
    assert!(loaded.deleted_at.is_none());
    assert!(!loaded.is_active());
}

#[tokio::test]
async fn test_save_trims_trigger_and_defaults_space() {
    let (_dir, store) = store().await;

    let saved = store
        .save(&Pattern::new("  good morning ", "morning!").with_space(""))
        .await
        .expect("Failed to save");

    assert_eq!(saved.trigger, "good morning");
    assert_eq!(saved.space_id, GLOBAL_SPACE);
}

#[tokio::test]
async fn test_invalid_patterns_are_rejected_without_writing() {
    let (_dir, store) = store().await;

    let invalid = [
        Pattern::new("", "response"),
        Pattern::new("   ", "response"),
        Pattern::new("x".repeat(501), "response"),
        Pattern::new("trigger", ""),
        Pattern::new("trigger", "r").with_strength(150.0),
        Pattern::new("trigger", "r").with_threshold(f64::NAN),
        Pattern::new("trigger", "r").with_decay_rate(1.5),
    ];
    for p in &invalid {
        let err = store.save(p).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)), "{err}");
    }

    let count = store
        .count_matching(&PatternFilter::new())
        .await
        .expect("Failed to count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_trigger_length_is_counted_in_characters() {
    let (_dir, store) = store().await;

    store
        .save(&Pattern::new("x".repeat(500), "ok"))
        .await
        .expect("500 chars should be accepted");
    store
        .save(&Pattern::new("你".repeat(500), "ok"))
        .await
        .expect("500 multibyte chars should be accepted");
}

#[tokio::test]
async fn test_update_requires_live_row() {
    let (_dir, store) = store().await;

    let missing = pattern_with_id("nope", "t", "r");
    assert!(store.update(&missing).await.unwrap_err().is_not_found());

    let saved = store.save(&Pattern::new("t", "r")).await.expect("save");
    store.delete(&saved.id).await.expect("delete");
    assert!(store.update(&saved).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_keeps_created_at() {
    let (_dir, store) = store().await;

    let saved = store.save(&Pattern::new("t", "r")).await.expect("save");
    let mut changed = saved.clone();
    changed.response = "new response".to_string();
    changed.created_at = chrono::Utc::now() + chrono::Duration::days(1);

    let updated = store.update(&changed).await.expect("update");
    assert_eq!(updated.response, "new response");
    assert_eq!(updated.created_at, saved.created_at);
    assert!(updated.updated_at > saved.updated_at);
}

#[tokio::test]
async fn test_delete_is_idempotent_and_hides_row() {
    let (_dir, store) = store().await;

    let keep = store.save(&Pattern::new("keep", "r")).await.expect("save");
    let gone = store.save(&Pattern::new("gone", "r")).await.expect("save");

    store.delete(&gone.id).await.expect("first delete");
    let first = patterns::Entity::find_by_id(gone.id.clone())
        .one(store.db())
        .await
        .expect("Failed to read row")
        .expect("row is kept after soft delete")
        .deleted_at
        .expect("deleted_at is set");

    store.delete(&gone.id).await.expect("second delete");
    let second = patterns::Entity::find_by_id(gone.id.clone())
        .one(store.db())
        .await
        .expect("Failed to read row")
        .expect("row is kept after soft delete")
        .deleted_at;
    assert_eq!(second, Some(first));
    store.delete("never-existed").await.expect("missing delete");

    assert!(store.get(&gone.id).await.unwrap_err().is_not_found());
    let listed = store.list(&PatternFilter::new()).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep.id);
    assert!(store.get_by_trigger("gone").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_save_over_deleted_row_stays_deleted() {
    let (_dir, store) = store().await;

    let saved = store.save(&Pattern::new("t", "r")).await.expect("save");
    store.delete(&saved.id).await.expect("delete");

    let resaved = store.save(&saved).await.expect("resave");
    assert!(resaved.deleted_at.is_some());
    assert!(store.get(&saved.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_top_by_strength_orders_descending() {
    let (_dir, store) = store().await;

    for (trigger, strength) in [("low", 10.0), ("high", 80.0), ("mid", 70.0)] {
        store
            .save(&Pattern::new(trigger, "r").with_strength(strength))
            .await
            .expect("save");
    }

    let top = store.top_by_strength(2).await.expect("top");
    let strengths: Vec<f64> = top.iter().map(|p| p.strength).collect();
    assert_eq!(strengths, vec![80.0, 70.0]);
    assert!(store.top_by_strength(0).await.expect("top 0").is_empty());
}

#[tokio::test]
async fn test_recently_used_only_lists_reinforced() {
    let (_dir, store) = store().await;

    let a = store.save(&Pattern::new("a", "r")).await.expect("save");
    let b = store.save(&Pattern::new("b", "r")).await.expect("save");
    store.save(&Pattern::new("c", "r")).await.expect("save");

    store.reinforce(&a.id, 5.0).await.expect("reinforce a");
    tokio::time::sleep(Duration::from_millis(5)).await;
    store.reinforce(&b.id, 5.0).await.expect("reinforce b");

    let recent = store.recently_used(10).await.expect("recent");
    let ids: Vec<&str> = recent.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![b.id.as_str(), a.id.as_str()]);
}

#[tokio::test]
async fn test_get_by_trigger_prefers_newest() {
    let (_dir, store) = store().await;

    store.save(&Pattern::new("ping", "old")).await.expect("save");
    store.save(&Pattern::new("ping", "new")).await.expect("save");

    let found = store.get_by_trigger("ping").await.expect("by trigger");
    assert_eq!(found.response, "new");
    assert!(store.get_by_trigger("pong").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_search_by_text_matches_trigger_or_response() {
    let (_dir, store) = store().await;

    store
        .save(&Pattern::new("Deploy the app", "run make").with_strength(20.0))
        .await
        .expect("save");
    store
        .save(&Pattern::new("status", "deployment is green").with_strength(60.0))
        .await
        .expect("save");
    store.save(&Pattern::new("coffee", "brew")).await.expect("save");
    store
        .save(&Pattern::new("sale", "50% off"))
        .await
        .expect("save");

    let hits = store
        .search_by_text("DEPLOY", &PatternFilter::new())
        .await
        .expect("search");
    let triggers: Vec<&str> = hits.iter().map(|p| p.trigger.as_str()).collect();
    assert_eq!(triggers, vec!["status", "Deploy the app"]);

    let limited = store
        .search_by_text("deploy", &PatternFilter::new().limit(1))
        .await
        .expect("search");
    assert_eq!(limited.len(), 1);

    let literal = store
        .search_by_text("%", &PatternFilter::new())
        .await
        .expect("search");
    assert_eq!(literal.len(), 1);
    assert_eq!(literal[0].trigger, "sale");

    assert!(
        store
            .search_by_text("  ", &PatternFilter::new())
            .await
            .expect("search")
            .is_empty()
    );
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let (_dir, store) = store().await;

    store
        .save(&Pattern::new("a", "r").with_project("alpha").with_strength(10.0))
        .await
        .expect("save");
    store
        .save(&Pattern::new("b", "r").with_project("alpha").with_strength(60.0))
        .await
        .expect("save");
    store
        .save(&Pattern::new("c", "r").with_project("beta").with_space("work"))
        .await
        .expect("save");

    let alpha = store
        .list(&PatternFilter::new().project("alpha"))
        .await
        .expect("list");
    let triggers: Vec<&str> = alpha.iter().map(|p| p.trigger.as_str()).collect();
    assert_eq!(triggers, vec!["b", "a"]);

    let strong = store
        .list(&PatternFilter::new().min_strength(50.0))
        .await
        .expect("list");
    assert_eq!(strong.len(), 1);

    let work = store
        .list(&PatternFilter::new().space("work"))
        .await
        .expect("list");
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].trigger, "c");

    let page = store
        .list(&PatternFilter::new().limit(1).offset(1))
        .await
        .expect("list");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].trigger, "b");

    let count = store
        .count_matching(&PatternFilter::new().project("alpha"))
        .await
        .expect("count");
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_updated_at_strictly_increases() {
    let (_dir, store) = store().await;

    let mut p = store.save(&Pattern::new("t", "r")).await.expect("save");
    for i in 0..20 {
        p.response = format!("r{i}");
        let next = store.save(&p).await.expect("resave");
        assert!(next.updated_at > p.updated_at);
        p = next;
    }
}

#[tokio::test]
async fn test_reinforce_saturates_and_tracks_usage() {
    let (_dir, store) = store().await;

    let p = store
        .save(&Pattern::new("t", "r").with_strength(95.0))
        .await
        .expect("save");
    let reinforced = store.reinforce(&p.id, 10.0).await.expect("reinforce");

    assert!((reinforced.strength - 100.0).abs() < f64::EPSILON);
    assert_eq!(reinforced.reinforce_count, 1);
    assert!(reinforced.last_used_at.is_some());
    assert!(store.reinforce("missing", 1.0).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_decay_all_skips_disabled_and_deleted() {
    let (_dir, store) = store().await;

    let decays = store
        .save(&Pattern::new("decays", "r").with_strength(100.0))
        .await
        .expect("save");
    let mut pinned = Pattern::new("pinned", "r").with_strength(100.0);
    pinned.decay_enabled = false;
    let pinned = store.save(&pinned).await.expect("save");
    let deleted = store
        .save(&Pattern::new("deleted", "r").with_strength(100.0))
        .await
        .expect("save");
    store.delete(&deleted.id).await.expect("delete");

    let changed = store
        .decay_all(Duration::from_secs(24 * 60 * 60))
        .await
        .expect("decay");
    assert_eq!(changed, 1);

    let after = store.get(&decays.id).await.expect("get");
    assert!((after.strength - 95.0).abs() < 1e-9);
    assert_eq!(after.decay_count, 1);
    let untouched = store.get(&pinned.id).await.expect("get");
    assert!((untouched.strength - 100.0).abs() < f64::EPSILON);

    assert_eq!(store.decay_all(Duration::ZERO).await.expect("decay"), 0);
}

#[tokio::test]
async fn test_get_is_served_from_cache() {
    let (_dir, store) = store().await;

    let p = store.save(&Pattern::new("t", "r")).await.expect("save");
    store.get(&p.id).await.expect("get");
    store.get(&p.id).await.expect("get");

    let stats = store.stats();
    let cache = stats.cache.expect("cache enabled");
    assert_eq!(cache.hits, 2);
    assert_eq!(stats.read_ops, 0);
}

#[tokio::test]
async fn test_cache_sees_writes() {
    let (_dir, store) = store().await;

    let p = store.save(&Pattern::new("t", "r")).await.expect("save");
    store.get(&p.id).await.expect("warm");
    store.reinforce(&p.id, 30.0).await.expect("reinforce");
    let loaded = store.get(&p.id).await.expect("get");
    assert!((loaded.strength - 30.0).abs() < f64::EPSILON);

    store.delete(&p.id).await.expect("delete");
    assert!(store.get(&p.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_store_without_cache() {
    let cache = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let (_dir, store) = store_with(&cache).await;

    let p = store.save(&Pattern::new("t", "r")).await.expect("save");
    store.get(&p.id).await.expect("get");
    store.get(&p.id).await.expect("get");

    let stats = store.stats();
    assert!(stats.cache.is_none());
    assert_eq!(stats.read_ops, 2);
    assert_eq!(stats.write_ops, 1);

    store.reset_stats();
    assert_eq!(store.stats().read_ops, 0);
}

#[tokio::test]
async fn test_point_queries_reuse_statements() {
    let (_dir, store) = store().await;

    store.save(&Pattern::new("t", "r")).await.expect("save");
    for _ in 0..3 {
        store.top_by_strength(5).await.expect("top");
    }
    let stats = store.stats();
    assert_eq!(stats.statement_misses, 1);
    assert_eq!(stats.statement_hits, 2);
}

#[tokio::test]
async fn test_spaces_seeded_and_managed() {
    let (_dir, store) = store().await;

    let global = store.get_space(GLOBAL_SPACE).await.expect("global seeded");
    assert_eq!(global.name, GLOBAL_SPACE);

    let work = store
        .create_space(&Space::new("work").with_description("office"))
        .await
        .expect("create");
    assert!(matches!(
        store.create_space(&work).await.unwrap_err(),
        StoreError::Constraint { .. }
    ));

    let names: Vec<String> = store
        .list_spaces()
        .await
        .expect("list")
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["global".to_string(), "work".to_string()]);

    store.delete_space(&work.id).await.expect("delete");
    assert!(store.get_space(&work.id).await.unwrap_err().is_not_found());
    assert!(store.delete_space(GLOBAL_SPACE).await.is_err());
}

#[tokio::test]
async fn test_notes_round_trip() {
    let (_dir, store) = store().await;

    let p = store.save(&Pattern::new("t", "r")).await.expect("save");
    let note = store
        .save_note(&Note::new(GLOBAL_SPACE, "why", "learned from chat").for_pattern(p.id.clone()))
        .await
        .expect("save note");
    store
        .save_note(&Note::new("other", "elsewhere", ""))
        .await
        .expect("save note");

    let loaded = store.get_note(&note.id).await.expect("get note");
    assert_eq!(loaded.pattern_id.as_deref(), Some(p.id.as_str()));

    let in_global = store.list_notes(Some(GLOBAL_SPACE)).await.expect("list");
    assert_eq!(in_global.len(), 1);
    assert_eq!(store.list_notes(None).await.expect("list").len(), 2);

    store.delete_note(&note.id).await.expect("delete");
    assert!(store.get_note(&note.id).await.unwrap_err().is_not_found());
    assert!(
        store
            .save_note(&Note::new(GLOBAL_SPACE, "", "x"))
            .await
            .is_err()
    );
}
