//! On-disk database tests.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use laterly_core::{
    Action, Category, Context, ContextProvider, Database, Item, LearningStore, SuggestionCoordinator,
};
use tempfile::TempDir;

#[test]
fn test_learning_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("laterly.db");
    let monday = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

    {
        let db: Arc<dyn LearningStore> = Arc::new(Database::open_at(&path).unwrap());
        let mut contexts = ContextProvider::new(db);
        assert!(contexts.compute_context(monday).is_first_visit);
    }

    let db: Arc<dyn LearningStore> = Arc::new(Database::open_at(&path).unwrap());
    let mut contexts = ContextProvider::new(db);
    assert!(!contexts.compute_context(monday + Duration::hours(3)).is_first_visit);
    assert!(contexts.compute_context(monday + Duration::days(1)).is_first_visit);
}

#[test]
fn test_tracked_events_persist_with_capacity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("laterly.db");
    let start = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();
    let capacity = 5;

    {
        let db = Arc::new(Database::open_at(&path).unwrap());
        let store: Arc<dyn LearningStore> = db.clone();
        let mut coordinator = SuggestionCoordinator::new(store);
        let mut log = db.load_log(capacity).unwrap();

        for i in 0..8 {
            let ctx = Context::at(start + Duration::minutes(i), false);
            let item = Item::new(format!("i{i}"), Category::Life, start - Duration::days(1));
            let event = coordinator.track_interaction_at(&mut log, Action::Read, &item, &ctx);
            db.append_event(&event, capacity).unwrap();
        }
        assert_eq!(log.len(), 5);
    }

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.event_count().unwrap(), 5);
    let log = db.load_log(capacity).unwrap();
    let ids: Vec<_> = log.events().map(|e| e.item.id.as_str()).collect();
    assert_eq!(ids, vec!["i3", "i4", "i5", "i6", "i7"]);
}

#[test]
fn test_open_at_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no/such/dir/laterly.db");
    assert!(Database::open_at(&path).is_err());
}
