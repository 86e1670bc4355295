//! End-to-end recommendation pipeline tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use laterly_core::patterns::PatternAnalyzer;
use laterly_core::{
    Action, BehaviorLog, Category, Context, Factor, Item, ItemState, LearningStore, MemoryStore,
    MomentDetector, MomentType, ScopedStore, SessionWindow, SuggestionCoordinator, UserPatterns,
};

fn monday_nine() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
}

fn scenario_items(now: DateTime<Utc>) -> Vec<Item> {
    vec![
        Item::new("a", Category::Work, now - Duration::hours(60))
            .with_duration(10)
            .with_state(ItemState::Inbox),
        Item::new("b", Category::Life, now - Duration::days(1))
            .with_progress(1.0)
            .with_state(ItemState::Library),
    ]
}

#[test]
fn test_end_to_end_scenario() {
    let ctx = Context::at(monday_nine(), false);
    let mut coordinator = SuggestionCoordinator::new(Arc::new(MemoryStore::new()));

    let bundle = coordinator.generate_at(&scenario_items(ctx.now), &BehaviorLog::new(), &ctx);

    let pick = bundle.for_this_moment.as_ref().expect("item a is recommended");
    assert_eq!(pick.item.id, "a");
    assert_eq!(pick.breakdown.score_of(Factor::Staleness), Some(1.0));

    let json = serde_json::to_value(&bundle).unwrap();
    let mentions_b = json.to_string().contains("\"id\":\"b\"");
    assert!(!mentions_b, "completed item leaked into the bundle");
}

#[test]
fn test_completed_items_never_surface() {
    let ctx = Context::at(monday_nine(), false);
    let mut coordinator = SuggestionCoordinator::new(Arc::new(MemoryStore::new()));
    let items: Vec<Item> = (0..6)
        .map(|i| {
            Item::new(format!("done{i}"), Category::Inspiration, ctx.now - Duration::days(i))
                .with_progress(1.0)
                .with_state(ItemState::Library)
        })
        .collect();

    let bundle = coordinator.generate_at(&items, &BehaviorLog::new(), &ctx);
    assert!(bundle.for_this_moment.is_none());
    assert!(bundle.continue_reading.is_empty());
    assert!(bundle.might_need_attention.is_empty());
    assert_eq!(bundle.meta.total_items, 6);
    assert_eq!(bundle.meta.scored_items, 0);
}

#[test]
fn test_moment_fallback_to_general() {
    let ctx = Context::at(monday_nine(), false);
    let mut detector = MomentDetector::new(Arc::new(MemoryStore::new()));
    let moment = detector.detect_moment(&ctx, &UserPatterns::default(), &SessionWindow::new(), &[]);
    assert_eq!(moment.moment_type, MomentType::General);
    assert_eq!(moment.confidence, 0.5);
}

#[test]
fn test_analyze_is_idempotent_over_tracked_log() {
    let store: Arc<dyn LearningStore> = Arc::new(MemoryStore::new());
    let mut coordinator = SuggestionCoordinator::new(store);
    let mut log = BehaviorLog::new();
    let start = monday_nine();

    for (i, action) in [Action::Open, Action::Read, Action::Skip, Action::Complete]
        .into_iter()
        .enumerate()
    {
        let ctx = Context::at(start + Duration::minutes(i as i64 * 3), false);
        let item = Item::new(format!("i{i}"), Category::Work, start - Duration::days(2));
        coordinator.track_interaction_at(&mut log, action, &item, &ctx);
    }

    let analyzer = PatternAnalyzer::new();
    let first = analyzer.analyze(log.events());
    let second = analyzer.analyze(log.events());
    assert_eq!(first, second);
    assert_eq!(first.events_analyzed, 4);
    assert_eq!(coordinator.analyze(&log), first);
}

#[test]
fn test_rejection_decay_through_the_coordinator() {
    let evening = Context::at(Utc.with_ymd_and_hms(2026, 10, 19, 19, 0, 0).unwrap(), false);
    let mut coordinator = SuggestionCoordinator::new(Arc::new(MemoryStore::new()));
    let mut log = BehaviorLog::new();
    let life = Item::new("l", Category::Life, evening.now - Duration::days(2)).with_duration(5);

    coordinator.track_suggestion_interaction_at(&mut log, Action::Dismiss, &life, "for_this_moment", &evening);

    let penalty_at = |coordinator: &mut SuggestionCoordinator, ctx: &Context| {
        let bundle = coordinator.generate_at(std::slice::from_ref(&life), &BehaviorLog::new(), ctx);
        bundle
            .for_this_moment
            .and_then(|p| p.breakdown.score_of(Factor::Rejection))
    };

    let penalty = penalty_at(&mut coordinator, &evening).unwrap();
    assert!((penalty - 0.8).abs() < 1e-9);

    let next_evening = Context::at(evening.now + Duration::hours(24), false);
    assert_eq!(penalty_at(&mut coordinator, &next_evening), Some(1.0));
}

#[test]
fn test_variety_decay_after_three_work_suggestions() {
    let ctx = Context::at(monday_nine(), false);
    let mut coordinator = SuggestionCoordinator::new(Arc::new(MemoryStore::new()));
    let mut log = BehaviorLog::new();

    for i in 0..3 {
        let item = Item::new(format!("w{i}"), Category::Work, ctx.now - Duration::days(1));
        coordinator.track_suggestion_interaction_at(&mut log, Action::Read, &item, "for_this_moment", &ctx);
    }

    let fresh = Item::new("w-new", Category::Work, ctx.now - Duration::days(1)).with_duration(10);
    let bundle = coordinator.generate_at(&[fresh], &BehaviorLog::new(), &ctx);
    let pick = bundle.for_this_moment.unwrap();
    assert_eq!(pick.breakdown.score_of(Factor::Variety), Some(0.2));
}

#[test]
fn test_scoped_stores_do_not_share_learning_state() {
    let backing: Arc<dyn LearningStore> = Arc::new(MemoryStore::new());
    let alice: Arc<dyn LearningStore> = Arc::new(ScopedStore::new(backing.clone(), "alice"));
    let bob: Arc<dyn LearningStore> = Arc::new(ScopedStore::new(backing, "bob"));

    let ctx = Context::at(monday_nine(), false);
    let mut alice_coord = SuggestionCoordinator::new(alice);
    let mut bob_coord = SuggestionCoordinator::new(bob);
    let item = Item::new("w", Category::Work, ctx.now - Duration::days(1));

    let mut log = BehaviorLog::new();
    for _ in 0..3 {
        alice_coord.track_suggestion_interaction_at(&mut log, Action::Read, &item, "for_this_moment", &ctx);
    }

    assert_eq!(alice_coord.scoring().recent_categories().len(), 3);
    assert!(bob_coord.scoring().recent_categories().is_empty());

    let bundle = bob_coord.generate_at(&[item.with_duration(10)], &BehaviorLog::new(), &ctx);
    assert_eq!(
        bundle.for_this_moment.unwrap().breakdown.score_of(Factor::Variety),
        Some(1.0)
    );
}
