//! Recommendation orchestration.
//!
//! The coordinator runs the whole pipeline for one request:
//!
//! 1. compute the [`Context`]
//! 2. analyze the behavior log into [`UserPatterns`]
//! 3. detect the [`Moment`] from the context, patterns, session and recent activity
//! 4. filter the items by the moment's content rules (completed items never pass)
//! 5. score what is left
//! 6. assemble a [`RecommendationBundle`]
//!
//! It also owns the interaction entry points, which feed the behavior log,
//! the runtime session window and the scoring engine's learning state.

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::behavior::{Action, BehaviorEvent, BehaviorLog};
use crate::context::{Context, ContextProvider, TimeOfDay};
use crate::item::{Category, Item, ItemKind, ItemState};
use crate::moment::{Moment, MomentDetector, MomentRecommendations, MomentType, DEFAULT_CONFIDENCE_THRESHOLD};
use crate::patterns::{PatternAnalyzer, UserPatterns, DEFAULT_SESSION_GAP_MINUTES};
use crate::scoring::{factors, ScoreBreakdown, ScoredItem, ScoringEngine};
use crate::session::SessionWindow;
use crate::store::LearningStore;

/// Moment confidence above which the moment's own phrasing replaces the
/// scoring engine's reason.
const MOMENT_REASON_CONFIDENCE: f64 = 0.7;

/// Tunables for one coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    /// Log entries handed to the moment detector as recent activity
    pub recent_activity: usize,
    pub attention_limit: usize,
    pub continue_limit: usize,
    pub quick_action_limit: usize,
    pub confidence_threshold: f64,
    pub session_gap_minutes: i64,
    pub context_cache_minutes: i64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            recent_activity: 10,
            attention_limit: 3,
            continue_limit: 2,
            quick_action_limit: 2,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            session_gap_minutes: DEFAULT_SESSION_GAP_MINUTES,
            context_cache_minutes: 60,
        }
    }
}

/// The single item recommended for right now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentPick {
    pub item: Item,
    pub score: f64,
    pub reason: String,
    /// Suggested verb, e.g. "Read now"
    pub action: String,
    pub breakdown: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionItem {
    pub item: Item,
    pub reason: String,
    pub urgency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinueItem {
    pub item: Item,
    pub percent_complete: u32,
    pub remaining_minutes: u32,
}

/// A canned, item-independent suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickAction {
    pub id: String,
    pub title: String,
    pub description: String,
}

impl QuickAction {
    fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMeta {
    pub moment: MomentType,
    pub confidence: f64,
    pub total_items: usize,
    pub scored_items: usize,
    pub generated_at: DateTime<Utc>,
}

/// Everything the presentation layer renders for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBundle {
    pub for_this_moment: Option<MomentPick>,
    pub might_need_attention: Vec<AttentionItem>,
    pub continue_reading: Vec<ContinueItem>,
    pub quick_actions: Vec<QuickAction>,
    pub meta: BundleMeta,
}

/// Whether an item survives a moment's content rules.
pub fn allowed_by(rules: &MomentRecommendations, item: &Item) -> bool {
    if rules.max_duration.is_some_and(|max| item.duration_minutes() > max) {
        return false;
    }
    if !rules.preferred_types.is_empty() && !rules.preferred_types.iter().any(|l| item.matches_label(l)) {
        return false;
    }
    !rules.avoid.iter().any(|label| {
        item.matches_label(label)
            || label.eq_ignore_ascii_case(item.complexity().as_str())
            || label.eq_ignore_ascii_case(item.urgency.as_str())
    })
}

/// How much an item needs the user's attention, in [0, 1].
pub fn urgency_score(item: &Item, ctx: &Context) -> f64 {
    let staleness = item.staleness_days(ctx.now);
    let mut urgency: f64 = 0.0;

    if staleness > 7.0 {
        urgency += 0.3;
    } else if staleness > 3.0 {
        urgency += 0.2;
    }
    if item.state == ItemState::Inbox {
        urgency += 0.3;
    }
    if item.progress() > 0.7 {
        urgency += 0.4;
    }
    if item.category == Category::Work && ctx.time_of_day == TimeOfDay::Morning {
        urgency += 0.2;
    }

    urgency.clamp(0.0, 1.0)
}

fn moment_reason(moment: MomentType) -> Option<&'static str> {
    match moment {
        MomentType::Commute => Some("Perfect for your commute"),
        MomentType::QuickBreak => Some("A quick one for your break"),
        MomentType::WindDown => Some("Something calm to end the day"),
        MomentType::Weekend => Some("A good weekend read"),
        MomentType::Focus => Some("Good use of your focus time"),
        MomentType::Triage => Some("Quick to decide on"),
        MomentType::Explore => Some("Something new to explore"),
        MomentType::General => None,
    }
}

fn suggested_action(moment: MomentType, item: &Item, available_minutes: f64) -> &'static str {
    let progress = item.progress();
    if moment == MomentType::Commute && matches!(item.kind, ItemKind::Article { .. }) {
        "Listen with text-to-speech"
    } else if moment == MomentType::Triage {
        "Quick decision"
    } else if progress > 0.7 {
        "Finish reading"
    } else if progress > 0.0 {
        "Continue"
    } else if item.duration_minutes() as f64 <= available_minutes {
        "Read now"
    } else {
        "Start when you have time"
    }
}

fn attention_reason(item: &Item, ctx: &Context) -> String {
    let staleness = item.staleness_days(ctx.now);
    if item.is_partially_read() {
        format!("{}% complete", (item.progress() * 100.0).round() as u32)
    } else if (2.0..=3.0).contains(&staleness) {
        "Perfect timing".to_string()
    } else if staleness > 7.0 {
        "Been waiting a while".to_string()
    } else if item.state == ItemState::Inbox {
        "Needs to be sorted".to_string()
    } else {
        "Worth a look".to_string()
    }
}

fn needs_attention(item: &Item, ctx: &Context) -> bool {
    item.state == ItemState::Inbox || item.staleness_days(ctx.now) > 2.0 || item.is_partially_read()
}

fn quick_actions_for(moment: MomentType, ctx: &Context) -> Vec<QuickAction> {
    match moment {
        MomentType::Commute => vec![
            QuickAction::new(
                "find-audio",
                "Find something to listen to",
                "Queue an article for text-to-speech",
            ),
            QuickAction::new(
                "bite-sized",
                "Something bite-sized",
                "A short read that fits between stops",
            ),
        ],
        MomentType::QuickBreak => vec![
            QuickAction::new(
                "capture-inspiration",
                "Capture a quick inspiration",
                "Jot down an idea before it slips away",
            ),
            QuickAction::new(
                "surprise-me",
                "Surprise me",
                "Open something from your inspiration pile",
            ),
        ],
        MomentType::WindDown => vec![
            QuickAction::new(
                "calming-read",
                "Pick a calming read",
                "Something light from your life collection",
            ),
            QuickAction::new("reflect", "Reflect on your day", "Note what went well"),
        ],
        MomentType::Triage => vec![
            QuickAction::new(
                "clear-inbox",
                "Clear your inbox",
                "Archive or sort what is waiting",
            ),
            QuickAction::new(
                "archive-stale",
                "Let go of old items",
                "Archive what has waited more than a month",
            ),
        ],
        _ => match ctx.time_of_day {
            TimeOfDay::Morning => vec![QuickAction::new(
                "set-intention",
                "Set an intention",
                "Pick one thing that matters today",
            )],
            TimeOfDay::Evening => vec![QuickAction::new(
                "reflect",
                "Reflect on your day",
                "Note what went well",
            )],
            TimeOfDay::Afternoon | TimeOfDay::Night => Vec::new(),
        },
    }
}

/// `minutes` as a duration, or `fallback` when chrono cannot represent it.
fn minutes_or(minutes: i64, fallback: Duration) -> Duration {
    Duration::try_minutes(minutes).unwrap_or(fallback)
}

/// Runs the recommendation pipeline and records interactions.
pub struct SuggestionCoordinator {
    contexts: ContextProvider,
    analyzer: PatternAnalyzer,
    moments: MomentDetector,
    scoring: ScoringEngine,
    session: SessionWindow,
    settings: CoordinatorSettings,
}

impl SuggestionCoordinator {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self::with_settings(store, CoordinatorSettings::default())
    }

    pub fn with_settings(store: Arc<dyn LearningStore>, settings: CoordinatorSettings) -> Self {
        Self {
            contexts: ContextProvider::with_max_age(
                store.clone(),
                minutes_or(settings.context_cache_minutes, Duration::hours(1)),
            ),
            analyzer: PatternAnalyzer::with_session_gap(settings.session_gap_minutes),
            moments: MomentDetector::with_threshold(store.clone(), settings.confidence_threshold),
            scoring: ScoringEngine::new(store),
            session: SessionWindow::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionWindow {
        &self.session
    }

    pub fn scoring(&self) -> &ScoringEngine {
        &self.scoring
    }

    /// Replace the runtime session with the one the log ends in. Hosts
    /// that do not stay resident call this before each request.
    pub fn resume_session(&mut self, log: &BehaviorLog, now: DateTime<Utc>) {
        let gap = minutes_or(
            self.settings.session_gap_minutes,
            Duration::minutes(DEFAULT_SESSION_GAP_MINUTES),
        );
        self.session = SessionWindow::from_log(log, now, gap);
    }

    /// Context for the local wall clock, cached per the settings.
    pub fn current_context(&mut self) -> Context {
        self.contexts.current(Local::now())
    }

    pub fn analyze(&self, log: &BehaviorLog) -> UserPatterns {
        self.analyzer.analyze(log.events())
    }

    /// Detect the moment without scoring anything.
    pub fn detect_moment(&mut self, log: &BehaviorLog, ctx: &Context) -> Moment {
        let patterns = self.analyze(log);
        let recent = log.recent(self.settings.recent_activity);
        self.moments.detect_moment(ctx, &patterns, &self.session, &recent)
    }

    /// Recommendations for the current local time.
    pub fn generate_recommendations(&mut self, items: &[Item], log: &BehaviorLog) -> RecommendationBundle {
        let ctx = self.current_context();
        self.generate_at(items, log, &ctx)
    }

    /// Recommendations for an explicit context.
    pub fn generate_at(&mut self, items: &[Item], log: &BehaviorLog, ctx: &Context) -> RecommendationBundle {
        let patterns = self.analyze(log);
        let recent = log.recent(self.settings.recent_activity);
        let moment = self.moments.detect_moment(ctx, &patterns, &self.session, &recent);

        let eligible: Vec<Item> = items
            .iter()
            .filter(|item| !item.is_completed() && allowed_by(&moment.recommendations, item))
            .cloned()
            .collect();

        let session = self.session.characteristics(ctx.now);
        let scored = self.scoring.score_items(&eligible, ctx, &patterns, &session);
        let available = factors::available_minutes(ctx, &session);

        tracing::debug!(
            moment = %moment.moment_type,
            total = items.len(),
            eligible = eligible.len(),
            "recommendations generated"
        );

        RecommendationBundle {
            for_this_moment: scored.first().map(|top| self.pick(top, &moment, available)),
            might_need_attention: self.attention(&scored, ctx),
            continue_reading: self.continue_reading(&scored),
            quick_actions: {
                let mut cards = quick_actions_for(moment.moment_type, ctx);
                cards.truncate(self.settings.quick_action_limit);
                cards
            },
            meta: BundleMeta {
                moment: moment.moment_type,
                confidence: moment.confidence,
                total_items: items.len(),
                scored_items: scored.len(),
                generated_at: ctx.now,
            },
        }
    }

    fn pick(&self, top: &ScoredItem, moment: &Moment, available: f64) -> MomentPick {
        let reason = if moment.confidence > MOMENT_REASON_CONFIDENCE {
            moment_reason(moment.moment_type)
                .map(str::to_string)
                .unwrap_or_else(|| top.reason.clone())
        } else {
            top.reason.clone()
        };

        MomentPick {
            item: top.item.clone(),
            score: top.score,
            reason,
            action: suggested_action(moment.moment_type, &top.item, available).to_string(),
            breakdown: top.breakdown.clone(),
        }
    }

    fn attention(&self, scored: &[ScoredItem], ctx: &Context) -> Vec<AttentionItem> {
        let mut attention: Vec<AttentionItem> = scored
            .iter()
            .skip(1)
            .filter(|s| needs_attention(&s.item, ctx))
            .map(|s| AttentionItem {
                item: s.item.clone(),
                reason: attention_reason(&s.item, ctx),
                urgency: urgency_score(&s.item, ctx),
            })
            .collect();

        attention.sort_by(|a, b| b.urgency.total_cmp(&a.urgency));
        attention.truncate(self.settings.attention_limit);
        attention
    }

    fn continue_reading(&self, scored: &[ScoredItem]) -> Vec<ContinueItem> {
        scored
            .iter()
            .filter(|s| s.item.state == ItemState::Library && s.item.is_partially_read())
            .take(self.settings.continue_limit)
            .map(|s| {
                let progress = s.item.progress();
                let remaining = (s.item.duration_minutes() as f64 * (1.0 - progress)).ceil() as u32;
                ContinueItem {
                    item: s.item.clone(),
                    percent_complete: (progress * 100.0).round() as u32,
                    remaining_minutes: remaining.max(1),
                }
            })
            .collect()
    }

    /// Record an action at the current local time.
    pub fn track_interaction(&mut self, log: &mut BehaviorLog, action: Action, item: &Item) -> BehaviorEvent {
        let ctx = self.current_context();
        self.track_interaction_at(log, action, item, &ctx)
    }

    pub fn track_interaction_at(
        &mut self,
        log: &mut BehaviorLog,
        action: Action,
        item: &Item,
        ctx: &Context,
    ) -> BehaviorEvent {
        let event = BehaviorEvent::new(action.clone(), item, ctx);
        self.session.push(action, ctx.now);
        log.append(event.clone());
        event
    }

    /// Record an action taken on a surfaced suggestion at the current local time.
    pub fn track_suggestion_interaction(
        &mut self,
        log: &mut BehaviorLog,
        action: Action,
        item: &Item,
        suggestion_type: &str,
    ) -> BehaviorEvent {
        let ctx = self.current_context();
        self.track_suggestion_interaction_at(log, action, item, suggestion_type, &ctx)
    }

    /// Engagement-like actions count as a delivered suggestion, rejections
    /// count against the item's category at this time of day. Both are
    /// then logged like any other interaction.
    pub fn track_suggestion_interaction_at(
        &mut self,
        log: &mut BehaviorLog,
        action: Action,
        item: &Item,
        suggestion_type: &str,
        ctx: &Context,
    ) -> BehaviorEvent {
        if action.is_positive() || action.is_light_engagement() {
            self.scoring.record_suggestion(item, ctx.now);
        } else if action.is_rejection() {
            self.scoring.record_rejection(item, ctx);
        }
        tracing::debug!(%action, item = %item.id, suggestion_type, "suggestion interaction");
        self.track_interaction_at(log, action, item, ctx)
    }
}
