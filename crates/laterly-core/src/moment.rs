//! Moment detection.
//!
//! A moment is a named usage situation (commute, wind-down, triage...) that
//! decides which items are eligible right now. Seven detectors each add up
//! independent signals into a confidence; the strongest wins, and a weak
//! winner falls back to [`MomentType::General`] rather than switching the
//! user's feed on thin evidence.
//!
//! Winning moments are written to a history table keyed by moment, weekday
//! and hour, which feeds back into the commute and wind-down detectors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::behavior::BehaviorEvent;
use crate::context::{Context, TimeOfDay};
use crate::item::Category;
use crate::patterns::UserPatterns;
use crate::session::{FocusLevel, InteractionSpeed, SessionCharacteristics, SessionMode, SessionWindow};
use crate::store::{load_json, save_json, LearningStore};

const HISTORY_KEY: &str = "moments.history";

/// Winners at or below this confidence are replaced by `general`.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Confidence a winner needs to count as a hit in the history table.
const HISTORY_HIT_CONFIDENCE: f64 = 0.7;

/// Confidence reported for the `general` fallback.
const GENERAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MomentType {
    Commute,
    QuickBreak,
    WindDown,
    Weekend,
    Focus,
    Triage,
    Explore,
    General,
}

impl MomentType {
    /// Detected moments, in tie-break order.
    pub const DETECTABLE: [MomentType; 7] = [
        MomentType::Commute,
        MomentType::QuickBreak,
        MomentType::WindDown,
        MomentType::Weekend,
        MomentType::Focus,
        MomentType::Triage,
        MomentType::Explore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MomentType::Commute => "commute",
            MomentType::QuickBreak => "quick-break",
            MomentType::WindDown => "wind-down",
            MomentType::Weekend => "weekend",
            MomentType::Focus => "focus",
            MomentType::Triage => "triage",
            MomentType::Explore => "explore",
            MomentType::General => "general",
        }
    }
}

impl fmt::Display for MomentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content rules a moment imposes on the candidate items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MomentRecommendations {
    /// Category, type or tag labels; empty means no preference
    pub preferred_types: Vec<String>,
    /// Longest item, in minutes, worth offering
    pub max_duration: Option<u32>,
    pub characteristics: Vec<String>,
    /// Category, type, tag, complexity or urgency labels to drop
    pub avoid: Vec<String>,
}

impl MomentRecommendations {
    fn new(preferred: &[&str], max_duration: Option<u32>, characteristics: &[&str], avoid: &[&str]) -> Self {
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            preferred_types: owned(preferred),
            max_duration,
            characteristics: owned(characteristics),
            avoid: owned(avoid),
        }
    }

    /// Content rules for a moment type at a given context.
    pub fn for_moment(moment: MomentType, ctx: &Context) -> Self {
        match moment {
            MomentType::Commute => Self::new(
                &["article", "inspiration"],
                Some(15),
                &["audio-friendly", "bite-sized"],
                &["complex", "event"],
            ),
            MomentType::QuickBreak => Self::new(
                &["inspiration", "life"],
                Some(5),
                &["light", "quick"],
                &["work", "complex"],
            ),
            MomentType::WindDown => Self::new(
                &["life", "inspiration"],
                Some(20),
                &["calming", "reflective"],
                &["work", "urgent"],
            ),
            MomentType::Weekend => {
                let flavour = if ctx.day_of_week == 0 { "reflection" } else { "exploration" };
                Self::new(&["life", "inspiration"], None, &["leisurely", flavour], &["work"])
            }
            MomentType::Focus => Self::new(&["work"], None, &["deep", "long-form"], &[]),
            MomentType::Triage => Self::new(&[], Some(5), &["quick-decision"], &["complex"]),
            MomentType::Explore => Self::new(&["inspiration"], None, &["novel", "serendipitous"], &[]),
            MomentType::General => Self::default(),
        }
    }
}

/// The detector's verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    #[serde(rename = "type")]
    pub moment_type: MomentType,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub recommendations: MomentRecommendations,
}

impl Moment {
    pub fn general() -> Self {
        Self {
            moment_type: MomentType::General,
            confidence: GENERAL_CONFIDENCE,
            indicators: vec!["no-strong-signal".to_string()],
            recommendations: MomentRecommendations::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
struct SlotCounts {
    count: u32,
    total: u32,
}

/// How often each moment won, per weekday and hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MomentHistory {
    slots: BTreeMap<String, SlotCounts>,
}

impl MomentHistory {
    fn key(moment: MomentType, weekday: &str, hour: u32) -> String {
        format!("{}_{}_{}", moment, weekday, hour)
    }

    /// Share of high-confidence hits at this slot; 0 when never observed.
    pub fn frequency(&self, moment: MomentType, weekday: &str, hour: u32) -> f64 {
        match self.slots.get(&Self::key(moment, weekday, hour)) {
            Some(slot) if slot.total > 0 => slot.count as f64 / slot.total as f64,
            _ => 0.0,
        }
    }

    pub fn record(&mut self, moment: MomentType, weekday: &str, hour: u32, confidence: f64) {
        let slot = self.slots.entry(Self::key(moment, weekday, hour)).or_default();
        slot.total += 1;
        if confidence > HISTORY_HIT_CONFIDENCE {
            slot.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Everything one detection pass looks at.
struct Signals<'a> {
    ctx: &'a Context,
    patterns: &'a UserPatterns,
    session: SessionCharacteristics,
    recent: &'a [BehaviorEvent],
    history: &'a MomentHistory,
}

impl Signals<'_> {
    fn history(&self, moment: MomentType) -> f64 {
        self.history
            .frequency(moment, self.ctx.weekday_name(), self.ctx.hour)
    }
}

/// Additive confidence accumulator for one detector.
#[derive(Default)]
struct Score {
    confidence: f64,
    indicators: Vec<String>,
}

impl Score {
    fn add(&mut self, fired: bool, weight: f64, indicator: &str) {
        if fired {
            self.confidence += weight;
            self.indicators.push(indicator.to_string());
        }
    }

    fn into_moment(self, moment: MomentType, ctx: &Context) -> Moment {
        Moment {
            moment_type: moment,
            confidence: self.confidence.clamp(0.0, 1.0),
            indicators: self.indicators,
            recommendations: MomentRecommendations::for_moment(moment, ctx),
        }
    }
}

fn commute(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(matches!(s.ctx.hour, 7..=9 | 17..=19), 0.3, "commute-hours");
    score.add(s.history(MomentType::Commute) > 0.6, 0.4, "commute-history");
    score.add(
        s.session.interaction_speed == InteractionSpeed::Fast && s.session.mode == SessionMode::Explore,
        0.2,
        "fast-browsing",
    );
    score.add(s.session.session_length < 5.0, 0.1, "short-session");
    score.add(!s.ctx.is_weekend(), 0.1, "weekday");
    score
}

fn quick_break(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(
        !s.ctx.is_weekend() && (10..=15).contains(&s.ctx.hour),
        0.4,
        "workday-break-hours",
    );
    score.add(
        s.session.session_length < 10.0 && s.session.focus_level == FocusLevel::Medium,
        0.3,
        "brief-session",
    );
    score.add(s.session.interaction_speed == InteractionSpeed::Fast, 0.2, "fast-interaction");
    score.add(
        s.recent
            .iter()
            .any(|e| e.action.is_rejection() && e.item.estimated_duration.is_some_and(|d| d > 10)),
        0.2,
        "rejected-long-items",
    );
    score.add(!s.ctx.is_first_visit, 0.1, "returning-visit");
    score
}

fn wind_down(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(
        s.ctx.hour >= 20 || s.ctx.time_of_day == TimeOfDay::Evening,
        0.4,
        "evening",
    );
    score.add(s.ctx.time_of_day == TimeOfDay::Night, 0.5, "night");
    score.add(s.history(MomentType::WindDown) > 0.5, 0.3, "wind-down-history");
    score.add(
        s.session.interaction_speed == InteractionSpeed::Slow && s.session.focus_level != FocusLevel::High,
        0.2,
        "slow-pace",
    );
    score.add(s.session.mode == SessionMode::Explore, 0.2, "browsing");
    score.add(s.patterns.energy(s.ctx.time_of_day) < 0.5, 0.2, "low-energy");
    score
}

fn weekend(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(s.ctx.is_weekend(), 0.6, "weekend");
    score.add(s.ctx.day_of_week == 0, 0.1, "sunday-reflection");
    score.add(s.ctx.day_of_week == 6, 0.1, "saturday-exploration");
    score.add(
        s.ctx.time_of_day == TimeOfDay::Morning && s.ctx.hour > 8,
        0.2,
        "late-morning",
    );
    score.add(s.patterns.weekend_engagement_rate() > 0.5, 0.2, "weekend-engagement");
    score
}

fn focus(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(
        s.session.focus_level == FocusLevel::High && s.session.session_length > 10.0,
        0.4,
        "sustained-focus",
    );
    score.add(s.session.mode == SessionMode::DeepWork, 0.3, "deep-work");
    score.add(s.session.interaction_speed == InteractionSpeed::Slow, 0.2, "slow-pace");
    score.add(
        !s.ctx.is_weekend() && (9..=17).contains(&s.ctx.hour),
        0.2,
        "work-hours",
    );
    score.add(
        s.recent
            .iter()
            .any(|e| e.action.is_engagement() && e.item.category == Category::Work),
        0.3,
        "engaged-with-work",
    );
    score
}

fn triage(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(s.session.mode == SessionMode::Triage, 0.5, "triage-mode");
    score.add(
        s.session.interaction_speed == InteractionSpeed::Fast && s.session.focus_level == FocusLevel::Medium,
        0.3,
        "rapid-sorting",
    );
    score.add(
        s.ctx.time_of_day == TimeOfDay::Morning && s.ctx.is_first_visit,
        0.3,
        "first-morning-visit",
    );
    score.add(
        s.recent.iter().filter(|e| e.action.is_sorting()).count() < 3,
        0.2,
        "inbox-backlog",
    );
    score
}

fn explore(s: &Signals) -> Score {
    let mut score = Score::default();
    score.add(s.session.mode == SessionMode::Explore, 0.4, "explore-mode");
    score.add(
        s.session.interaction_speed == InteractionSpeed::Medium && s.session.focus_level != FocusLevel::Low,
        0.2,
        "steady-pace",
    );
    score.add(s.ctx.time_of_day == TimeOfDay::Afternoon, 0.2, "afternoon");
    score.add(s.ctx.is_weekend(), 0.3, "weekend");
    score
}

/// One scorer per detectable moment, in tie-break order.
const DETECTORS: [(MomentType, fn(&Signals<'_>) -> Score); 7] = [
    (MomentType::Commute, commute),
    (MomentType::QuickBreak, quick_break),
    (MomentType::WindDown, wind_down),
    (MomentType::Weekend, weekend),
    (MomentType::Focus, focus),
    (MomentType::Triage, triage),
    (MomentType::Explore, explore),
];

/// Picks the moment for a context and learns from its own verdicts.
pub struct MomentDetector {
    store: Arc<dyn LearningStore>,
    threshold: f64,
}

impl MomentDetector {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self::with_threshold(store, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn with_threshold(store: Arc<dyn LearningStore>, threshold: f64) -> Self {
        Self { store, threshold }
    }

    pub fn history(&self) -> MomentHistory {
        load_json(self.store.as_ref(), HISTORY_KEY)
    }

    /// Score every detectable moment without recording anything. Results
    /// keep tie-break order.
    pub fn candidates(
        &self,
        ctx: &Context,
        patterns: &UserPatterns,
        session: &SessionWindow,
        recent: &[BehaviorEvent],
    ) -> Vec<Moment> {
        let history = self.history();
        let signals = Signals {
            ctx,
            patterns,
            session: session.characteristics(ctx.now),
            recent,
            history: &history,
        };

        DETECTORS
            .iter()
            .map(|(moment, detect)| detect(&signals).into_moment(*moment, ctx))
            .collect()
    }

    /// Choose the single best moment. A winner at or below the threshold
    /// yields `general` at 0.5; any other winner is recorded in the history.
    pub fn detect_moment(
        &mut self,
        ctx: &Context,
        patterns: &UserPatterns,
        session: &SessionWindow,
        recent: &[BehaviorEvent],
    ) -> Moment {
        let best = self
            .candidates(ctx, patterns, session, recent)
            .into_iter()
            .reduce(|best, next| if next.confidence > best.confidence { next } else { best });

        let Some(best) = best.filter(|m| m.confidence > self.threshold) else {
            tracing::debug!("no moment above threshold, using general");
            return Moment::general();
        };

        tracing::debug!(
            moment = %best.moment_type,
            confidence = best.confidence,
            indicators = ?best.indicators,
            "moment detected"
        );
        self.record(&best, ctx);
        best
    }

    fn record(&self, moment: &Moment, ctx: &Context) {
        let mut history = self.history();
        history.record(moment.moment_type, ctx.weekday_name(), ctx.hour, moment.confidence);
        if let Err(e) = save_json(self.store.as_ref(), HISTORY_KEY, &history) {
            tracing::warn!(error = %e, "could not persist moment history");
        }
    }
}
