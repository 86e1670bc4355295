//! Weighted item scoring with explainable breakdowns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::Context;
use crate::item::{Category, Item};
use crate::patterns::UserPatterns;
use crate::session::SessionCharacteristics;
use crate::store::{load_json, save_json, LearningStore};

use super::factors;
use super::weights::{Factor, FactorWeights};

const SUGGESTIONS_KEY: &str = "scoring.recent_suggestions";
const REJECTIONS_KEY: &str = "scoring.rejections";

/// Suggestions remembered for the variety factor.
pub const SUGGESTION_HISTORY: usize = 5;
/// Suggestions the variety factor actually looks at.
pub const VARIETY_WINDOW: usize = 3;

/// A rejection stops counting once it is this old.
pub fn rejection_decay() -> Duration {
    Duration::hours(24)
}

/// One factor's share of an item's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorTerm {
    pub factor: Factor,
    /// Weight after context adaptation
    pub weight: f64,
    /// Raw sub-score (0.0 to 1.0)
    pub score: f64,
    /// `weight * score`
    pub contribution: f64,
}

impl FactorTerm {
    pub fn new(factor: Factor, weight: f64, score: f64) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            factor,
            weight,
            score,
            contribution: weight * score,
        }
    }
}

/// Complete scoring breakdown for explainability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub terms: Vec<FactorTerm>,
    /// Weighted sum clamped to [0, 1]
    pub total_score: f64,
    pub scored_at: DateTime<Utc>,
}

impl ScoreBreakdown {
    pub fn new(scored_at: DateTime<Utc>) -> Self {
        Self {
            terms: Vec::with_capacity(Factor::ALL.len()),
            total_score: 0.0,
            scored_at,
        }
    }

    pub fn add_term(&mut self, term: FactorTerm) {
        self.total_score = (self.total_score + term.contribution).clamp(0.0, 1.0);
        self.terms.push(term);
    }

    /// Largest contributor; the earliest factor wins a tie.
    pub fn top_term(&self) -> Option<&FactorTerm> {
        self.terms
            .iter()
            .reduce(|best, t| if t.contribution > best.contribution { t } else { best })
    }

    pub fn score_of(&self, factor: Factor) -> Option<f64> {
        self.terms.iter().find(|t| t.factor == factor).map(|t| t.score)
    }

    pub fn terms_by_contribution(&self) -> Vec<&FactorTerm> {
        let mut sorted: Vec<_> = self.terms.iter().collect();
        sorted.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));
        sorted
    }
}

/// An item with its score and the story behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: Item,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SuggestionRecord {
    item_id: String,
    category: Category,
    at: DateTime<Utc>,
}

type RejectionTable = BTreeMap<String, Vec<DateTime<Utc>>>;

fn rejection_key(category: Category, ctx: &Context) -> String {
    format!("{}_{}", category, ctx.time_of_day)
}

/// Scores candidate items and keeps the suggestion/rejection memory the
/// variety and rejection factors read.
pub struct ScoringEngine {
    store: Arc<dyn LearningStore>,
}

impl ScoringEngine {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self { store }
    }

    /// Score every item, highest first. Ties keep input order.
    pub fn score_items(
        &self,
        items: &[Item],
        ctx: &Context,
        patterns: &UserPatterns,
        session: &SessionCharacteristics,
    ) -> Vec<ScoredItem> {
        let weights = FactorWeights::adapted(ctx, session);
        let recent = self.recent_categories();
        let rejections: RejectionTable = load_json(self.store.as_ref(), REJECTIONS_KEY);

        let mut scored: Vec<ScoredItem> = items
            .iter()
            .map(|item| {
                let rejected = count_recent(&rejections, &rejection_key(item.category, ctx), ctx.now);
                self.score_one(item, ctx, patterns, session, &weights, &recent, rejected)
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        tracing::debug!(
            items = scored.len(),
            top = scored.first().map(|s| s.item.id.as_str()),
            "items scored"
        );
        scored
    }

    #[allow(clippy::too_many_arguments)]
    fn score_one(
        &self,
        item: &Item,
        ctx: &Context,
        patterns: &UserPatterns,
        session: &SessionCharacteristics,
        weights: &FactorWeights,
        recent: &[Category],
        rejected: usize,
    ) -> ScoredItem {
        let available = factors::available_minutes(ctx, session);
        let mut breakdown = ScoreBreakdown::new(ctx.now);

        for factor in Factor::ALL {
            let score = match factor {
                Factor::Base => factors::base_score(item.category, ctx),
                Factor::Staleness => factors::staleness_score(item.staleness_days(ctx.now)),
                Factor::Progress => factors::progress_score(item.progress()),
                Factor::Variety => factors::variety_score(item.category, recent),
                Factor::DurationFit => factors::duration_fit_score(item.duration_minutes(), available),
                Factor::Pattern => factors::pattern_score(item, ctx, patterns),
                Factor::Rejection => factors::rejection_penalty(rejected),
                Factor::EnergyMatch => factors::energy_match_score(session.focus_level, item.complexity()),
            };
            breakdown.add_term(FactorTerm::new(factor, weights.get(factor), score));
        }

        let reason = breakdown
            .top_term()
            .map(|t| t.factor.reason())
            .unwrap_or(Factor::Base.reason())
            .to_string();

        ScoredItem {
            item: item.clone(),
            score: breakdown.total_score,
            breakdown,
            reason,
        }
    }

    /// Categories of the last [`VARIETY_WINDOW`] suggestions, oldest first.
    pub fn recent_categories(&self) -> Vec<Category> {
        let history: Vec<SuggestionRecord> = load_json(self.store.as_ref(), SUGGESTIONS_KEY);
        let skip = history.len().saturating_sub(VARIETY_WINDOW);
        history.into_iter().skip(skip).map(|r| r.category).collect()
    }

    /// Rejections for the item's category in this context's time of day
    /// that are still inside the decay window.
    pub fn recent_rejections(&self, category: Category, ctx: &Context) -> usize {
        let rejections: RejectionTable = load_json(self.store.as_ref(), REJECTIONS_KEY);
        count_recent(&rejections, &rejection_key(category, ctx), ctx.now)
    }

    /// Remember that `item` was surfaced to the user.
    pub fn record_suggestion(&mut self, item: &Item, now: DateTime<Utc>) {
        let mut history: Vec<SuggestionRecord> = load_json(self.store.as_ref(), SUGGESTIONS_KEY);
        history.push(SuggestionRecord {
            item_id: item.id.clone(),
            category: item.category,
            at: now,
        });
        let excess = history.len().saturating_sub(SUGGESTION_HISTORY);
        let history = history.split_off(excess);

        if let Err(e) = save_json(self.store.as_ref(), SUGGESTIONS_KEY, &history) {
            tracing::warn!(error = %e, "could not persist suggestion history");
        }
    }

    /// Count a rejection against the item's category at this time of day.
    /// Expired entries under the same key are pruned here.
    pub fn record_rejection(&mut self, item: &Item, ctx: &Context) {
        let mut rejections: RejectionTable = load_json(self.store.as_ref(), REJECTIONS_KEY);
        let entries = rejections.entry(rejection_key(item.category, ctx)).or_default();
        entries.retain(|at| is_live(*at, ctx.now));
        entries.push(ctx.now);
        tracing::debug!(item = %item.id, count = entries.len(), "rejection recorded");

        if let Err(e) = save_json(self.store.as_ref(), REJECTIONS_KEY, &rejections) {
            tracing::warn!(error = %e, "could not persist rejections");
        }
    }
}

fn is_live(at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - at < rejection_decay()
}

fn count_recent(table: &RejectionTable, key: &str, now: DateTime<Utc>) -> usize {
    table
        .get(key)
        .map(|entries| entries.iter().filter(|at| is_live(**at, now)).count())
        .unwrap_or(0)
}
