//! Pattern analyzer: folds the behavior log into [`UserPatterns`].

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use super::types::{
    CompletionRate, DurationBucket, EnergyLevel, SessionLength, SessionStats, StalenessBucket,
    UserPatterns,
};
use crate::behavior::BehaviorEvent;
use crate::context::TimeOfDay;

/// Default gap that ends a session.
pub const DEFAULT_SESSION_GAP_MINUTES: i64 = 30;

/// Analyzer for computing user patterns from the behavior log.
///
/// Analysis is a pure function of its input: running it twice over the same
/// events yields identical patterns.
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    /// Gap between consecutive events that starts a new session
    pub session_gap: Duration,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternAnalyzer {
    pub fn new() -> Self {
        Self {
            session_gap: Duration::minutes(DEFAULT_SESSION_GAP_MINUTES),
        }
    }

    pub fn with_session_gap(minutes: i64) -> Self {
        Self {
            session_gap: Duration::try_minutes(minutes.max(1))
                .unwrap_or_else(|| Duration::minutes(DEFAULT_SESSION_GAP_MINUTES)),
        }
    }

    pub fn analyze<'a, I>(&self, events: I) -> UserPatterns
    where
        I: IntoIterator<Item = &'a BehaviorEvent>,
    {
        let mut ordered: Vec<&BehaviorEvent> = events.into_iter().collect();
        ordered.sort_by_key(|e| e.timestamp);

        let mut patterns = UserPatterns {
            events_analyzed: ordered.len(),
            ..UserPatterns::default()
        };

        self.aggregate_time_preferences(&ordered, &mut patterns);
        self.aggregate_affinity(&ordered, &mut patterns);
        patterns.sessions = self.session_stats(&ordered);
        self.aggregate_completions(&ordered, &mut patterns);
        self.aggregate_rejections(&ordered, &mut patterns);
        patterns.energy_levels = self.energy_levels(&ordered);

        patterns
    }

    fn aggregate_time_preferences(&self, events: &[&BehaviorEvent], patterns: &mut UserPatterns) {
        for event in events {
            let Some(ctx) = &event.context else { continue };

            let points = if event.action.is_engagement() {
                2
            } else if event.action.is_light_engagement() {
                1
            } else {
                0
            };

            let by_time = patterns.time_preferences.entry(ctx.time_of_day).or_default();
            by_time.total += 1;
            by_time.engagement += points;

            let by_slot = patterns.slot_preferences.entry(ctx.slot_key()).or_default();
            by_slot.total += 1;
            by_slot.engagement += points;
        }
    }

    fn aggregate_affinity(&self, events: &[&BehaviorEvent], patterns: &mut UserPatterns) {
        for event in events {
            let affinity = patterns.content_affinity.entry(event.item.category).or_default();
            affinity.total += 1;
            if event.action.is_positive() {
                affinity.positive += 1;
            } else if event.action.is_rejection() {
                affinity.negative += 1;
            }
        }
    }

    /// Split chronologically ordered events on gaps larger than the session
    /// gap and summarise per-session durations.
    fn session_stats(&self, events: &[&BehaviorEvent]) -> SessionStats {
        let Some(first) = events.first() else {
            return SessionStats::default();
        };

        let mut durations: Vec<f64> = Vec::new();
        let mut start = first.timestamp;
        let mut last = first.timestamp;

        for event in &events[1..] {
            if event.timestamp - last > self.session_gap {
                durations.push(minutes_between(start, last));
                start = event.timestamp;
            }
            last = event.timestamp;
        }
        durations.push(minutes_between(start, last));

        let count = durations.len();
        let average_minutes = durations.iter().sum::<f64>() / count as f64;

        let mut sorted = durations.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median_minutes = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };

        let mut bucket_counts = [0usize; 3];
        for d in &durations {
            bucket_counts[SessionLength::from_minutes(*d) as usize] += 1;
        }
        let preferred_length = [SessionLength::Short, SessionLength::Medium, SessionLength::Long]
            .into_iter()
            .fold(SessionLength::Short, |best, candidate| {
                if bucket_counts[candidate as usize] > bucket_counts[best as usize] {
                    candidate
                } else {
                    best
                }
            });

        SessionStats {
            count,
            average_minutes,
            median_minutes,
            preferred_length,
        }
    }

    fn aggregate_completions(&self, events: &[&BehaviorEvent], patterns: &mut UserPatterns) {
        for event in events {
            let Some(minutes) = event.item.estimated_duration else { continue };
            let is_start = event.action.is_start();
            let is_completion = event.action.is_completion();
            if !is_start && !is_completion {
                continue;
            }

            let key = UserPatterns::completion_key(
                event.item.category,
                DurationBucket::from_minutes(minutes),
            );
            let rate: &mut CompletionRate = patterns.completion_rates.entry(key).or_default();
            if is_start {
                rate.started += 1;
            }
            if is_completion {
                rate.completed += 1;
            }
        }
    }

    fn aggregate_rejections(&self, events: &[&BehaviorEvent], patterns: &mut UserPatterns) {
        let rejections = &mut patterns.rejections;
        let mut streak = 0u32;

        for event in events {
            if event.action.is_rejection() {
                rejections.total += 1;
                if let Some(ctx) = &event.context {
                    *rejections.by_time_of_day.entry(ctx.time_of_day).or_default() += 1;
                }
                *rejections.by_category.entry(event.item.category).or_default() += 1;

                let age_days = (event.timestamp - event.item.created_at).num_seconds().max(0) as f64
                    / 86_400.0;
                *rejections
                    .by_staleness
                    .entry(StalenessBucket::from_days(age_days))
                    .or_default() += 1;

                streak += 1;
                rejections.longest_streak = rejections.longest_streak.max(streak);
            } else if event.action.is_engagement() {
                streak = 0;
            }
        }
    }

    fn energy_levels(&self, events: &[&BehaviorEvent]) -> BTreeMap<TimeOfDay, EnergyLevel> {
        // (total, deep, quick) per time of day
        let mut counts: BTreeMap<TimeOfDay, (u32, u32, u32)> = BTreeMap::new();

        for event in events {
            let Some(ctx) = &event.context else { continue };
            let entry = counts.entry(ctx.time_of_day).or_default();
            entry.0 += 1;
            if event.action.is_engagement() {
                entry.1 += 1;
            } else if event.action.is_quick() {
                entry.2 += 1;
            }
        }

        counts
            .into_iter()
            .map(|(tod, (total, deep, quick))| {
                let deep_ratio = deep as f64 / total as f64;
                let quick_ratio = quick as f64 / total as f64;
                let level = EnergyLevel {
                    deep_ratio,
                    quick_ratio,
                    score: (deep_ratio - 0.5 * quick_ratio).max(0.0),
                    samples: total,
                };
                (tod, level)
            })
            .collect()
    }
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Action, BehaviorEvent};
    use crate::context::Context;
    use crate::item::{Category, Item};
    use crate::patterns::types::SessionLength;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        // Monday morning
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    fn ev(action: Action, category: Category, at: DateTime<Utc>) -> BehaviorEvent {
        let item = Item::new("x", category, at - Duration::days(2)).with_duration(10);
        BehaviorEvent::new(action, &item, &Context::at(at, false))
    }

    #[test]
    fn empty_log_yields_default_patterns() {
        let patterns = PatternAnalyzer::new().analyze(&Vec::<BehaviorEvent>::new());
        assert_eq!(patterns, UserPatterns::default());
    }

    #[test]
    fn time_preference_weights_deep_and_light_engagement() {
        let t = base();
        let events = vec![
            ev(Action::Read, Category::Work, t),
            ev(Action::Open, Category::Work, t + Duration::minutes(1)),
            ev(Action::Dismiss, Category::Work, t + Duration::minutes(2)),
        ];
        let p = PatternAnalyzer::new().analyze(&events);

        let morning = p.time_preferences[&TimeOfDay::Morning];
        assert_eq!(morning.total, 3);
        assert_eq!(morning.engagement, 3);
        assert!((p.time_rate(TimeOfDay::Morning) - 1.0).abs() < 1e-9);
        assert!((p.slot_rate("monday_morning") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn content_affinity_is_signed() {
        let t = base();
        let events = vec![
            ev(Action::Read, Category::Life, t),
            ev(Action::Save, Category::Life, t),
            ev(Action::Skip, Category::Life, t),
            ev(Action::Open, Category::Life, t),
            ev(Action::Dismiss, Category::Work, t),
        ];
        let p = PatternAnalyzer::new().analyze(&events);
        assert!((p.affinity(Category::Life) - 0.25).abs() < 1e-9);
        assert!((p.affinity(Category::Work) + 1.0).abs() < 1e-9);
        assert_eq!(p.affinity(Category::Inspiration), 0.0);
    }

    #[test]
    fn sessions_split_on_thirty_minute_gap() {
        let t = base();
        let events = vec![
            ev(Action::Open, Category::Work, t),
            ev(Action::Read, Category::Work, t + Duration::minutes(10)),
            // 45 minute gap
            ev(Action::Open, Category::Work, t + Duration::minutes(55)),
            ev(Action::Read, Category::Work, t + Duration::minutes(57)),
            // 31 minute gap
            ev(Action::Open, Category::Work, t + Duration::minutes(88)),
            ev(Action::Read, Category::Work, t + Duration::minutes(91)),
        ];
        let p = PatternAnalyzer::new().analyze(&events);
        assert_eq!(p.sessions.count, 3);
        // 10, 2, 3 minutes
        assert!((p.sessions.average_minutes - 5.0).abs() < 1e-9);
        assert!((p.sessions.median_minutes - 3.0).abs() < 1e-9);
        assert_eq!(p.sessions.preferred_length, SessionLength::Short);
    }

    #[test]
    fn sessions_are_ordered_before_splitting() {
        let t = base();
        let events = vec![
            ev(Action::Read, Category::Work, t + Duration::minutes(20)),
            ev(Action::Open, Category::Work, t),
        ];
        let p = PatternAnalyzer::new().analyze(&events);
        assert_eq!(p.sessions.count, 1);
        assert!((p.sessions.median_minutes - 20.0).abs() < 1e-9);
        assert_eq!(p.sessions.preferred_length, SessionLength::Long);
    }

    #[test]
    fn completion_rates_by_category_and_bucket() {
        let t = base();
        let events = vec![
            ev(Action::Start, Category::Work, t),
            ev(Action::Read, Category::Work, t),
            ev(Action::Complete, Category::Work, t),
            ev(Action::Archive, Category::Work, t),
        ];
        let p = PatternAnalyzer::new().analyze(&events);
        assert!((p.completion_rate(Category::Work, DurationBucket::Medium) - 0.5).abs() < 1e-9);
        assert_eq!(p.completion_rate(Category::Work, DurationBucket::Quick), 0.0);
    }

    #[test]
    fn rejection_streak_resets_on_engagement_only() {
        let t = base();
        let events = vec![
            ev(Action::Dismiss, Category::Work, t),
            ev(Action::Skip, Category::Work, t + Duration::minutes(1)),
            ev(Action::Open, Category::Work, t + Duration::minutes(2)),
            ev(Action::Archive, Category::Life, t + Duration::minutes(3)),
            ev(Action::Read, Category::Life, t + Duration::minutes(4)),
            ev(Action::Skip, Category::Life, t + Duration::minutes(5)),
        ];
        let p = PatternAnalyzer::new().analyze(&events);
        assert_eq!(p.rejections.total, 4);
        assert_eq!(p.rejections.longest_streak, 3);
        assert_eq!(p.rejections.by_category[&Category::Work], 2);
        assert_eq!(p.rejections.by_time_of_day[&TimeOfDay::Morning], 4);
        assert_eq!(p.rejections.by_staleness[&StalenessBucket::Recent], 4);
    }

    #[test]
    fn energy_score_floors_at_zero() {
        let t = base();
        let evening = Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0).unwrap();
        let events = vec![
            ev(Action::Read, Category::Work, t),
            ev(Action::Complete, Category::Work, t),
            ev(Action::Skip, Category::Work, t),
            ev(Action::Open, Category::Work, t),
            ev(Action::Dismiss, Category::Life, evening),
            ev(Action::Skip, Category::Life, evening),
        ];
        let p = PatternAnalyzer::new().analyze(&events);

        let morning = p.energy_levels[&TimeOfDay::Morning];
        assert!((morning.deep_ratio - 0.5).abs() < 1e-9);
        assert!((morning.quick_ratio - 0.25).abs() < 1e-9);
        assert!((p.energy(TimeOfDay::Morning) - 0.375).abs() < 1e-9);
        assert_eq!(p.energy(TimeOfDay::Evening), 0.0);
        assert_eq!(p.energy(TimeOfDay::Night), 0.5);
    }

    #[test]
    fn analyze_is_idempotent() {
        let t = base();
        let events: Vec<_> = (0..20)
            .map(|i| {
                let action = match i % 4 {
                    0 => Action::Read,
                    1 => Action::Dismiss,
                    2 => Action::Open,
                    _ => Action::Complete,
                };
                ev(action, Category::ALL[i % 3], t + Duration::minutes(i as i64 * 7))
            })
            .collect();
        let analyzer = PatternAnalyzer::new();
        assert_eq!(analyzer.analyze(&events), analyzer.analyze(&events));
    }

    #[test]
    fn events_without_context_skip_time_aggregates() {
        let mut event = ev(Action::Read, Category::Work, base());
        event.context = None;
        let p = PatternAnalyzer::new().analyze(std::iter::once(&event));
        assert!(p.time_preferences.is_empty());
        assert!(p.energy_levels.is_empty());
        assert_eq!(p.content_affinity[&Category::Work].positive, 1);
    }
}
