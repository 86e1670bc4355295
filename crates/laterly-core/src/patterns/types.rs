//! Aggregate user pattern types.
//!
//! Every lookup on [`UserPatterns`] tolerates missing keys and answers with a
//! neutral default, since sparse data is the normal case for a new user.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::context::TimeOfDay;
use crate::item::Category;

/// Neutral answer for rate-like lookups with no data behind them.
pub const NEUTRAL: f64 = 0.5;

/// Engagement counters for one time slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementRate {
    /// Weighted engagement points (+2 deep, +1 light)
    pub engagement: u32,
    /// Actions observed
    pub total: u32,
}

impl EngagementRate {
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.engagement as f64 / self.total as f64
        }
    }
}

/// Signed preference for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentAffinity {
    pub positive: u32,
    pub negative: u32,
    pub total: u32,
}

impl ContentAffinity {
    /// `(positive - negative) / total`, roughly in [-1, 1].
    pub fn score(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.positive as f64 - self.negative as f64) / self.total as f64
        }
    }
}

/// Session length bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionLength {
    /// Under 5 minutes
    #[default]
    Short,
    /// Under 20 minutes
    Medium,
    /// 20 minutes or more
    Long,
}

impl SessionLength {
    pub fn from_minutes(minutes: f64) -> Self {
        if minutes < 5.0 {
            SessionLength::Short
        } else if minutes < 20.0 {
            SessionLength::Medium
        } else {
            SessionLength::Long
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub count: usize,
    pub average_minutes: f64,
    pub median_minutes: f64,
    pub preferred_length: SessionLength,
}

/// Item duration bucket used by completion tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationBucket {
    /// ≤ 2 minutes
    Quick,
    /// ≤ 5 minutes
    Short,
    /// ≤ 15 minutes
    Medium,
    /// ≤ 30 minutes
    Long,
    /// > 30 minutes
    Extended,
}

impl DurationBucket {
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0..=2 => DurationBucket::Quick,
            3..=5 => DurationBucket::Short,
            6..=15 => DurationBucket::Medium,
            16..=30 => DurationBucket::Long,
            _ => DurationBucket::Extended,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationBucket::Quick => "quick",
            DurationBucket::Short => "short",
            DurationBucket::Medium => "medium",
            DurationBucket::Long => "long",
            DurationBucket::Extended => "extended",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRate {
    pub started: u32,
    pub completed: u32,
}

impl CompletionRate {
    pub fn rate(&self) -> f64 {
        if self.started == 0 {
            0.0
        } else {
            self.completed as f64 / self.started as f64
        }
    }
}

/// Item age bucket at the time it was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StalenessBucket {
    /// Under a day
    Fresh,
    /// Under 3 days
    Recent,
    /// Under a week
    WeekOld,
    /// Under 30 days
    MonthOld,
    /// 30 days or more
    Stale,
}

impl StalenessBucket {
    pub fn from_days(days: f64) -> Self {
        if days < 1.0 {
            StalenessBucket::Fresh
        } else if days < 3.0 {
            StalenessBucket::Recent
        } else if days < 7.0 {
            StalenessBucket::WeekOld
        } else if days < 30.0 {
            StalenessBucket::MonthOld
        } else {
            StalenessBucket::Stale
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RejectionPatterns {
    pub by_time_of_day: BTreeMap<TimeOfDay, u32>,
    pub by_category: BTreeMap<Category, u32>,
    pub by_staleness: BTreeMap<StalenessBucket, u32>,
    /// Longest run of rejections not broken by an engagement
    pub longest_streak: u32,
    pub total: u32,
}

/// Inferred energy for one time of day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyLevel {
    pub deep_ratio: f64,
    pub quick_ratio: f64,
    /// `max(0, deep_ratio - 0.5 * quick_ratio)`
    pub score: f64,
    pub samples: u32,
}

/// Everything the analyzer learned from the behavior log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatterns {
    pub time_preferences: BTreeMap<TimeOfDay, EngagementRate>,
    /// Keyed by `{weekday}_{time_of_day}`
    pub slot_preferences: BTreeMap<String, EngagementRate>,
    pub content_affinity: BTreeMap<Category, ContentAffinity>,
    pub sessions: SessionStats,
    /// Keyed by `{category}_{bucket}`
    pub completion_rates: BTreeMap<String, CompletionRate>,
    pub rejections: RejectionPatterns,
    pub energy_levels: BTreeMap<TimeOfDay, EnergyLevel>,
    pub events_analyzed: usize,
}

impl UserPatterns {
    pub fn completion_key(category: Category, bucket: DurationBucket) -> String {
        format!("{}_{}", category, bucket.as_str())
    }

    /// Engagement rate for a time of day, neutral when unseen.
    pub fn time_rate(&self, time_of_day: TimeOfDay) -> f64 {
        self.time_preferences
            .get(&time_of_day)
            .map(EngagementRate::rate)
            .unwrap_or(NEUTRAL)
    }

    /// Engagement rate for a weekday/time-of-day slot, neutral when unseen.
    pub fn slot_rate(&self, slot_key: &str) -> f64 {
        self.slot_preferences
            .get(slot_key)
            .map(EngagementRate::rate)
            .unwrap_or(NEUTRAL)
    }

    /// Average engagement across observed Saturday/Sunday slots, 0 if none.
    pub fn weekend_engagement_rate(&self) -> f64 {
        let rates: Vec<f64> = self
            .slot_preferences
            .iter()
            .filter(|(k, _)| k.starts_with("saturday_") || k.starts_with("sunday_"))
            .map(|(_, r)| r.rate())
            .collect();
        if rates.is_empty() {
            0.0
        } else {
            rates.iter().sum::<f64>() / rates.len() as f64
        }
    }

    pub fn affinity(&self, category: Category) -> f64 {
        self.content_affinity
            .get(&category)
            .map(ContentAffinity::score)
            .unwrap_or(0.0)
    }

    /// Energy score for a time of day, neutral when unseen.
    pub fn energy(&self, time_of_day: TimeOfDay) -> f64 {
        self.energy_levels
            .get(&time_of_day)
            .map(|e| e.score)
            .unwrap_or(NEUTRAL)
    }

    pub fn completion_rate(&self, category: Category, bucket: DurationBucket) -> f64 {
        self.completion_rates
            .get(&Self::completion_key(category, bucket))
            .map(CompletionRate::rate)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets() {
        assert_eq!(DurationBucket::from_minutes(2), DurationBucket::Quick);
        assert_eq!(DurationBucket::from_minutes(5), DurationBucket::Short);
        assert_eq!(DurationBucket::from_minutes(15), DurationBucket::Medium);
        assert_eq!(DurationBucket::from_minutes(30), DurationBucket::Long);
        assert_eq!(DurationBucket::from_minutes(31), DurationBucket::Extended);

        assert_eq!(StalenessBucket::from_days(0.5), StalenessBucket::Fresh);
        assert_eq!(StalenessBucket::from_days(2.0), StalenessBucket::Recent);
        assert_eq!(StalenessBucket::from_days(6.9), StalenessBucket::WeekOld);
        assert_eq!(StalenessBucket::from_days(29.0), StalenessBucket::MonthOld);
        assert_eq!(StalenessBucket::from_days(30.0), StalenessBucket::Stale);

        assert_eq!(SessionLength::from_minutes(4.9), SessionLength::Short);
        assert_eq!(SessionLength::from_minutes(19.0), SessionLength::Medium);
        assert_eq!(SessionLength::from_minutes(20.0), SessionLength::Long);
    }

    #[test]
    fn empty_patterns_answer_neutral() {
        let p = UserPatterns::default();
        assert_eq!(p.time_rate(TimeOfDay::Morning), NEUTRAL);
        assert_eq!(p.slot_rate("monday_morning"), NEUTRAL);
        assert_eq!(p.energy(TimeOfDay::Night), NEUTRAL);
        assert_eq!(p.affinity(Category::Work), 0.0);
        assert_eq!(p.completion_rate(Category::Life, DurationBucket::Short), 0.0);
        assert_eq!(p.weekend_engagement_rate(), 0.0);
    }

    #[test]
    fn serializes_enum_map_keys_as_strings() {
        let mut p = UserPatterns::default();
        p.time_preferences.insert(
            TimeOfDay::Evening,
            EngagementRate { engagement: 3, total: 2 },
        );
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["time_preferences"]["evening"]["total"], 2);
    }
}
