//! Point-in-time usage context derived from the wall clock.
//!
//! The only state this module touches is a one-string marker holding the
//! last calendar date a context was computed, which drives `is_first_visit`.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::store::LearningStore;

const LAST_VISIT_KEY: &str = "context.last_visit_date";

/// Coarse time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// 05:00-11:59
    Morning,
    /// 12:00-16:59
    Afternoon,
    /// 17:00-20:59
    Evening,
    /// 21:00-04:59
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

/// Lower-case English weekday name, Sunday = 0.
pub fn weekday_name(day_of_week: u32) -> &'static str {
    match day_of_week % 7 {
        0 => "sunday",
        1 => "monday",
        2 => "tuesday",
        3 => "wednesday",
        4 => "thursday",
        5 => "friday",
        _ => "saturday",
    }
}

/// Usage context at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub time_of_day: TimeOfDay,
    pub day_type: DayType,
    /// Local hour (0-23)
    pub hour: u32,
    /// Day of week (0-6, Sunday=0)
    pub day_of_week: u32,
    pub is_first_visit: bool,
    /// Instant the context describes
    pub now: DateTime<Utc>,
}

impl Context {
    /// Derive a context from a clock reading in any time zone. Hour and
    /// weekday are taken in that zone.
    pub fn at<Tz: TimeZone>(now: DateTime<Tz>, is_first_visit: bool) -> Self {
        let hour = now.hour();
        let weekday = now.weekday();
        let day_type = match weekday {
            Weekday::Sat | Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        };

        Self {
            time_of_day: TimeOfDay::from_hour(hour),
            day_type,
            hour,
            day_of_week: weekday.num_days_from_sunday(),
            is_first_visit,
            now: now.with_timezone(&Utc),
        }
    }

    pub fn weekday_name(&self) -> &'static str {
        weekday_name(self.day_of_week)
    }

    /// Composite key used by slot-level pattern tables, e.g. `monday_morning`.
    pub fn slot_key(&self) -> String {
        format!("{}_{}", self.weekday_name(), self.time_of_day)
    }

    pub fn is_weekend(&self) -> bool {
        self.day_type == DayType::Weekend
    }
}

/// Computes contexts and owns the last-visit marker.
pub struct ContextProvider {
    store: Arc<dyn LearningStore>,
    cache: Option<(Context, String)>,
    max_age: Duration,
}

impl ContextProvider {
    pub fn new(store: Arc<dyn LearningStore>) -> Self {
        Self::with_max_age(store, Duration::hours(1))
    }

    pub fn with_max_age(store: Arc<dyn LearningStore>, max_age: Duration) -> Self {
        Self {
            store,
            cache: None,
            max_age,
        }
    }

    /// Compute a fresh context, updating the last-visit marker.
    pub fn compute_context<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> Context {
        let today = now.date_naive().format("%Y-%m-%d").to_string();

        let last_visit = match self.store.get(LAST_VISIT_KEY) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "could not read last visit marker");
                Some(today.clone())
            }
        };
        let is_first_visit = last_visit.as_deref() != Some(today.as_str());

        if is_first_visit {
            if let Err(e) = self.store.set(LAST_VISIT_KEY, &today) {
                tracing::warn!(error = %e, "could not persist last visit marker");
            }
        }

        let ctx = Context::at(now, is_first_visit);
        tracing::debug!(
            time_of_day = %ctx.time_of_day,
            hour = ctx.hour,
            first_visit = ctx.is_first_visit,
            "context computed"
        );
        self.cache = Some((ctx.clone(), today));
        ctx
    }

    /// Cached context, re-derived once it is older than the configured
    /// maximum age or the calendar day has changed.
    pub fn current<Tz: TimeZone>(&mut self, now: DateTime<Tz>) -> Context {
        let today = now.date_naive().format("%Y-%m-%d").to_string();
        let now_utc = now.with_timezone(&Utc);

        if let Some((cached, day)) = &self.cache {
            let age = now_utc - cached.now;
            if *day == today && age >= Duration::zero() && age < self.max_age {
                return cached.clone();
            }
        }
        self.compute_context(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(TimeOfDay::from_hour(4), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(16), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(20), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(21), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Night);
    }

    #[test]
    fn weekday_and_weekend() {
        // 2026-10-19 is a Monday
        let monday = Context::at(at(2026, 10, 19, 9), false);
        assert_eq!(monday.day_type, DayType::Weekday);
        assert_eq!(monday.day_of_week, 1);
        assert_eq!(monday.slot_key(), "monday_morning");

        let sunday = Context::at(at(2026, 10, 18, 15), false);
        assert_eq!(sunday.day_type, DayType::Weekend);
        assert_eq!(sunday.weekday_name(), "sunday");
    }

    #[test]
    fn first_visit_flips_once_per_day() {
        let store = Arc::new(MemoryStore::new());
        let mut provider = ContextProvider::new(store.clone());

        assert!(provider.compute_context(at(2026, 10, 19, 8)).is_first_visit);
        assert!(!provider.compute_context(at(2026, 10, 19, 10)).is_first_visit);
        assert_eq!(
            store.get(LAST_VISIT_KEY).unwrap().as_deref(),
            Some("2026-10-19")
        );

        assert!(provider.compute_context(at(2026, 10, 20, 7)).is_first_visit);
    }

    #[test]
    fn current_reuses_context_within_the_hour() {
        let mut provider = ContextProvider::new(Arc::new(MemoryStore::new()));
        let first = provider.current(at(2026, 10, 19, 9));
        let cached = provider.current(at(2026, 10, 19, 9) + Duration::minutes(40));
        assert_eq!(first, cached);

        let refreshed = provider.current(at(2026, 10, 19, 9) + Duration::minutes(61));
        assert_eq!(refreshed.hour, 10);
        assert!(!refreshed.is_first_visit);
    }
}
