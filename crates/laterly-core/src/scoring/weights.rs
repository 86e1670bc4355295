//! Factor identities and their context-adaptive weights.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::{Context, TimeOfDay};
use crate::session::{SessionCharacteristics, SessionMode};

/// The eight sub-scores combined into an item's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Base,
    Staleness,
    Progress,
    Variety,
    DurationFit,
    Pattern,
    Rejection,
    EnergyMatch,
}

impl Factor {
    pub const ALL: [Factor; 8] = [
        Factor::Base,
        Factor::Staleness,
        Factor::Progress,
        Factor::Variety,
        Factor::DurationFit,
        Factor::Pattern,
        Factor::Rejection,
        Factor::EnergyMatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Base => "base",
            Factor::Staleness => "staleness",
            Factor::Progress => "progress",
            Factor::Variety => "variety",
            Factor::DurationFit => "duration_fit",
            Factor::Pattern => "pattern",
            Factor::Rejection => "rejection",
            Factor::EnergyMatch => "energy_match",
        }
    }

    /// Sentence shown to the user when this factor dominates a score.
    pub fn reason(&self) -> &'static str {
        match self {
            Factor::Base => "A good fit for this time of day",
            Factor::Staleness => "Perfect timing to revisit this",
            Factor::Progress => "Great to continue where you left off",
            Factor::Variety => "Something different from your recent picks",
            Factor::DurationFit => "Fits the time you have right now",
            Factor::Pattern => "Matches what you usually enjoy around now",
            Factor::Rejection => "Something you haven't passed on lately",
            Factor::EnergyMatch => "Matches your current focus",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight per factor.
///
/// The base set sums to 1. Context adjustments only ever add, and the result
/// is deliberately left unnormalized, so adapted weights can sum to as much
/// as 1.25; the final score is clamped instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub base: f64,
    pub staleness: f64,
    pub progress: f64,
    pub variety: f64,
    pub duration_fit: f64,
    pub pattern: f64,
    pub rejection: f64,
    pub energy_match: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self::base()
    }
}

impl FactorWeights {
    pub fn base() -> Self {
        Self {
            base: 0.20,
            staleness: 0.15,
            progress: 0.15,
            variety: 0.10,
            duration_fit: 0.15,
            pattern: 0.15,
            rejection: 0.05,
            energy_match: 0.05,
        }
    }

    /// Base weights bumped for the time of day and the session mode.
    pub fn adapted(ctx: &Context, session: &SessionCharacteristics) -> Self {
        let mut w = Self::base();

        match ctx.time_of_day {
            TimeOfDay::Morning => {
                w.staleness += 0.05;
                w.energy_match += 0.05;
            }
            TimeOfDay::Evening => {
                w.pattern += 0.05;
                w.variety += 0.05;
            }
            TimeOfDay::Afternoon | TimeOfDay::Night => {}
        }

        match session.mode {
            SessionMode::Triage => {
                w.duration_fit += 0.10;
                w.staleness += 0.05;
            }
            SessionMode::DeepWork => {
                w.progress += 0.10;
                w.pattern += 0.05;
            }
            SessionMode::Explore | SessionMode::Mixed => {}
        }

        w
    }

    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Base => self.base,
            Factor::Staleness => self.staleness,
            Factor::Progress => self.progress,
            Factor::Variety => self.variety,
            Factor::DurationFit => self.duration_fit,
            Factor::Pattern => self.pattern,
            Factor::Rejection => self.rejection,
            Factor::EnergyMatch => self.energy_match,
        }
    }

    pub fn sum(&self) -> f64 {
        Factor::ALL.iter().map(|f| self.get(*f)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn base_weights_sum_to_one() {
        assert!((FactorWeights::base().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn morning_triage_bumps_are_not_normalized() {
        let ctx = Context::at(Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(), false);
        let session = SessionCharacteristics {
            mode: SessionMode::Triage,
            ..Default::default()
        };
        let w = FactorWeights::adapted(&ctx, &session);
        assert!((w.staleness - 0.25).abs() < 1e-9);
        assert!((w.duration_fit - 0.25).abs() < 1e-9);
        assert!((w.energy_match - 0.10).abs() < 1e-9);
        assert!((w.sum() - 1.20).abs() < 1e-9);
    }

    #[test]
    fn afternoon_mixed_keeps_base() {
        let ctx = Context::at(Utc.with_ymd_and_hms(2026, 10, 19, 14, 0, 0).unwrap(), false);
        let w = FactorWeights::adapted(&ctx, &SessionCharacteristics::default());
        assert_eq!(w, FactorWeights::base());
    }
}
