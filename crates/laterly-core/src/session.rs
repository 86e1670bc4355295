//! Runtime session tracking.
//!
//! The moment detector reads the shape of the *current* session (how fast the
//! user is acting, whether they are reading or clearing) from the last few
//! interactions. That window is an explicit value handed to the detector, so
//! detection stays a pure function of its inputs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::behavior::{Action, BehaviorLog};

/// Interactions considered when characterising a session.
pub const WINDOW_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub action: Action,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionSpeed {
    Fast,
    Medium,
    Slow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Triage,
    DeepWork,
    Explore,
    Mixed,
}

/// Shape of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionCharacteristics {
    /// Minutes since the session started
    pub session_length: f64,
    pub interaction_speed: InteractionSpeed,
    pub focus_level: FocusLevel,
    pub mode: SessionMode,
}

impl Default for SessionCharacteristics {
    fn default() -> Self {
        Self {
            session_length: 0.0,
            interaction_speed: InteractionSpeed::Medium,
            focus_level: FocusLevel::Medium,
            mode: SessionMode::Mixed,
        }
    }
}

/// The last [`WINDOW_SIZE`] interactions of the running session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionWindow {
    started_at: Option<DateTime<Utc>>,
    interactions: VecDeque<Interaction>,
}

impl SessionWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn interactions(&self) -> impl Iterator<Item = &Interaction> {
        self.interactions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    pub fn push(&mut self, action: Action, at: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(at);
        }
        self.interactions.push_back(Interaction { action, at });
        while self.interactions.len() > WINDOW_SIZE {
            self.interactions.pop_front();
        }
    }

    /// Rebuild the window a long-lived host would have kept in memory, by
    /// replaying the log tail after its last break longer than `gap`.
    pub fn from_log(log: &BehaviorLog, now: DateTime<Utc>, gap: Duration) -> Self {
        let mut session_start = log.len();
        let mut next_at = now;
        for (idx, event) in log.events().enumerate().rev() {
            if next_at - event.timestamp > gap {
                break;
            }
            session_start = idx;
            next_at = event.timestamp;
        }

        let mut window = Self::new();
        for event in log.events().skip(session_start) {
            window.push(event.action.clone(), event.timestamp);
        }
        window
    }

    pub fn characteristics(&self, now: DateTime<Utc>) -> SessionCharacteristics {
        let session_length = self
            .started_at
            .map(|start| ((now - start).num_seconds().max(0)) as f64 / 60.0)
            .unwrap_or(0.0);

        SessionCharacteristics {
            session_length,
            interaction_speed: self.interaction_speed(),
            focus_level: self.focus_level(),
            mode: self.mode(),
        }
    }

    fn interaction_speed(&self) -> InteractionSpeed {
        if self.interactions.len() < 2 {
            return InteractionSpeed::Medium;
        }

        let gaps: Vec<f64> = self
            .interactions
            .iter()
            .zip(self.interactions.iter().skip(1))
            .map(|(a, b)| (b.at - a.at).num_milliseconds().max(0) as f64 / 1000.0)
            .collect();
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;

        if mean < 3.0 {
            InteractionSpeed::Fast
        } else if mean < 10.0 {
            InteractionSpeed::Medium
        } else {
            InteractionSpeed::Slow
        }
    }

    fn focus_level(&self) -> FocusLevel {
        let engagements = self.count(Action::is_engagement);
        let dismissals = self.count(Action::is_rejection);

        if engagements > dismissals {
            FocusLevel::High
        } else if dismissals > engagements * 2 {
            FocusLevel::Low
        } else {
            FocusLevel::Medium
        }
    }

    fn mode(&self) -> SessionMode {
        if self.count(Action::is_triage) >= 3 {
            SessionMode::Triage
        } else if self.count(Action::is_engagement) >= 2 {
            SessionMode::DeepWork
        } else if self.count(Action::is_exploration) >= 2 {
            SessionMode::Explore
        } else {
            SessionMode::Mixed
        }
    }

    fn count(&self, pred: fn(&Action) -> bool) -> usize {
        self.interactions.iter().filter(|i| pred(&i.action)).count()
    }
}
