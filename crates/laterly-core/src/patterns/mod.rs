//! Behavior pattern learning.
//!
//! This module turns the raw behavior log into aggregate preferences:
//! when the user engages, with what, for how long, and what they reject.

mod analyzer;
mod types;

pub use analyzer::{PatternAnalyzer, DEFAULT_SESSION_GAP_MINUTES};
pub use types::{
    CompletionRate, ContentAffinity, DurationBucket, EnergyLevel, EngagementRate,
    RejectionPatterns, SessionLength, SessionStats, StalenessBucket, UserPatterns, NEUTRAL,
};
