//! Item scoring.
//!
//! Every candidate gets eight sub-scores in [0, 1] which are combined as a
//! weighted sum. The weights start from a fixed base and are bumped for the
//! time of day and the session mode:
//!
//! | Factor       | Base | Morning | Evening | Triage | Deep work |
//! |--------------|------|---------|---------|--------|-----------|
//! | base         | 0.20 |         |         |        |           |
//! | staleness    | 0.15 | +0.05   |         | +0.05  |           |
//! | progress     | 0.15 |         |         |        | +0.10     |
//! | variety      | 0.10 |         | +0.05   |        |           |
//! | duration_fit | 0.15 |         |         | +0.10  |           |
//! | pattern      | 0.15 |         | +0.05   |        | +0.05     |
//! | rejection    | 0.05 |         |         |        |           |
//! | energy_match | 0.05 | +0.05   |         |        |           |
//!
//! Bumped weights are not renormalized; the total is clamped to [0, 1].

pub mod engine;
pub mod factors;
pub mod weights;

pub use engine::{
    rejection_decay, FactorTerm, ScoreBreakdown, ScoredItem, ScoringEngine, SUGGESTION_HISTORY,
    VARIETY_WINDOW,
};
pub use weights::{Factor, FactorWeights};
