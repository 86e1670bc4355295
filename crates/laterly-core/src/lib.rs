//! # Laterly Core Library
//!
//! Context-aware recommendations for a read-it-later inbox. Given a set of
//! captured items (articles, emails, events, tasks) and a log of what the
//! user did with earlier suggestions, the core decides what to surface right
//! now and why.
//!
//! ## Architecture
//!
//! - **Context**: time of day, weekday and first-visit detection
//! - **Patterns**: aggregate preferences learned from the behavior log
//! - **Session**: the shape of the running session (pace, focus, mode)
//! - **Moments**: named usage situations that filter the candidate items
//! - **Scoring**: eight weighted, explainable sub-scores per item
//! - **Coordinator**: runs the pipeline and assembles a recommendation bundle
//! - **Storage**: SQLite learning state and behavior log, TOML configuration
//!
//! The pipeline never fails. Learning state lives behind [`LearningStore`],
//! so one backing store can be partitioned per user with [`ScopedStore`].
//!
//! ## Key Components
//!
//! - [`SuggestionCoordinator`]: the recommendation entry point
//! - [`PatternAnalyzer`]: behavior log analysis
//! - [`MomentDetector`]: moment detection with a learned history
//! - [`ScoringEngine`]: item scoring and suggestion/rejection memory
//! - [`Database`]: persistent learning state and behavior log
//! - [`Config`]: application configuration management

pub mod behavior;
pub mod catalog;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod item;
pub mod moment;
pub mod patterns;
pub mod scoring;
pub mod session;
pub mod storage;
pub mod store;

pub use behavior::{Action, BehaviorEvent, BehaviorLog, ItemSnapshot, DEFAULT_LOG_CAPACITY};
pub use catalog::{ItemCatalog, ItemSource};
pub use context::{Context, ContextProvider, DayType, TimeOfDay};
pub use coordinator::{
    AttentionItem, BundleMeta, ContinueItem, CoordinatorSettings, MomentPick, QuickAction,
    RecommendationBundle, SuggestionCoordinator,
};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use item::{Category, Complexity, Item, ItemKind, ItemState, Urgency};
pub use moment::{Moment, MomentDetector, MomentRecommendations, MomentType};
pub use patterns::{PatternAnalyzer, UserPatterns};
pub use scoring::{Factor, FactorWeights, ScoreBreakdown, ScoredItem, ScoringEngine};
pub use session::{SessionCharacteristics, SessionWindow};
pub use storage::{Config, Database};
pub use store::{LearningStore, MemoryStore, ScopedStore};
