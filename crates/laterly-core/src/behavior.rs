//! Append-only log of user actions.
//!
//! Events are never mutated once appended; the log prunes its oldest entries
//! when it grows past capacity and that is the only deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::context::Context;
use crate::item::{Category, Item, ItemKind};

/// Default number of events kept.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// A user action tag. Unknown tags are kept verbatim as [`Action::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Read,
    Complete,
    Finish,
    Engage,
    Save,
    Open,
    Start,
    Preview,
    Browse,
    Dismiss,
    Skip,
    Archive,
    Categorize,
    QuickAction,
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::Read => "read",
            Action::Complete => "complete",
            Action::Finish => "finish",
            Action::Engage => "engage",
            Action::Save => "save",
            Action::Open => "open",
            Action::Start => "start",
            Action::Preview => "preview",
            Action::Browse => "browse",
            Action::Dismiss => "dismiss",
            Action::Skip => "skip",
            Action::Archive => "archive",
            Action::Categorize => "categorize",
            Action::QuickAction => "quick-action",
            Action::Other(tag) => tag,
        }
    }

    /// Deep engagement: read, complete, engage.
    pub fn is_engagement(&self) -> bool {
        matches!(self, Action::Read | Action::Complete | Action::Engage)
    }

    /// Counts toward positive category affinity.
    pub fn is_positive(&self) -> bool {
        self.is_engagement() || *self == Action::Save
    }

    /// Dismiss, skip, archive.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Action::Dismiss | Action::Skip | Action::Archive)
    }

    /// Quick, shallow reactions used by energy inference: dismiss, skip.
    pub fn is_quick(&self) -> bool {
        matches!(self, Action::Dismiss | Action::Skip)
    }

    /// Light engagement: open, start.
    pub fn is_light_engagement(&self) -> bool {
        matches!(self, Action::Open | Action::Start)
    }

    /// Begins consumption for completion-rate tracking.
    pub fn is_start(&self) -> bool {
        matches!(self, Action::Start | Action::Open | Action::Read)
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, Action::Complete | Action::Finish)
    }

    /// Browsing actions: open, preview, browse.
    pub fn is_exploration(&self) -> bool {
        matches!(self, Action::Open | Action::Preview | Action::Browse)
    }

    /// Inbox-clearing actions: archive, dismiss, quick-action.
    pub fn is_triage(&self) -> bool {
        matches!(self, Action::Archive | Action::Dismiss | Action::QuickAction)
    }

    /// Actions that sort the inbox down: archive, complete, categorize.
    pub fn is_sorting(&self) -> bool {
        matches!(self, Action::Archive | Action::Complete | Action::Categorize)
    }
}

impl From<String> for Action {
    fn from(tag: String) -> Self {
        match tag.to_lowercase().as_str() {
            "read" => Action::Read,
            "complete" => Action::Complete,
            "finish" => Action::Finish,
            "engage" => Action::Engage,
            "save" => Action::Save,
            "open" => Action::Open,
            "start" => Action::Start,
            "preview" => Action::Preview,
            "browse" => Action::Browse,
            "dismiss" => Action::Dismiss,
            "skip" => Action::Skip,
            "archive" => Action::Archive,
            "categorize" => Action::Categorize,
            "quick-action" | "quick_action" => Action::QuickAction,
            _ => Action::Other(tag),
        }
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Action::from(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fields of an item the pattern analyzer reads, frozen at event time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: String,
    pub category: Category,
    #[serde(rename = "type", default = "default_kind_name")]
    pub kind: String,
    #[serde(default)]
    pub estimated_duration: Option<u32>,
    pub created_at: DateTime<Utc>,
}

fn default_kind_name() -> String {
    ItemKind::default().name().to_string()
}

impl From<&Item> for ItemSnapshot {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            category: item.category,
            kind: item.kind.name().to_string(),
            estimated_duration: Some(item.duration_minutes()),
            created_at: item.created_at,
        }
    }
}

/// One observed user action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub action: Action,
    pub item: ItemSnapshot,
    #[serde(default)]
    pub context: Option<Context>,
    pub timestamp: DateTime<Utc>,
}

impl BehaviorEvent {
    pub fn new(action: Action, item: &Item, context: &Context) -> Self {
        Self {
            action,
            item: ItemSnapshot::from(item),
            context: Some(context.clone()),
            timestamp: context.now,
        }
    }
}

/// Bounded, chronologically ordered behavior log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorLog {
    events: VecDeque<BehaviorEvent>,
    capacity: usize,
}

impl Default for BehaviorLog {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY)),
            capacity,
        }
    }

    /// Build a log from stored events, keeping only the newest `capacity`.
    pub fn from_events(events: impl IntoIterator<Item = BehaviorEvent>, capacity: usize) -> Self {
        let mut log = Self::with_capacity(capacity);
        for event in events {
            log.append(event);
        }
        log
    }

    pub fn append(&mut self, event: BehaviorEvent) {
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn events(&self) -> impl DoubleEndedIterator<Item = &BehaviorEvent> + ExactSizeIterator {
        self.events.iter()
    }

    /// The last `n` events, oldest first.
    pub fn recent(&self, n: usize) -> Vec<BehaviorEvent> {
        let skip = self.events.len().saturating_sub(n);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<BehaviorEvent> {
        self.events.iter().cloned().collect()
    }
}
