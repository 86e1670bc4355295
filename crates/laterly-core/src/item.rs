//! Captured items as the recommendation pipeline sees them.
//!
//! Items are owned by the storage collaborator; this crate only reads them.
//! Type-specific data lives in [`ItemKind`], but scoring never looks past the
//! discriminant: everything downstream works on the common fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Reading speed used when estimating durations from text.
const WORDS_PER_MINUTE: usize = 200;

/// Item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Work,
    Life,
    Inspiration,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Work, Category::Life, Category::Inspiration];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
            Category::Life => "life",
            Category::Inspiration => "inspiration",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "work" => Ok(Category::Work),
            "life" => Ok(Category::Life),
            "inspiration" => Ok(Category::Inspiration),
            other => Err(ValidationError::InvalidValue {
                field: "category".into(),
                message: format!("unknown category '{other}'"),
            }),
        }
    }
}

/// Lifecycle state of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    #[default]
    Inbox,
    Library,
    Archived,
}

/// How pressing the item is, as set at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
            Urgency::Urgent => "urgent",
        }
    }
}

/// Type-specific payload. The pipeline only branches on [`ItemKind::name`].
///
/// Serialized flat next to the item's common fields, discriminated by `type`.
/// A missing or unknown `type` reads as an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "KindFields", into = "KindFields")]
pub enum ItemKind {
    Article {
        url: Option<String>,
    },
    Email {
        from: Option<String>,
        subject: Option<String>,
    },
    Event {
        starts_at: Option<DateTime<Utc>>,
        location: Option<String>,
    },
    Task {
        due_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KindFields {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_at: Option<DateTime<Utc>>,
}

impl From<KindFields> for ItemKind {
    fn from(f: KindFields) -> Self {
        match f.kind.as_deref().map(str::to_lowercase).as_deref() {
            Some("email") => ItemKind::Email { from: f.from, subject: f.subject },
            Some("event") => ItemKind::Event { starts_at: f.starts_at, location: f.location },
            Some("task") => ItemKind::Task { due_at: f.due_at },
            _ => ItemKind::Article { url: f.url },
        }
    }
}

impl From<ItemKind> for KindFields {
    fn from(kind: ItemKind) -> Self {
        let mut f = KindFields {
            kind: Some(kind.name().to_string()),
            ..KindFields::default()
        };
        match kind {
            ItemKind::Article { url } => f.url = url,
            ItemKind::Email { from, subject } => {
                f.from = from;
                f.subject = subject;
            }
            ItemKind::Event { starts_at, location } => {
                f.starts_at = starts_at;
                f.location = location;
            }
            ItemKind::Task { due_at } => f.due_at = due_at,
        }
        f
    }
}

impl Default for ItemKind {
    fn default() -> Self {
        ItemKind::Article { url: None }
    }
}

impl ItemKind {
    pub fn name(&self) -> &'static str {
        match self {
            ItemKind::Article { .. } => "article",
            ItemKind::Email { .. } => "email",
            ItemKind::Event { .. } => "event",
            ItemKind::Task { .. } => "task",
        }
    }
}

/// Estimated cognitive load of an item, derived from its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

impl Complexity {
    pub fn from_minutes(minutes: u32) -> Self {
        match minutes {
            0..=5 => Complexity::Simple,
            6..=15 => Complexity::Medium,
            _ => Complexity::Complex,
        }
    }

    /// Energy an item of this complexity asks for, on the same 0..1 scale as
    /// the learned per-time-of-day energy scores.
    pub fn required_energy(&self) -> f64 {
        match self {
            Complexity::Simple => 0.3,
            Complexity::Medium => 0.6,
            Complexity::Complex => 0.9,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

/// A captured item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub category: Category,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub state: ItemState,
    pub created_at: DateTime<Utc>,
    /// Reading progress in [0, 1]; anything but a number reads as 0
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: f64,
    /// Estimated minutes; derived from content when absent or not a
    /// positive whole number
    #[serde(default, deserialize_with = "lenient_duration")]
    pub estimated_duration: Option<u32>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn lenient_progress<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|p| p.is_finite()).unwrap_or(0.0))
}

fn lenient_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .filter(|&minutes| minutes > 0)
        .and_then(|minutes| u32::try_from(minutes).ok()))
}

impl Item {
    /// Create an unstarted inbox article.
    pub fn new(id: impl Into<String>, category: Category, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            content: String::new(),
            category,
            kind: ItemKind::default(),
            state: ItemState::Inbox,
            created_at,
            progress: 0.0,
            estimated_duration: None,
            urgency: Urgency::Normal,
            tags: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_state(mut self, state: ItemState) -> Self {
        self.state = state;
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration = Some(minutes);
        self
    }

    pub fn with_content(mut self, title: impl Into<String>, content: impl Into<String>) -> Self {
        self.title = title.into();
        self.content = content.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    /// Progress clamped to [0, 1]; NaN reads as unstarted.
    pub fn progress(&self) -> f64 {
        if self.progress.is_nan() {
            0.0
        } else {
            self.progress.clamp(0.0, 1.0)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn is_partially_read(&self) -> bool {
        let p = self.progress();
        p > 0.0 && p < 1.0
    }

    /// Estimated duration in minutes, falling back to a content-based guess.
    pub fn duration_minutes(&self) -> u32 {
        match self.estimated_duration {
            Some(minutes) if minutes > 0 => minutes,
            _ => self.heuristic_duration(),
        }
    }

    fn heuristic_duration(&self) -> u32 {
        let words = self.title.split_whitespace().count() + self.content.split_whitespace().count();
        match self.kind {
            ItemKind::Event { .. } | ItemKind::Task { .. } => 5,
            ItemKind::Article { .. } if self.content.trim().is_empty() => 5,
            ItemKind::Article { .. } | ItemKind::Email { .. } => {
                words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
            }
        }
    }

    pub fn complexity(&self) -> Complexity {
        Complexity::from_minutes(self.duration_minutes())
    }

    /// Age in fractional days at `now`; never negative.
    pub fn staleness_days(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.created_at).num_seconds().max(0) as f64;
        secs / 86_400.0
    }

    /// Whether `label` names this item's category, kind or one of its tags.
    pub fn matches_label(&self, label: &str) -> bool {
        label.eq_ignore_ascii_case(self.category.as_str())
            || label.eq_ignore_ascii_case(self.kind.name())
            || self.tags.iter().any(|t| t.eq_ignore_ascii_case(label))
    }
}
