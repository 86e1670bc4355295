//! TOML-based application configuration.
//!
//! Stores the recommendation tunables:
//! - Behavior log capacity and bundle list sizes
//! - Moment confidence threshold
//! - Session gap used by pattern analysis
//! - Context cache lifetime
//!
//! Configuration is stored at `~/.config/laterly/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::behavior::DEFAULT_LOG_CAPACITY;
use crate::coordinator::CoordinatorSettings;
use crate::error::ConfigError;
use crate::moment::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::patterns::DEFAULT_SESSION_GAP_MINUTES;

/// Bundle and log sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsConfig {
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Log entries the moment detector sees as recent activity
    #[serde(default = "default_recent_activity")]
    pub recent_activity: usize,
    #[serde(default = "default_attention_limit")]
    pub attention_limit: usize,
    #[serde(default = "default_continue_limit")]
    pub continue_limit: usize,
    #[serde(default = "default_quick_action_limit")]
    pub quick_action_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentsConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternsConfig {
    #[serde(default = "default_session_gap")]
    pub session_gap_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_cache_minutes")]
    pub cache_minutes: i64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/laterly/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recommendations: RecommendationsConfig,
    #[serde(default)]
    pub moments: MomentsConfig,
    #[serde(default)]
    pub patterns: PatternsConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

/// Largest behavior log the config accepts.
pub const MAX_LOG_CAPACITY: usize = 10_000;

/// Longest session gap or cache lifetime the config accepts: one week.
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

// Default functions
fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}
fn default_recent_activity() -> usize {
    10
}
fn default_attention_limit() -> usize {
    3
}
fn default_continue_limit() -> usize {
    2
}
fn default_quick_action_limit() -> usize {
    2
}
fn default_confidence_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_session_gap() -> i64 {
    DEFAULT_SESSION_GAP_MINUTES
}
fn default_cache_minutes() -> i64 {
    60
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            recent_activity: default_recent_activity(),
            attention_limit: default_attention_limit(),
            continue_limit: default_continue_limit(),
            quick_action_limit: default_quick_action_limit(),
        }
    }
}

impl Default for MomentsConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            session_gap_minutes: default_session_gap(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            cache_minutes: default_cache_minutes(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<i64>() {
                        serde_json::Value::Number(n.into())
                    } else if let Ok(n) = value.parse::<f64>() {
                        serde_json::Number::from_f64(n)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                    } else {
                        return Err(invalid(format!("cannot parse '{value}' as number")));
                    }
                }
                serde_json::Value::Object(_) => return Err(unknown()),
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults there if the file
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Every leaf key with its value, in dot notation.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Change a value in memory. Returns error if key is unknown or the
    /// value does not fit the key.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        if !(1..=MAX_LOG_CAPACITY).contains(&self.recommendations.log_capacity) {
            return Err(invalid(
                "recommendations.log_capacity",
                &format!("must be between 1 and {MAX_LOG_CAPACITY}"),
            ));
        }
        if !(0.0..=1.0).contains(&self.moments.confidence_threshold) {
            return Err(invalid("moments.confidence_threshold", "must be between 0 and 1"));
        }
        if !(1..=MAX_WINDOW_MINUTES).contains(&self.patterns.session_gap_minutes) {
            return Err(invalid(
                "patterns.session_gap_minutes",
                &format!("must be between 1 and {MAX_WINDOW_MINUTES}"),
            ));
        }
        if !(0..=MAX_WINDOW_MINUTES).contains(&self.context.cache_minutes) {
            return Err(invalid(
                "context.cache_minutes",
                &format!("must be between 0 and {MAX_WINDOW_MINUTES}"),
            ));
        }
        Ok(())
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            recent_activity: self.recommendations.recent_activity,
            attention_limit: self.recommendations.attention_limit,
            continue_limit: self.recommendations.continue_limit,
            quick_action_limit: self.recommendations.quick_action_limit,
            confidence_threshold: self.moments.confidence_threshold,
            session_gap_minutes: self.patterns.session_gap_minutes,
            context_cache_minutes: self.context.cache_minutes,
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::SuggestionCoordinator;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.recommendations.log_capacity, 100);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[moments]\nconfidence_threshold = 0.7\n").unwrap();
        assert_eq!(parsed.moments.confidence_threshold, 0.7);
        assert_eq!(parsed.patterns.session_gap_minutes, 30);
        assert_eq!(parsed.recommendations.attention_limit, 3);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("moments.confidence_threshold").as_deref(), Some("0.6"));
        assert_eq!(cfg.get("recommendations.log_capacity").as_deref(), Some("100"));
        assert!(cfg.get("moments.missing_key").is_none());
        assert!(cfg.get("moments").is_none());
    }

    #[test]
    fn update_changes_numbers() {
        let mut cfg = Config::default();
        cfg.update("recommendations.attention_limit", "5").unwrap();
        cfg.update("moments.confidence_threshold", "0.75").unwrap();
        assert_eq!(cfg.recommendations.attention_limit, 5);
        assert_eq!(cfg.moments.confidence_threshold, 0.75);
        // an integer literal is fine for a float key
        cfg.update("moments.confidence_threshold", "1").unwrap();
        assert_eq!(cfg.moments.confidence_threshold, 1.0);
    }

    #[test]
    fn update_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.update("moments.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.update("", "1"), Err(ConfigError::UnknownKey(_))));
        assert!(matches!(cfg.update("moments", "1"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn update_rejects_invalid_values() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.update("recommendations.log_capacity", "lots"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.update("moments.confidence_threshold", "1.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.update("recommendations.log_capacity", "-3"),
            Err(ConfigError::InvalidValue { .. })
        ));
        // failed updates leave the config untouched
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn update_rejects_out_of_range_values() {
        let mut cfg = Config::default();
        for (key, value) in [
            ("patterns.session_gap_minutes", "9223372036854775807"),
            ("patterns.session_gap_minutes", "10081"),
            ("context.cache_minutes", "9223372036854775807"),
            ("recommendations.log_capacity", "10001"),
        ] {
            assert!(
                matches!(cfg.update(key, value), Err(ConfigError::InvalidValue { .. })),
                "{key} = {value} was accepted"
            );
        }
        assert_eq!(cfg, Config::default());

        cfg.update("patterns.session_gap_minutes", "10080").unwrap();
        cfg.update("recommendations.log_capacity", "10000").unwrap();
        let _ = SuggestionCoordinator::with_settings(
            std::sync::Arc::new(crate::store::MemoryStore::new()),
            cfg.coordinator_settings(),
        );
    }

    #[test]
    fn load_from_rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[context]\ncache_minutes = 99999999999\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn entries_lists_every_leaf() {
        let entries = Config::default().entries();
        assert_eq!(entries.len(), 8);
        assert!(entries
            .iter()
            .any(|(k, v)| k == "context.cache_minutes" && v == "60"));
    }

    #[test]
    fn save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.update("patterns.session_gap_minutes", "45").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.patterns.session_gap_minutes, 45);
        assert_eq!(loaded.coordinator_settings().session_gap_minutes, 45);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[moments\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
