//! Node configuration.
//!
//! # Responsibility
//! - Describe everything the node needs at startup in one serde struct.
//! - Load it from an optional TOML file; command-line flags override later.
//!
//! # Invariants
//! - Every key has a default, so an empty or missing file is valid.
//! - `validate()` must pass before the config is used to build a node.

use crate::logging::default_log_level;
use crate::service::dispatcher::DEFAULT_DEADLINE_LOOKAHEAD_DAYS;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_NODE_ID: &str = "GOVERNOR";
pub const DEFAULT_SCHEDULE_PATH: &str = "weekly_schedule.csv";
pub const DEFAULT_EVENTS_PATH: &str = "events.json";
/// Upper bound for `deadline_lookahead_days`, roughly a century.
pub const MAX_DEADLINE_LOOKAHEAD_DAYS: i64 = 36_500;

/// Startup configuration for one governor node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address of this node; requests to other nodes are ignored.
    pub node_id: String,
    /// Weekly schedule CSV. Empty disables the schedule.
    pub schedule_path: PathBuf,
    /// Event file. Empty keeps events in memory only.
    pub events_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
    /// Lookahead for `GET DEADLINES` without a period argument.
    pub deadline_lookahead_days: i64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: DEFAULT_NODE_ID.to_string(),
            schedule_path: PathBuf::from(DEFAULT_SCHEDULE_PATH),
            events_path: PathBuf::from(DEFAULT_EVENTS_PATH),
            log_level: default_log_level().to_string(),
            log_dir: None,
            deadline_lookahead_days: DEFAULT_DEADLINE_LOOKAHEAD_DAYS,
        }
    }
}

/// Configuration loading/validation failure.
#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "could not read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "could not parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

impl NodeConfig {
    /// Loads config from a TOML file; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.trim().is_empty() {
            return Err(ConfigError::Invalid("node_id cannot be empty".to_string()));
        }
        if !(1..=MAX_DEADLINE_LOOKAHEAD_DAYS).contains(&self.deadline_lookahead_days) {
            return Err(ConfigError::Invalid(format!(
                "deadline_lookahead_days must be within 1..={MAX_DEADLINE_LOOKAHEAD_DAYS}, got {}",
                self.deadline_lookahead_days
            )));
        }
        Ok(())
    }

    /// Lookahead window; out-of-range values are clamped into the valid range.
    pub fn deadline_lookahead(&self) -> Duration {
        Duration::days(
            self.deadline_lookahead_days
                .clamp(1, MAX_DEADLINE_LOOKAHEAD_DAYS),
        )
    }

    /// Schedule path, or `None` when the schedule is disabled.
    pub fn schedule_source(&self) -> Option<&Path> {
        non_empty_path(&self.schedule_path)
    }

    /// Event file path, or `None` for an in-memory repository.
    pub fn events_source(&self) -> Option<&Path> {
        non_empty_path(&self.events_path)
    }
}

fn non_empty_path(path: &Path) -> Option<&Path> {
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeConfig, DEFAULT_NODE_ID, MAX_DEADLINE_LOOKAHEAD_DAYS};

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config: NodeConfig = toml::from_str("node_id = \"CAL\"\nevents_path = \"\"\n")
            .expect("partial config should parse");
        assert_eq!(config.node_id, "CAL");
        assert!(config.events_source().is_none());
        assert!(config.schedule_source().is_some());
        assert_eq!(config.deadline_lookahead_days, 7);
    }

    #[test]
    fn validate_rejects_empty_node_and_non_positive_lookahead() {
        let mut config = NodeConfig::default();
        assert_eq!(config.node_id, DEFAULT_NODE_ID);
        config.validate().expect("defaults are valid");

        config.deadline_lookahead_days = 0;
        assert!(config.validate().is_err());

        config.deadline_lookahead_days = 3;
        config.node_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_caps_lookahead_at_a_century() {
        let mut config = NodeConfig {
            deadline_lookahead_days: MAX_DEADLINE_LOOKAHEAD_DAYS,
            ..NodeConfig::default()
        };
        config.validate().expect("cap itself is allowed");

        for days in [MAX_DEADLINE_LOOKAHEAD_DAYS + 1, 100_000_000, i64::MAX] {
            config.deadline_lookahead_days = days;
            let err = config.validate().expect_err("oversized lookahead must fail");
            assert!(err.to_string().contains("deadline_lookahead_days"), "{err}");
            assert_eq!(
                config.deadline_lookahead().num_days(),
                MAX_DEADLINE_LOOKAHEAD_DAYS
            );
        }
    }
}
