use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Navigation host limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Upper bound for a single surface transition in milliseconds (default: 5000).
    #[serde(default = "default_transition_timeout_ms")]
    pub transition_timeout_ms: u64,
    /// Maximum number of screens on the visible stack (default: 64).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl NavigationConfig {
    pub fn transition_timeout(&self) -> Duration {
        Duration::from_millis(self.transition_timeout_ms)
    }
}

/// What to do when the tree detects lifecycle misuse with no caller to return it to.
///
/// Defaults to [`Panic`](Self::Panic) in debug builds and
/// [`Report`](Self::Report) in release builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Log at error level and skip the offending command.
    Report,
    /// Abort.
    Panic,
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Report
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    #[serde(default)]
    pub violation_policy: ViolationPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Write logs to this file instead of stderr.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_transition_timeout_ms() -> u64 {
    5_000
}

fn default_max_depth() -> usize {
    64
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            transition_timeout_ms: default_transition_timeout_ms(),
            max_depth: default_max_depth(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}
