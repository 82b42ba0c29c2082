//! Filter Configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::classify::Rule;
use crate::error::ConfigError;
use crate::filter::{Filter, RuleSource};
use crate::stats::DropCounter;
use crate::store::RuleStore;
use crate::DEFAULT_QUEUE_DEPTH;

/// How the blocked port is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RuleConfig {
    /// Hot-swappable port, possibly not yet set
    Configured {
        #[serde(default)]
        port: Option<u16>,
    },
    /// Compiled-in port
    Fixed {
        #[serde(default = "default_fixed_port")]
        port: u16,
    },
}

fn default_fixed_port() -> u16 {
    Rule::DEFAULT_BLOCKED_PORT
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig::Configured { port: None }
    }
}

/// Filter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Blocked port source
    pub rule: RuleConfig,
    /// Count drops in a shared counter
    pub track_drops: bool,
    /// Number of worker threads
    pub workers: usize,
    /// Frames buffered between producer and workers
    pub queue_depth: usize,
    /// Seconds between drop count reports
    pub report_interval_secs: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            rule: RuleConfig::default(),
            track_drops: true,
            workers: num_cpus(),
            queue_depth: DEFAULT_QUEUE_DEPTH,
            report_interval_secs: 2,
        }
    }
}

/// Get number of CPUs (simplified)
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl FilterConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid("queue_depth must be at least 1".into()));
        }
        if self.report_interval_secs == 0 {
            return Err(ConfigError::Invalid("report_interval_secs must be at least 1".into()));
        }
        Ok(())
    }

    /// Build the filter this config describes.
    ///
    /// A configured rule gets a fresh [`RuleStore`] seeded with the port, if
    /// any; reach it later through [`Filter::rule_store`].
    pub fn build_filter(&self) -> Filter {
        let source = match self.rule {
            RuleConfig::Configured { port } => {
                let store = match port {
                    Some(port) => RuleStore::with_rule(Rule::new(port)),
                    None => RuleStore::new(),
                };
                RuleSource::Configured(Arc::new(store))
            }
            RuleConfig::Fixed { port } => RuleSource::Fixed(Rule::new(port)),
        };

        if self.track_drops {
            Filter::with_counter(source, Arc::new(DropCounter::new()))
        } else {
            Filter::new(source)
        }
    }
}
