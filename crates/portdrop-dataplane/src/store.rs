//! Lock-free rule store with hot-swapping
//!
//! Holds the configured blocked port. Readers take a snapshot per frame and
//! see either the previous or the new rule, never a partial write.

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::classify::Rule;

/// Single-entry rule store
#[derive(Debug, Default)]
pub struct RuleStore {
    /// Current rule (absent until configured)
    rule: ArcSwapOption<Rule>,
    /// Bumped on every update
    version: AtomicU64,
}

impl RuleStore {
    /// Create an empty store; nothing matches until a rule is set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an initial rule
    pub fn with_rule(rule: Rule) -> Self {
        Self {
            rule: ArcSwapOption::from_pointee(rule),
            version: AtomicU64::new(1),
        }
    }

    /// Current rule
    #[inline(always)]
    pub fn snapshot(&self) -> Option<Rule> {
        self.rule.load().as_deref().copied()
    }

    /// Atomically replace the rule
    pub fn set(&self, rule: Rule) {
        self.rule.store(Some(Arc::new(rule)));
        let version = self.version.fetch_add(1, Ordering::Release) + 1;
        tracing::info!(port = rule.port, version, "blocked port updated");
    }

    /// Remove the rule; every frame passes afterwards
    pub fn clear(&self) {
        self.rule.store(None);
        let version = self.version.fetch_add(1, Ordering::Release) + 1;
        tracing::info!(version, "blocked port cleared");
    }

    /// Get current version
    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}
