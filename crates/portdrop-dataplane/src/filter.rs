//! Port Filter
//!
//! One decode path serving both filter variants: a configured port read
//! from a [`RuleStore`] or a fixed compiled-in port, with or without drop
//! counting.

use std::sync::Arc;

use crate::classify::{decide, Action, Rule};
use crate::stats::DropCounter;
use crate::store::RuleStore;

/// Where the blocked port comes from
#[derive(Debug, Clone)]
pub enum RuleSource {
    /// Read from the store on every frame
    Configured(Arc<RuleStore>),
    /// Fixed for the filter's lifetime
    Fixed(Rule),
}

impl RuleSource {
    /// Rule to apply to the next frame
    #[inline(always)]
    pub fn snapshot(&self) -> Option<Rule> {
        match self {
            RuleSource::Configured(store) => store.snapshot(),
            RuleSource::Fixed(rule) => Some(*rule),
        }
    }
}

impl Default for RuleSource {
    fn default() -> Self {
        RuleSource::Fixed(Rule::default())
    }
}

/// Per-frame classifier with an optional drop counter
#[derive(Debug, Clone, Default)]
pub struct Filter {
    source: RuleSource,
    counter: Option<Arc<DropCounter>>,
}

impl Filter {
    /// Filter that does not count drops
    pub fn new(source: RuleSource) -> Self {
        Self { source, counter: None }
    }

    /// Filter that counts every drop in `counter`
    pub fn with_counter(source: RuleSource, counter: Arc<DropCounter>) -> Self {
        Self {
            source,
            counter: Some(counter),
        }
    }

    /// Classify one frame.
    ///
    /// Takes one rule snapshot, decodes, and bumps the counter exactly once
    /// on `Drop`.
    #[inline]
    pub fn classify(&self, frame: &[u8]) -> Action {
        let rule = self.source.snapshot();
        let action = decide(frame, rule);
        if action.is_drop() {
            if let Some(counter) = &self.counter {
                counter.record_drop();
            }
            tracing::trace!(len = frame.len(), port = rule.map(|r| r.port), "frame dropped");
        }
        action
    }

    /// Rule source
    pub fn source(&self) -> &RuleSource {
        &self.source
    }

    /// Store backing a configured filter
    pub fn rule_store(&self) -> Option<&Arc<RuleStore>> {
        match &self.source {
            RuleSource::Configured(store) => Some(store),
            RuleSource::Fixed(_) => None,
        }
    }

    /// Drop counter, if counting
    pub fn drop_counter(&self) -> Option<&Arc<DropCounter>> {
        self.counter.as_ref()
    }

    /// Current drop count (0 when not counting)
    pub fn dropped(&self) -> u64 {
        self.counter.as_ref().map(|c| c.get()).unwrap_or(0)
    }
}
