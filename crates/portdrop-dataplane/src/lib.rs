//! portdrop Data Plane
//!
//! Per-frame TCP destination-port filter with a shared drop counter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         FILTER ENGINE                            │
//! │                                                                  │
//! │   frames ──► bounded queue ──► worker 0 … worker N               │
//! │                                    │                             │
//! │                                    ▼                             │
//! │   ┌────────────────────────── Filter ─────────────────────────┐  │
//! │   │                                                           │  │
//! │   │  Cursor ─► Ethernet ─► IPv4 ─► TCP ─► classify ─► Action  │  │
//! │   │              │          │       │                  │      │  │
//! │   │              └──────────┴───────┴─ decode error ─► PASS   │  │
//! │   │                                                    │      │  │
//! │   │  RuleSource (RuleStore | fixed) ──► Rule      DROP ─► +1  │  │
//! │   └───────────────────────────────────────────────────────────┘  │
//! │                                               DropCounter        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! 1. **Bounds-checked**: every header read goes through [`Cursor`]
//! 2. **Fail-open**: truncated or malformed frames always pass
//! 3. **Exact counting**: one atomic increment per `Drop`, none per `Pass`
//! 4. **Untorn rules**: a frame sees the old or the new port, never a mix

#![warn(missing_docs)]

pub mod cursor;
pub mod headers;
pub mod classify;
pub mod filter;
pub mod store;
pub mod stats;
pub mod config;
pub mod engine;
pub mod error;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cursor::Cursor;
pub use headers::{inspect, EthernetHeader, FrameSummary, Ipv4Header, TcpHeader};
pub use classify::{classify, decide, Action, Rule};
pub use filter::{Filter, RuleSource};
pub use store::RuleStore;
pub use stats::{DropCounter, DropReporter, EngineStatsSnapshot};
pub use config::{FilterConfig, RuleConfig};
pub use engine::{EngineConfig, FilterEngine};
pub use error::{ConfigError, DecodeError, EngineError, MalformedReason};

/// Default frame queue depth
pub const DEFAULT_QUEUE_DEPTH: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_scenarios() {
        let rule = Some(Rule::new(4040));
        let frame = fixtures::tcp_frame(fixtures::FrameSpec::default());
        assert_eq!(decide(&frame, rule), Action::Drop);

        let frame = fixtures::tcp_frame(fixtures::FrameSpec { dst_port: 80, ..Default::default() });
        assert_eq!(decide(&frame, rule), Action::Pass);

        assert_eq!(decide(&[0u8; 10], rule), Action::Pass);

        let frame = fixtures::tcp_frame(fixtures::FrameSpec { ihl: 4, ..Default::default() });
        assert_eq!(decide(&frame, rule), Action::Pass);
    }
}
