//! Port Classifier
//!
//! Ethernet → IPv4 → TCP → destination port match.
//!
//! Fail-open: a frame is only dropped when every header decodes and every
//! check matches. Short, malformed or foreign frames always pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::error::DecodeResult;
use crate::headers::{decode_ethernet, decode_ipv4, decode_tcp, ETHERTYPE_IPV4, IPPROTO_TCP};

/// Forwarding decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Forward the frame
    Pass,
    /// Discard the frame
    Drop,
}

impl Action {
    /// Check if this is a drop
    #[inline(always)]
    pub fn is_drop(&self) -> bool {
        matches!(self, Action::Drop)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Pass => f.write_str("PASS"),
            Action::Drop => f.write_str("DROP"),
        }
    }
}

/// Destination port to block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rule {
    pub port: u16,
}

impl Rule {
    /// Port blocked by the fixed-rule filter
    pub const DEFAULT_BLOCKED_PORT: u16 = 4040;

    /// Create a rule for `port`
    #[inline(always)]
    pub const fn new(port: u16) -> Self {
        Self { port }
    }

    /// Check a destination port against the rule
    #[inline(always)]
    pub fn matches(&self, dst_port: u16) -> bool {
        self.port == dst_port
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BLOCKED_PORT)
    }
}

/// Decide from already-decoded fields.
///
/// Checks run in order (ethertype, protocol, port); the first one that is
/// absent or does not match yields `Pass`. No rule never matches.
#[inline]
pub fn classify(
    ethertype: u16,
    protocol: Option<u8>,
    dst_port: Option<u16>,
    rule: Option<Rule>,
) -> Action {
    if ethertype != ETHERTYPE_IPV4 {
        return Action::Pass;
    }
    if protocol != Some(IPPROTO_TCP) {
        return Action::Pass;
    }
    match (dst_port, rule) {
        (Some(port), Some(rule)) if rule.matches(port) => Action::Drop,
        _ => Action::Pass,
    }
}

/// Decode `frame` and classify it against `rule`.
///
/// Any decode failure resolves to `Pass`.
#[inline]
pub fn decide(frame: &[u8], rule: Option<Rule>) -> Action {
    match evaluate(frame, rule) {
        Ok(action) => action,
        Err(e) => {
            tracing::trace!(len = frame.len(), error = %e, "decode failed, passing frame");
            Action::Pass
        }
    }
}

/// Walk the headers, decoding each layer only when the previous check
/// matched.
fn evaluate(frame: &[u8], rule: Option<Rule>) -> DecodeResult<Action> {
    let mut cur = Cursor::new(frame);

    let eth = decode_ethernet(&mut cur)?;
    if !eth.is_ipv4() {
        return Ok(classify(eth.ethertype, None, None, rule));
    }

    let ip = decode_ipv4(&mut cur)?;
    if !ip.is_tcp() {
        return Ok(classify(eth.ethertype, Some(ip.protocol), None, rule));
    }

    let tcp = decode_tcp(&mut cur)?;
    Ok(classify(eth.ethertype, Some(ip.protocol), Some(tcp.dst_port), rule))
}
