//! Filter Statistics
//!
//! Lock-free counters shared by every classification call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use serde::Serialize;

use crate::classify::Action;

/// Shared drop counter.
///
/// Starts at zero, only ever incremented. Increments are single relaxed
/// fetch-adds: no increment is lost, but increments from different workers
/// are not ordered against each other.
#[derive(Debug, Default)]
#[repr(C, align(64))]
pub struct DropCounter(AtomicU64);

impl DropCounter {
    /// Create a zeroed counter
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Count one drop, returning the previous value
    #[inline(always)]
    pub fn record_drop(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }

    /// Current count
    #[inline(always)]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-engine stats (cache-line aligned)
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct EngineStats {
    pub frames: AtomicU64,
    pub bytes: AtomicU64,
    pub passed: AtomicU64,
    pub dropped: AtomicU64,
}

impl EngineStats {
    #[inline(always)]
    pub fn record(&self, bytes: u64, action: Action) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        match action {
            Action::Pass => self.passed.fetch_add(1, Ordering::Relaxed),
            Action::Drop => self.dropped.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Stats snapshot (non-atomic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatsSnapshot {
    pub frames: u64,
    pub bytes: u64,
    pub passed: u64,
    pub dropped: u64,
}

impl EngineStatsSnapshot {
    pub fn drop_rate(&self) -> f64 {
        if self.frames == 0 { return 0.0; }
        self.dropped as f64 / self.frames as f64
    }
}

/// Periodically logs the drop count from a background thread
pub struct DropReporter {
    stop_tx: Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    counter: std::sync::Arc<DropCounter>,
}

impl DropReporter {
    /// Start logging `counter` every `interval`
    pub fn spawn(counter: std::sync::Arc<DropCounter>, interval: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let ticker = channel::tick(interval);
        let watched = counter.clone();

        let thread = thread::Builder::new()
            .name("portdrop-reporter".into())
            .spawn(move || loop {
                let stopped = crossbeam::select! {
                    recv(ticker) -> _ => {
                        let dropped = watched.get();
                        tracing::info!(dropped, "dropped packets: {}", dropped);
                        false
                    }
                    recv(stop_rx) -> _ => true,
                };
                if stopped {
                    break;
                }
            })?;

        Ok(Self {
            stop_tx,
            thread: Some(thread),
            counter,
        })
    }

    /// Stop the reporter and return the final count
    pub fn stop(mut self) -> u64 {
        self.shutdown();
        let total = self.counter.get();
        tracing::info!(dropped = total, "final drop count");
        total
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DropReporter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_drop_counter() {
        let counter = DropCounter::new();
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.record_drop(), 0);
        assert_eq!(counter.record_drop(), 1);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_drop_counter_concurrent() {
        let counter = Arc::new(DropCounter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = counter.clone();
                thread::spawn(move || {
                    for _ in 0..10_000 {
                        c.record_drop();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(), 80_000);
    }

    #[test]
    fn test_engine_stats() {
        let stats = EngineStats::default();
        stats.record(60, Action::Pass);
        stats.record(60, Action::Drop);
        stats.record(1500, Action::Drop);

        let snap = stats.snapshot();
        assert_eq!(snap.frames, 3);
        assert_eq!(snap.bytes, 1620);
        assert_eq!(snap.passed, 1);
        assert_eq!(snap.dropped, 2);
        assert!((snap.drop_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_reporter_returns_final_count() {
        let counter = Arc::new(DropCounter::new());
        let reporter = DropReporter::spawn(counter.clone(), Duration::from_millis(5)).unwrap();
        counter.record_drop();
        counter.record_drop();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(reporter.stop(), 2);
    }
}
