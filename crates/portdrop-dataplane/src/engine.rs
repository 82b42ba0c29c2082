//! Filter Engine
//!
//! Worker pool standing in for the packet-delivery side: frames go into a
//! bounded queue and each worker classifies them run-to-completion against a
//! shared [`Filter`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::FilterConfig;
use crate::error::EngineError;
use crate::filter::Filter;
use crate::stats::{EngineStats, EngineStatsSnapshot};
use crate::DEFAULT_QUEUE_DEPTH;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Bounded queue depth
    pub queue_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl From<&FilterConfig> for EngineConfig {
    fn from(config: &FilterConfig) -> Self {
        Self {
            workers: config.workers,
            queue_depth: config.queue_depth,
        }
    }
}

/// Filter Engine
///
/// Frames submitted while running are classified exactly once; `stop`
/// drains whatever is still queued before joining the workers.
pub struct FilterEngine {
    config: EngineConfig,
    filter: Arc<Filter>,
    running: Arc<AtomicBool>,
    tx: Option<Sender<Bytes>>,
    workers: Vec<WorkerHandle>,
    stats: Arc<EngineStats>,
}

/// Per-worker handle
struct WorkerHandle {
    thread: Option<thread::JoinHandle<()>>,
    worker_id: usize,
}

impl FilterEngine {
    /// Create new engine around `filter`
    pub fn new(config: EngineConfig, filter: Filter) -> Self {
        Self {
            config,
            filter: Arc::new(filter),
            running: Arc::new(AtomicBool::new(false)),
            tx: None,
            workers: Vec::new(),
            stats: Arc::new(EngineStats::default()),
        }
    }

    /// Start the engine
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.running.load(Ordering::Acquire) {
            return Err(EngineError::AlreadyRunning);
        }

        let (tx, rx) = bounded::<Bytes>(self.config.queue_depth.max(1));

        for worker_id in 0..self.config.workers.max(1) {
            let worker = Worker {
                worker_id,
                rx: rx.clone(),
                filter: self.filter.clone(),
                stats: self.stats.clone(),
            };

            let spawned = thread::Builder::new()
                .name(format!("portdrop-worker-{}", worker_id))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => self.workers.push(WorkerHandle {
                    thread: Some(handle),
                    worker_id,
                }),
                Err(e) => {
                    // Unwind the workers already started
                    drop(tx);
                    self.join_workers();
                    return Err(EngineError::SpawnFailed(e.to_string()));
                }
            }
        }

        self.tx = Some(tx);
        self.running.store(true, Ordering::Release);

        tracing::info!(
            workers = self.workers.len(),
            queue_depth = self.config.queue_depth,
            "filter engine started"
        );

        Ok(())
    }

    /// Queue a frame, blocking while the queue is full
    pub fn submit(&self, frame: Bytes) -> Result<(), EngineError> {
        let tx = self.tx.as_ref().ok_or(EngineError::NotRunning)?;
        tx.send(frame).map_err(|_| EngineError::QueueClosed)
    }

    /// Stop the engine after draining queued frames
    pub fn stop(&mut self) {
        if self.tx.take().is_none() && self.workers.is_empty() {
            return;
        }
        self.join_workers();
        self.running.store(false, Ordering::Release);

        let stats = self.stats.snapshot();
        tracing::info!(
            frames = stats.frames,
            dropped = stats.dropped,
            "filter engine stopped"
        );
    }

    fn join_workers(&mut self) {
        for worker in &mut self.workers {
            if let Some(handle) = worker.thread.take() {
                if handle.join().is_err() {
                    tracing::error!(worker = worker.worker_id, "worker panicked");
                }
            }
        }
        self.workers.clear();
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Shared filter
    pub fn filter(&self) -> &Arc<Filter> {
        &self.filter
    }

    /// Get engine stats
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for FilterEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-thread worker
struct Worker {
    worker_id: usize,
    rx: Receiver<Bytes>,
    filter: Arc<Filter>,
    stats: Arc<EngineStats>,
}

impl Worker {
    /// Main worker loop; exits once the queue is closed and empty
    fn run(self) {
        tracing::debug!("Worker {} starting", self.worker_id);

        for frame in self.rx.iter() {
            let action = self.filter.classify(&frame);
            self.stats.record(frame.len() as u64, action);
        }

        tracing::debug!("Worker {} stopped", self.worker_id);
    }
}
