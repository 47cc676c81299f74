//! Collection engine.
//!
//! Ties the pieces of one collector together: the per-cycle orchestrator,
//! the fixed-interval scheduler worker, and the start/stop lifecycle.
//!
//! # Example
//!
//! ```rust,no_run
//! use slowlog_collector::{Collector, CollectorConfig, JsonLinesSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectorConfig::load("configs/config.yaml")?;
//! let handle = Collector::new(config, JsonLinesSink)?.start()?;
//! // ... run until shutdown ...
//! handle.stop();
//! # Ok(())
//! # }
//! ```

mod orchestrator;
mod scheduler;

use std::io;
use std::sync::mpsc::SyncSender;
use std::thread::JoinHandle;
use std::time::Duration;

use orchestrator::Orchestrator;
use scheduler::Command;

use crate::config::{CollectorConfig, ConfigError};
use crate::session::{ClientFactory, MysqlClientFactory};
use crate::sink::EventSink;

/// Name of the worker thread.
const WORKER_THREAD_NAME: &str = "slowlog-collector";

/// A configured, not-yet-running collector.
///
/// Construction validates the whole configuration and fails fast; a
/// `Collector` that exists can always be started.
pub struct Collector<F: ClientFactory, S: EventSink> {
    interval: Duration,
    orchestrator: Orchestrator<F, S>,
}

impl<S: EventSink> Collector<MysqlClientFactory, S> {
    /// Create a collector that connects to real MySQL servers.
    pub fn new(config: CollectorConfig, sink: S) -> Result<Self, ConfigError> {
        Self::with_factory(config, MysqlClientFactory, sink)
    }
}

impl<F: ClientFactory, S: EventSink> Collector<F, S> {
    /// Create a collector with an injected connection factory.
    pub fn with_factory(
        config: CollectorConfig,
        factory: F,
        sink: S,
    ) -> Result<Self, ConfigError> {
        let normalizer = config.validate()?;
        Ok(Self {
            interval: config.emit_interval(),
            orchestrator: Orchestrator::new(&config, normalizer, factory, sink),
        })
    }

    /// Start the collection worker.
    ///
    /// Non-blocking: cycles run on a dedicated background thread until the
    /// returned handle is stopped.
    pub fn start(self) -> io::Result<CollectorHandle> {
        let servers = self.orchestrator.server_count();
        let orchestrator = self.orchestrator;
        let (worker, control) = scheduler::spawn(WORKER_THREAD_NAME, self.interval, move || {
            orchestrator.run_cycle()
        })?;
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            servers,
            "collector started"
        );
        Ok(CollectorHandle {
            control,
            worker: Some(worker),
        })
    }
}

/// Handle to a running collector.
pub struct CollectorHandle {
    control: SyncSender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    /// Stop the scheduler and wait for the worker to exit.
    ///
    /// Blocks until the current cycle finishes; an in-flight blocking network
    /// call is never interrupted, only waited for.
    pub fn stop(mut self) {
        let _ = self.control.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("collector worker panicked");
            } else {
                tracing::info!("collector stopped");
            }
        }
    }
}

impl std::fmt::Debug for CollectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorHandle")
            .field("running", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}
