use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::modules::creds::auth::AuthCapability;
use crate::modules::creds::coordinator::{Coordinator, ShutdownReason};
use crate::modules::creds::pair::CredentialPair;
use crate::modules::creds::producer::{run_producer, FatalSlot, Slice};
use crate::modules::creds::queue::WorkQueue;
use crate::modules::creds::report::{ResultReporter, Silent};
use crate::modules::creds::source::CredentialSource;
use crate::modules::creds::stats::{RunStats, StatsSnapshot};
use crate::modules::creds::worker::{consume, WorkerContext};

const TOP_ERRORS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Every pair was attempted, none authenticated.
    Exhausted,
    CredentialFound(CredentialPair),
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub status: RunStatus,
    pub stats: StatsSnapshot,
    pub top_errors: Vec<(String, usize)>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn found(&self) -> Option<&CredentialPair> {
        match &self.status {
            RunStatus::CredentialFound(pair) => Some(pair),
            _ => None,
        }
    }
}

enum Ended {
    Drained,
    Stopped,
    WorkerFailed(String),
}

/// Drives one run: spawns producers and consumers around a shared queue and
/// waits for exhaustion, success, cancellation or a fatal source error.
pub struct Engine<A> {
    config: Arc<RunConfig>,
    capability: Arc<A>,
    reporter: Arc<dyn ResultReporter>,
    coordinator: Coordinator,
}

impl<A: AuthCapability> Engine<A> {
    pub fn new(config: RunConfig, capability: A) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            capability: Arc::new(capability),
            reporter: Arc::new(Silent),
            coordinator: Coordinator::new(),
        })
    }

    pub fn with_reporter<R: ResultReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Handle for cancelling the run from outside (signals, timers).
    pub fn coordinator(&self) -> Coordinator {
        self.coordinator.clone()
    }

    pub async fn run<S: CredentialSource>(self, source: S) -> Result<RunSummary, EngineError> {
        let started = Instant::now();
        let config = Arc::clone(&self.config);
        let coordinator = self.coordinator.clone();

        if let Err(e) = source.check() {
            coordinator.request_shutdown(ShutdownReason::SourceUnavailable);
            return Err(e);
        }

        let source = Arc::new(source);
        let queue = Arc::new(WorkQueue::new(config.queue_capacity));
        let stats = Arc::new(RunStats::new());
        let fatal: FatalSlot = Arc::new(Mutex::new(None));

        info!(
            target = %config.target,
            producers = config.producers,
            consumers = config.consumers,
            "starting run"
        );

        let mut producers = JoinSet::new();
        for index in 0..config.producers {
            let slice = Slice {
                index,
                count: config.producers,
                mode: config.producer_mode,
            };
            let handle = producers.spawn(run_producer(
                Arc::clone(&source),
                Arc::clone(&queue),
                coordinator.clone(),
                slice,
                Arc::clone(&fatal),
            ));
            coordinator.track(handle);
        }

        let mut consumers = JoinSet::new();
        for id in 0..config.consumers {
            let ctx = WorkerContext {
                id,
                config: Arc::clone(&config),
                capability: Arc::clone(&self.capability),
                queue: Arc::clone(&queue),
                coordinator: coordinator.clone(),
                reporter: Arc::clone(&self.reporter),
                stats: Arc::clone(&stats),
            };
            let handle = consumers.spawn(consume(ctx));
            coordinator.track(handle);
        }

        let ended = {
            let drained = async {
                while producers.join_next().await.is_some() {}
                queue.join().await;
            };
            tokio::pin!(drained);

            loop {
                tokio::select! {
                    biased;
                    _ = coordinator.stopped() => break Ended::Stopped,
                    Some(res) = consumers.join_next(), if !consumers.is_empty() => {
                        // Tasks are aborted before the token fires.
                        if coordinator.is_stopping() {
                            break Ended::Stopped;
                        }
                        if let Err(e) = res {
                            if e.is_panic() {
                                break Ended::WorkerFailed(describe(&e));
                            }
                        }
                        if consumers.is_empty() {
                            break Ended::WorkerFailed(
                                "all workers exited before the queue drained".to_string(),
                            );
                        }
                    }
                    _ = &mut drained => {
                        if coordinator.is_stopping() {
                            break Ended::Stopped;
                        }
                        break Ended::Drained;
                    }
                }
            }
        };

        match &ended {
            Ended::Drained => {
                debug!("queue drained, releasing workers");
                queue.close();
            }
            Ended::Stopped => debug!(reason = ?coordinator.reason(), "run stopped"),
            Ended::WorkerFailed(msg) => {
                warn!(error = %msg, "worker failed, stopping run");
                coordinator.request_shutdown(ShutdownReason::Cancelled);
            }
        }

        producers.shutdown().await;
        if matches!(ended, Ended::Drained) {
            while let Some(res) = consumers.join_next().await {
                if let Err(e) = res {
                    warn!(error = %describe(&e), "worker ended abnormally");
                }
            }
        } else {
            consumers.shutdown().await;
        }
        queue.close();

        let fatal_error = fatal.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(e) = fatal_error {
            return Err(e);
        }
        if let Ended::WorkerFailed(msg) = ended {
            return Err(EngineError::Worker(msg));
        }

        let status = match coordinator.reason() {
            Some(ShutdownReason::CredentialFound(pair)) => RunStatus::CredentialFound(pair),
            _ if matches!(ended, Ended::Drained) => RunStatus::Exhausted,
            _ => RunStatus::Cancelled,
        };
        info!(?status, "run finished");

        Ok(RunSummary {
            status,
            stats: stats.snapshot(),
            top_errors: stats.top_errors(TOP_ERRORS),
            elapsed: started.elapsed(),
        })
    }
}

fn describe(e: &JoinError) -> String {
    if e.is_cancelled() {
        "task cancelled".to_string()
    } else {
        format!("task panicked: {}", e)
    }
}
