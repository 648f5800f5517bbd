use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::RunConfig;
use crate::modules::creds::auth::{bounded_attempt, classify, AuthCapability};
use crate::modules::creds::coordinator::Coordinator;
use crate::modules::creds::pair::CredentialPair;
use crate::modules::creds::queue::WorkQueue;
use crate::modules::creds::report::ResultReporter;
use crate::modules::creds::stats::RunStats;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Attempting,
    Stopped,
}

/// Everything one consumer task needs; cheap to clone per worker.
pub struct WorkerContext<A> {
    pub id: usize,
    pub config: Arc<RunConfig>,
    pub capability: Arc<A>,
    pub queue: Arc<WorkQueue<CredentialPair>>,
    pub coordinator: Coordinator,
    pub reporter: Arc<dyn ResultReporter>,
    pub stats: Arc<RunStats>,
}

impl<A> Clone for WorkerContext<A> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            config: Arc::clone(&self.config),
            capability: Arc::clone(&self.capability),
            queue: Arc::clone(&self.queue),
            coordinator: self.coordinator.clone(),
            reporter: Arc::clone(&self.reporter),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Consumer loop: one attempt per pair taken from the queue until the queue
/// closes or shutdown begins. Returns the number of attempts that finished.
///
/// A pair whose attempt is interrupted by shutdown is dropped, not requeued.
pub async fn consume<A: AuthCapability>(ctx: WorkerContext<A>) -> usize {
    let WorkerContext {
        id,
        config,
        capability,
        queue,
        coordinator,
        reporter,
        stats,
    } = ctx;

    let mut state = WorkerState::Idle;
    let mut attempts = 0usize;
    debug!(worker = id, "worker started");

    while !coordinator.is_stopping() {
        let pair = tokio::select! {
            biased;
            _ = coordinator.stopped() => break,
            item = queue.get() => match item {
                Some(pair) => pair,
                None => break,
            },
        };

        state = WorkerState::Attempting;
        trace!(worker = id, user = %pair.username, "attempting");
        let result = tokio::select! {
            biased;
            _ = coordinator.stopped() => {
                debug!(worker = id, "attempt abandoned on shutdown");
                break;
            }
            result = bounded_attempt(&*capability, &config.target, &pair, config.timeouts) => result,
        };
        attempts += 1;

        let outcome = classify(pair, result);
        let published = coordinator.publish(&outcome, &*reporter);
        if published {
            stats.record(&outcome);
        }
        if let Err(e) = queue.mark_done() {
            warn!(worker = id, error = %e, "queue acknowledgement failed");
        }
        if !published || outcome.is_success() {
            break;
        }
        state = WorkerState::Idle;

        if config.attempt_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                biased;
                _ = coordinator.stopped() => break,
                _ = tokio::time::sleep(config.attempt_delay) => {}
            }
        }
    }

    debug!(worker = id, attempts, from = ?state, "worker stopped");
    attempts
}
