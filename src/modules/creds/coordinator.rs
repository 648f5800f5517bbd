use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::modules::creds::pair::{CredentialPair, Outcome};
use crate::modules::creds::report::ResultReporter;

/// Why a run stopped before exhausting its work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    CredentialFound(CredentialPair),
    /// Operator request (signal) or an explicit call.
    Cancelled,
    SourceUnavailable,
}

struct Shared {
    stopping: AtomicBool,
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
    tasks: Mutex<Vec<AbortHandle>>,
    /// Serializes outcome publication against the start of shutdown.
    gate: Mutex<()>,
}

/// Run-wide stop state plus the set of producer/consumer tasks.
///
/// Cloning is cheap; every clone refers to the same run. The stop flag only
/// ever goes from `false` to `true`.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                stopping: AtomicBool::new(false),
                token: CancellationToken::new(),
                reason: OnceLock::new(),
                tasks: Mutex::new(Vec::new()),
                gate: Mutex::new(()),
            }),
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.stopping.load(Ordering::Acquire)
    }

    /// Resolves once shutdown has been requested.
    pub async fn stopped(&self) {
        self.shared.token.cancelled().await
    }

    /// The reason given by the first successful `request_shutdown`.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.shared.reason.get().cloned()
    }

    /// Register a task so the shutdown protocol can abort it. A task
    /// registered after shutdown is aborted right away.
    pub fn track(&self, handle: AbortHandle) {
        let mut tasks = self.lock_tasks();
        if self.is_stopping() {
            handle.abort();
        } else {
            tasks.push(handle);
        }
    }

    /// Start the shutdown protocol. Only the first call has any effect and
    /// returns `true`; later or concurrent calls return `false`.
    ///
    /// Order: raise the stop flag, abort every tracked task, then cancel the
    /// token that the run driver waits on. Needs no running runtime.
    pub fn request_shutdown(&self, reason: ShutdownReason) -> bool {
        let _gate = self.lock_gate();
        self.initiate(reason)
    }

    /// Hand `outcome` to `reporter` unless shutdown has begun, and start
    /// shutdown right away when it is a success. Both happen under one lock,
    /// so nothing is reported once the stop flag is up.
    ///
    /// Returns whether the outcome was reported. `reporter` must not call
    /// back into [`Coordinator::request_shutdown`].
    pub fn publish(&self, outcome: &Outcome, reporter: &dyn ResultReporter) -> bool {
        let _gate = self.lock_gate();
        if self.is_stopping() {
            return false;
        }
        reporter.report(outcome);
        if outcome.is_success() {
            self.initiate(ShutdownReason::CredentialFound(outcome.pair.clone()));
        }
        true
    }

    fn initiate(&self, reason: ShutdownReason) -> bool {
        if self
            .shared
            .stopping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        debug!(?reason, "shutdown requested");
        let _ = self.shared.reason.set(reason);

        let tasks = std::mem::take(&mut *self.lock_tasks());
        for task in &tasks {
            task.abort();
        }
        debug!(aborted = tasks.len(), "tracked tasks cancelled");

        self.shared.token.cancel();
        true
    }

    fn lock_gate(&self) -> std::sync::MutexGuard<'_, ()> {
        self.shared.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<AbortHandle>> {
        self.shared.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }
}
