use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::modules::creds::pair::{Outcome, OutcomeKind};

/// Attempt counters for one run, updated by every worker. Recording never
/// awaits.
pub struct RunStats {
    total_attempts: AtomicU64,
    successful_attempts: AtomicU64,
    rejected_attempts: AtomicU64,
    connection_failures: AtomicU64,
    protocol_errors: AtomicU64,
    start_time: Instant,
    unique_errors: Mutex<HashMap<String, usize>>,
}

/// Point-in-time copy of [`RunStats`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub successful: u64,
    pub rejected: u64,
    pub connection_failures: u64,
    pub protocol_errors: u64,
    pub elapsed: Duration,
}

impl StatsSnapshot {
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            total_attempts: AtomicU64::new(0),
            successful_attempts: AtomicU64::new(0),
            rejected_attempts: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            start_time: Instant::now(),
            unique_errors: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome.kind {
            OutcomeKind::Success => &self.successful_attempts,
            OutcomeKind::AuthRejected => &self.rejected_attempts,
            OutcomeKind::ConnectionFailed => &self.connection_failures,
            OutcomeKind::ProtocolError => &self.protocol_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if matches!(
            outcome.kind,
            OutcomeKind::ConnectionFailed | OutcomeKind::ProtocolError
        ) {
            let mut guard = self.unique_errors.lock().unwrap_or_else(|e| e.into_inner());
            *guard.entry(outcome.detail.clone()).or_insert(0) += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total_attempts.load(Ordering::Relaxed),
            successful: self.successful_attempts.load(Ordering::Relaxed),
            rejected: self.rejected_attempts.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Most frequent error details, most common first.
    pub fn top_errors(&self, limit: usize) -> Vec<(String, usize)> {
        let guard = self.unique_errors.lock().unwrap_or_else(|e| e.into_inner());
        let mut sorted: Vec<(String, usize)> =
            guard.iter().map(|(msg, count)| (msg.clone(), *count)).collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sorted.truncate(limit);
        sorted
    }
}
