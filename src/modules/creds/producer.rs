use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::config::ProducerMode;
use crate::error::EngineError;
use crate::modules::creds::coordinator::{Coordinator, ShutdownReason};
use crate::modules::creds::pair::CredentialPair;
use crate::modules::creds::queue::WorkQueue;
use crate::modules::creds::source::CredentialSource;

/// Which part of the username space one producer walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slice {
    pub index: usize,
    pub count: usize,
    pub mode: ProducerMode,
}

impl Slice {
    pub fn full() -> Self {
        Self {
            index: 0,
            count: 1,
            mode: ProducerMode::Duplicate,
        }
    }

    fn owns(&self, username_index: usize) -> bool {
        match self.mode {
            ProducerMode::Duplicate => true,
            ProducerMode::Partition => username_index % self.count.max(1) == self.index,
        }
    }
}

/// First fatal error raised by any producer of a run.
pub type FatalSlot = Arc<Mutex<Option<EngineError>>>;

/// Push `usernames x passwords` onto `queue`, usernames outer, passwords
/// reopened for every username. Returns the number of pairs pushed.
///
/// Stops early, without error, once shutdown begins or the queue closes.
pub async fn produce<S>(
    source: &S,
    queue: &WorkQueue<CredentialPair>,
    coordinator: &Coordinator,
    slice: Slice,
) -> Result<usize, EngineError>
where
    S: CredentialSource + ?Sized,
{
    source.check()?;

    let mut pushed = 0usize;
    for (index, username) in source.usernames()?.enumerate() {
        let username = username?;
        if !slice.owns(index) {
            continue;
        }

        for password in source.passwords()? {
            if coordinator.is_stopping() {
                return Ok(pushed);
            }
            let pair = CredentialPair::new(username.clone(), password?);
            tokio::select! {
                biased;
                _ = coordinator.stopped() => return Ok(pushed),
                res = queue.put(pair) => match res {
                    Ok(()) => pushed += 1,
                    Err(_) => return Ok(pushed),
                },
            }
        }
    }
    Ok(pushed)
}

/// Task body for one producer: runs [`produce`] and turns a source failure
/// into a run-level abort.
pub async fn run_producer<S>(
    source: Arc<S>,
    queue: Arc<WorkQueue<CredentialPair>>,
    coordinator: Coordinator,
    slice: Slice,
    fatal: FatalSlot,
) where
    S: CredentialSource + ?Sized,
{
    debug!(producer = slice.index, "producer started");
    match produce(&*source, &queue, &coordinator, slice).await {
        Ok(pushed) => debug!(producer = slice.index, pushed, "producer finished"),
        Err(e) => {
            error!(producer = slice.index, error = %e, "credential source failed");
            {
                let mut slot = fatal.lock().unwrap_or_else(|p| p.into_inner());
                if slot.is_none() {
                    *slot = Some(e);
                }
            }
            coordinator.request_shutdown(ShutdownReason::SourceUnavailable);
        }
    }
}
