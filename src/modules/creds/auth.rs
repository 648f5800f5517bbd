use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use crate::config::{Target, Timeouts};
use crate::modules::creds::pair::{CredentialPair, Outcome, OutcomeKind};

/// What the remote service said about one credential pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptResult {
    Authenticated,
    Rejected,
    /// Unreachable, timed out, reset.
    NetworkFailure(String),
    /// Handshake or protocol failure unrelated to the credentials.
    ProtocolFailure(String),
}

/// The authentication backend. Implementations own their connection for the
/// duration of one call; dropping the returned future must release it.
pub trait AuthCapability: Send + Sync + 'static {
    fn attempt(
        &self,
        target: &Target,
        pair: &CredentialPair,
        timeouts: Timeouts,
    ) -> impl Future<Output = AttemptResult> + Send;
}

/// Map a backend result onto the outcome taxonomy.
pub fn classify(pair: CredentialPair, result: AttemptResult) -> Outcome {
    match result {
        AttemptResult::Authenticated => Outcome::new(pair, OutcomeKind::Success, "authenticated"),
        AttemptResult::Rejected => Outcome::new(pair, OutcomeKind::AuthRejected, "rejected"),
        AttemptResult::NetworkFailure(detail) => {
            Outcome::new(pair, OutcomeKind::ConnectionFailed, detail)
        }
        AttemptResult::ProtocolFailure(detail) => {
            Outcome::new(pair, OutcomeKind::ProtocolError, detail)
        }
    }
}

/// Run one attempt bounded by the sum of the phase timeouts. A panic inside
/// the backend is contained here and reported as a protocol failure.
pub async fn bounded_attempt<A: AuthCapability>(
    capability: &A,
    target: &Target,
    pair: &CredentialPair,
    timeouts: Timeouts,
) -> AttemptResult {
    let attempt = AssertUnwindSafe(capability.attempt(target, pair, timeouts)).catch_unwind();
    match tokio::time::timeout(timeouts.total(), attempt).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            AttemptResult::ProtocolFailure(format!("attempt panicked: {}", msg))
        }
        Err(_) => AttemptResult::NetworkFailure(format!(
            "attempt timed out after {:?}",
            timeouts.total()
        )),
    }
}
