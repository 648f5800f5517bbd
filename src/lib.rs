//! Concurrent credential-testing engine.
//!
//! Producers stream the username x password cross product into a bounded
//! [`WorkQueue`], a pool of workers runs one authentication attempt per pair
//! through an [`AuthCapability`], and a [`Coordinator`] stops every task as
//! soon as a valid pair is found or the run is cancelled.

pub mod cli;
pub mod config;
pub mod error;
pub mod modules;
pub mod signals;
pub mod telemetry;
pub mod utils;

pub use config::{ProducerMode, RunConfig, Target, Timeouts};
pub use error::EngineError;
pub use modules::creds::auth::{AttemptResult, AuthCapability};
pub use modules::creds::coordinator::{Coordinator, ShutdownReason};
pub use modules::creds::engine::{Engine, RunStatus, RunSummary};
pub use modules::creds::pair::{CredentialPair, Outcome, OutcomeKind};
pub use modules::creds::queue::{QueueError, WorkQueue};
pub use modules::creds::report::{ConsoleReporter, ResultReporter};
pub use modules::creds::source::{CredentialSource, FileSource, StaticSource};
pub use modules::creds::stats::RunStats;
pub use modules::creds::ssh::SshCapability;
