//! The producer/consumer credential pipeline.
//!
//! `source` -> `producer` -> `queue` -> `worker` -> (`report`, `coordinator`),
//! driven by `engine`.

pub mod auth;
pub mod coordinator;
pub mod engine;
pub mod pair;
pub mod producer;
pub mod queue;
pub mod report;
pub mod source;
pub mod ssh;
pub mod stats;
pub mod worker;
