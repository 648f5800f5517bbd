//! End-to-end runs of the producer/consumer pipeline against scripted backends.

use credforce::{
    AttemptResult, AuthCapability, CredentialPair, EngineError, Engine, FileSource, Outcome,
    OutcomeKind, ProducerMode, RunConfig, RunStatus, ShutdownReason, StaticSource, Target,
    Timeouts,
};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy)]
enum Backend {
    /// Accepts only the configured password.
    Accepting,
    Unreachable,
    Panicking,
    Slow(Duration),
}

struct Scripted {
    backend: Backend,
    valid: Option<CredentialPair>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn new(backend: Backend, valid: Option<CredentialPair>) -> Self {
        Self {
            backend,
            valid,
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl AuthCapability for Scripted {
    async fn attempt(&self, _: &Target, pair: &CredentialPair, _: Timeouts) -> AttemptResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.backend {
            Backend::Unreachable => {
                return AttemptResult::NetworkFailure("connection refused".into())
            }
            Backend::Panicking if pair.password == "boom" => panic!("backend bug"),
            Backend::Slow(delay) => tokio::time::sleep(delay).await,
            _ => {}
        }
        if self.valid.as_ref() == Some(pair) {
            AttemptResult::Authenticated
        } else {
            AttemptResult::Rejected
        }
    }
}

fn config(producers: usize, consumers: usize) -> RunConfig {
    let mut cfg = RunConfig::new(Target::new("192.0.2.10", 22));
    cfg.producers = producers;
    cfg.consumers = consumers;
    cfg.timeouts = Timeouts {
        connect: Duration::from_secs(1),
        banner: Duration::from_secs(1),
        auth: Duration::from_secs(1),
    };
    cfg
}

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect()
}

type Log = Arc<Mutex<Vec<Outcome>>>;

fn recorder() -> (Log, impl Fn(&Outcome) + Send + Sync + 'static) {
    let log: Log = Arc::default();
    let sink = Arc::clone(&log);
    (log, move |o: &Outcome| sink.lock().unwrap().push(o.clone()))
}

#[tokio::test]
async fn exhaustion_reports_every_pair_once() {
    let backend = Scripted::new(Backend::Accepting, None);
    let calls = backend.calls();
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 1), backend)
        .unwrap()
        .with_reporter(reporter);

    let summary = engine
        .run(StaticSource::new(names("user", 3), names("pass", 4)))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Exhausted);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 12);
    assert!(log.iter().all(|o| o.kind == OutcomeKind::AuthRejected));
    // One producer and one consumer keep generation order.
    assert_eq!(log[0].pair, CredentialPair::new("user0", "pass0"));
    assert_eq!(log[4].pair, CredentialPair::new("user1", "pass0"));
    assert_eq!(log[11].pair, CredentialPair::new("user2", "pass3"));
    assert_eq!(summary.stats.total, 12);
    assert_eq!(calls.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn wrong_then_right_password() {
    let backend = Scripted::new(
        Backend::Accepting,
        Some(CredentialPair::new("admin", "right")),
    );
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 1), backend).unwrap().with_reporter(reporter);

    let summary = engine
        .run(StaticSource::new(["admin"], ["wrong", "right"]))
        .await
        .unwrap();

    let log = log.lock().unwrap();
    let got: Vec<(OutcomeKind, String)> =
        log.iter().map(|o| (o.kind, o.pair.password.clone())).collect();
    assert_eq!(
        got,
        vec![
            (OutcomeKind::AuthRejected, "wrong".to_string()),
            (OutcomeKind::Success, "right".to_string()),
        ]
    );
    assert_eq!(summary.found(), Some(&CredentialPair::new("admin", "right")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_valid_pair_ends_run_with_one_success() {
    let valid = CredentialPair::new("user7", "pass13");
    let backend = Scripted::new(
        Backend::Slow(Duration::from_millis(1)),
        Some(valid.clone()),
    );
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 8), backend)
        .unwrap()
        .with_reporter(reporter);

    let summary = engine
        .run(StaticSource::new(names("user", 20), names("pass", 20)))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::CredentialFound(valid.clone()));
    let log = log.lock().unwrap();
    let successes: Vec<&Outcome> = log.iter().filter(|o| o.is_success()).collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].pair, valid);
    assert!(log.last().unwrap().is_success(), "nothing is reported after the success");
    assert!(log.len() < 400);
    assert_eq!(summary.stats.total as usize, log.len());
}

#[tokio::test]
async fn empty_sources_terminate_cleanly() {
    for source in [
        StaticSource::new(Vec::<String>::new(), names("pass", 3)),
        StaticSource::new(names("user", 3), Vec::<String>::new()),
    ] {
        let backend = Scripted::new(Backend::Accepting, None);
        let calls = backend.calls();
        let (log, reporter) = recorder();
        let engine = Engine::new(config(2, 4), backend)
            .unwrap()
            .with_reporter(reporter);

        let summary = tokio::time::timeout(Duration::from_secs(5), engine.run(source))
            .await
            .expect("run terminates")
            .unwrap();
        assert_eq!(summary.status, RunStatus::Exhausted);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_host_drains_everything() {
    let backend = Scripted::new(Backend::Unreachable, None);
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 4), backend).unwrap().with_reporter(reporter);

    let summary = engine
        .run(StaticSource::new(names("user", 5), names("pass", 6)))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Exhausted);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 30);
    assert!(log.iter().all(|o| o.kind == OutcomeKind::ConnectionFailed));
    assert_eq!(summary.stats.connection_failures, 30);
    assert_eq!(summary.top_errors, vec![("connection refused".to_string(), 30)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn consumers_never_share_a_pair() {
    let backend = Scripted::new(Backend::Accepting, None);
    let (log, reporter) = recorder();
    let mut cfg = config(3, 8);
    cfg.producer_mode = ProducerMode::Partition;
    cfg.queue_capacity = 4;
    let engine = Engine::new(cfg, backend).unwrap().with_reporter(reporter);

    engine
        .run(StaticSource::new(names("user", 25), names("pass", 40)))
        .await
        .unwrap();

    let log = log.lock().unwrap();
    let unique: HashSet<&CredentialPair> = log.iter().map(|o| &o.pair).collect();
    assert_eq!(log.len(), 1000);
    assert_eq!(unique.len(), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn duplicate_mode_walks_space_once_per_producer() {
    let backend = Scripted::new(Backend::Accepting, None);
    let (log, reporter) = recorder();
    let engine = Engine::new(config(2, 4), backend).unwrap().with_reporter(reporter);

    engine
        .run(StaticSource::new(names("user", 4), names("pass", 5)))
        .await
        .unwrap();

    let log = log.lock().unwrap();
    let unique: HashSet<&CredentialPair> = log.iter().map(|o| &o.pair).collect();
    assert_eq!(log.len(), 40);
    assert_eq!(unique.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_concurrent_shutdown_is_harmless() {
    let backend = Scripted::new(Backend::Slow(Duration::from_millis(5)), None);
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 4), backend).unwrap().with_reporter(reporter);
    let coordinator = engine.coordinator();

    let run = tokio::spawn(engine.run(StaticSource::new(names("user", 50), names("pass", 50))));
    tokio::time::sleep(Duration::from_millis(30)).await;

    let mut requests = Vec::new();
    for _ in 0..16 {
        let c = coordinator.clone();
        requests.push(tokio::spawn(async move { c.request_shutdown(ShutdownReason::Cancelled) }));
    }
    let mut initiated = 0;
    for r in requests {
        if r.await.unwrap() {
            initiated += 1;
        }
    }
    assert_eq!(initiated, 1);

    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("run stops promptly")
        .unwrap()
        .unwrap();
    assert_eq!(summary.status, RunStatus::Cancelled);

    let reported = log.lock().unwrap().len();
    assert!(reported < 2500);
    assert_eq!(summary.stats.total as usize, reported);
    // A late request changes nothing.
    assert!(!coordinator.request_shutdown(ShutdownReason::Cancelled));
    assert_eq!(log.lock().unwrap().len(), reported);
}

#[tokio::test]
async fn cancellation_before_start_does_no_work() {
    let backend = Scripted::new(Backend::Accepting, None);
    let calls = backend.calls();
    let engine = Engine::new(config(1, 2), backend).unwrap();
    engine.coordinator().request_shutdown(ShutdownReason::Cancelled);

    let summary = engine
        .run(StaticSource::new(names("user", 5), names("pass", 5)))
        .await
        .unwrap();
    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panicking_backend_is_a_protocol_error() {
    let backend = Scripted::new(
        Backend::Panicking,
        Some(CredentialPair::new("root", "toor")),
    );
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 1), backend).unwrap().with_reporter(reporter);

    let summary = engine
        .run(StaticSource::new(["root"], ["boom", "toor"]))
        .await
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log[0].kind, OutcomeKind::ProtocolError);
    assert!(log[0].detail.contains("backend bug"));
    assert_eq!(log[1].kind, OutcomeKind::Success);
    assert!(matches!(summary.status, RunStatus::CredentialFound(_)));
}

#[tokio::test]
async fn missing_wordlist_aborts_before_any_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let users = dir.path().join("users.txt");
    fs::write(&users, "root\nadmin\n").unwrap();
    let source = FileSource::new(&users, dir.path().join("missing.txt"));

    let backend = Scripted::new(Backend::Accepting, None);
    let calls = backend.calls();
    let engine = Engine::new(config(2, 2), backend).unwrap();
    let coordinator = engine.coordinator();

    let err = engine.run(source).await.unwrap_err();
    assert!(matches!(err, EngineError::SourceUnavailable { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.reason(), Some(ShutdownReason::SourceUnavailable));
}

#[tokio::test]
async fn file_wordlists_drive_a_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let users = dir.path().join("users.txt");
    let passwords = dir.path().join("passwords.txt");
    fs::write(&users, "guest\n\n admin \n").unwrap();
    fs::write(&passwords, "123456\nletmein\n").unwrap();

    let backend = Scripted::new(
        Backend::Accepting,
        Some(CredentialPair::new("admin", "letmein")),
    );
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 1), backend).unwrap().with_reporter(reporter);

    let summary = engine.run(FileSource::new(&users, &passwords)).await.unwrap();
    assert_eq!(summary.found(), Some(&CredentialPair::new("admin", "letmein")));
    assert_eq!(log.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn undecodable_password_line_does_not_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let passwords = dir.path().join("passwords.txt");
    fs::write(&passwords, b"a\nb\ncaf\xe9\nd\ne\n").unwrap();

    let backend = Scripted::new(Backend::Accepting, None);
    let (log, reporter) = recorder();
    let engine = Engine::new(config(1, 1), backend).unwrap().with_reporter(reporter);

    let summary = engine
        .run(FileSource::with_username("root", &passwords))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Exhausted);
    let tried: Vec<String> = log
        .lock()
        .unwrap()
        .iter()
        .map(|o| o.pair.password.clone())
        .collect();
    assert_eq!(tried, vec!["a", "b", "caf\u{FFFD}", "d", "e"]);
}
