use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::{ProducerMode, RunConfig, Target, Timeouts};
use crate::modules::creds::auth::AuthCapability;
use crate::modules::creds::engine::{Engine, RunSummary};
use crate::modules::creds::report::{save_result, ConsoleReporter};
use crate::modules::creds::source::FileSource;
use crate::signals::shutdown_on_signal;
use crate::telemetry::init_tracing;

/// Concurrent credential tester for a single host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target IP or hostname (optionally host:port)
    #[arg(short = 'i', long = "ip")]
    pub host: String,

    /// Service port
    #[arg(short, long, default_value_t = crate::config::DEFAULT_PORT)]
    pub port: u16,

    /// Number of producers reading the wordlists
    #[arg(long = "nprod", default_value_t = crate::config::DEFAULT_PRODUCERS)]
    pub producers: usize,

    /// Number of consumers attempting logins
    #[arg(long = "ncon", default_value_t = crate::config::DEFAULT_CONSUMERS)]
    pub consumers: usize,

    /// Single username, replaces the usernames file
    #[arg(short = 'u', long = "user")]
    pub username: Option<String>,

    /// Usernames file, one per line
    #[arg(short = 'U', long, alias = "users_file", env = "USERS_FILE")]
    pub users_file: Option<PathBuf>,

    /// Passwords file, one per line
    #[arg(short = 'P', long, alias = "passwords_file", env = "PASSWORDS_FILE")]
    pub passwords_file: Option<PathBuf>,

    /// Connect timeout in seconds
    #[arg(short = 't', long = "timeout", default_value_t = crate::config::DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout: u64,

    /// Banner timeout in seconds
    #[arg(long, alias = "banner_timeout", default_value_t = crate::config::DEFAULT_BANNER_TIMEOUT_SECS)]
    pub banner_timeout: u64,

    /// Authentication timeout in seconds
    #[arg(long, alias = "auth_timeout", default_value_t = crate::config::DEFAULT_AUTH_TIMEOUT_SECS)]
    pub auth_timeout: u64,

    /// Pending pairs held in memory (0 = unbounded)
    #[arg(long, default_value_t = crate::config::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Split usernames between producers instead of each walking all of them
    #[arg(long)]
    pub partition: bool,

    /// Pause between attempts of one worker, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,

    /// Show error details and debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,

    /// Save a found credential to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> Result<RunConfig> {
        let target = Target::parse(&self.host, self.port).context("Invalid target address")?;

        let mut config = RunConfig::new(target);
        config.username = self.username;
        config.users_file = self.users_file;
        config.passwords_file = self.passwords_file;
        config.producers = self.producers;
        config.consumers = self.consumers;
        config.timeouts =
            Timeouts::from_secs(self.connect_timeout, self.banner_timeout, self.auth_timeout);
        config.queue_capacity = self.queue_capacity;
        config.producer_mode = if self.partition {
            ProducerMode::Partition
        } else {
            ProducerMode::Duplicate
        };
        config.attempt_delay = Duration::from_millis(self.delay_ms);
        config.verbose = self.verbose;
        config.output = self.output;

        config.validate()?;
        Ok(config)
    }
}

/// Load `KEY=value` pairs from `path` into the process environment without
/// overriding variables that are already set. Returns `false` when the file
/// does not exist.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to load '{}'", path.display())),
    }
}

/// Full command-line flow around the engine: wordlists, colored output,
/// signal handling, summary and optional result file.
pub async fn run<A: AuthCapability>(cli: Cli, capability: A) -> Result<RunSummary> {
    let started = Instant::now();
    init_tracing(cli.verbose);

    let config = cli.into_config()?;
    let source = FileSource::from_config(&config)?;
    let reporter = ConsoleReporter::new(config.target.clone(), config.verbose);
    let summary_printer = ConsoleReporter::new(config.target.clone(), config.verbose);
    let target = config.target.clone();
    let output = config.output.clone();

    println!("{}", format!("[*] Target: {}", target).cyan());
    let engine = Engine::new(config, capability)?.with_reporter(reporter);
    let listener = shutdown_on_signal(engine.coordinator());

    let summary = engine.run(source).await;
    listener.abort();
    let summary = summary.context("Run aborted")?;

    summary_printer.print_final(&summary);
    if let (Some(path), Some(pair)) = (output.as_deref(), summary.found()) {
        save_result(path, &target, pair)?;
        println!("{}", format!("[+] Results saved to '{}'", path.display()).green());
    }
    println!(
        "{}",
        format!("[*] Executed in {:.2} seconds.", started.elapsed().as_secs_f64()).cyan()
    );
    Ok(summary)
}
