use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::EngineError;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_PRODUCERS: usize = 1;
pub const DEFAULT_CONSUMERS: usize = 4;
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BANNER_TIMEOUT_SECS: u64 = 50;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

static TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[*(?P<addr>[^\]]+?)\]*(?::(?P<port>\d{1,5}))?$").expect("static target regex")
});

/// Host and port of the single service under test.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6]`, `[v6]:port` or a bare IPv6 address.
    /// An explicit port in `input` wins over `default_port`. No DNS lookup
    /// happens here; resolving is the capability's job.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, EngineError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EngineError::config("Target cannot be empty"));
        }

        // Bare IPv6 ("::1", "fe80::1") carries no port.
        if !trimmed.starts_with('[') && trimmed.matches(':').count() > 1 {
            return Ok(Self::new(trimmed, checked_port(default_port)?));
        }

        let caps = TARGET_RE
            .captures(trimmed)
            .ok_or_else(|| EngineError::config(format!("Invalid target format: {}", input)))?;
        let addr = caps
            .name("addr")
            .map(|m| m.as_str())
            .ok_or_else(|| EngineError::config(format!("Invalid target format: {}", input)))?;
        let port = match caps.name("port") {
            Some(m) => m
                .as_str()
                .parse::<u16>()
                .map_err(|_| EngineError::config(format!("Invalid port value in target '{}'", input)))?,
            None => default_port,
        };

        Ok(Self::new(addr, checked_port(port)?))
    }
}

fn checked_port(port: u16) -> Result<u16, EngineError> {
    if port == 0 {
        return Err(EngineError::config("Port must be between 1 and 65535"));
    }
    Ok(port)
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// The three phases of one authentication attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub banner: Duration,
    pub auth: Duration,
}

impl Timeouts {
    pub fn from_secs(connect: u64, banner: u64, auth: u64) -> Self {
        Self {
            connect: Duration::from_secs(connect),
            banner: Duration::from_secs(banner),
            auth: Duration::from_secs(auth),
        }
    }

    /// Upper bound for a whole attempt.
    pub fn total(&self) -> Duration {
        self.connect + self.banner + self.auth
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from_secs(
            DEFAULT_CONNECT_TIMEOUT_SECS,
            DEFAULT_BANNER_TIMEOUT_SECS,
            DEFAULT_AUTH_TIMEOUT_SECS,
        )
    }
}

/// How several producers share the username x password space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProducerMode {
    /// Every producer walks the full cross product.
    #[default]
    Duplicate,
    /// Producer `i` of `n` takes the usernames at positions `i`, `i + n`, ...
    Partition,
}

/// Immutable settings for one run, shared read-only by every task.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub target: Target,
    /// Single username that replaces the usernames file.
    pub username: Option<String>,
    pub users_file: Option<PathBuf>,
    pub passwords_file: Option<PathBuf>,
    pub producers: usize,
    pub consumers: usize,
    pub timeouts: Timeouts,
    /// Zero means unbounded.
    pub queue_capacity: usize,
    pub producer_mode: ProducerMode,
    /// Pause between two attempts of the same worker.
    pub attempt_delay: Duration,
    pub verbose: bool,
    /// Where a found credential is saved.
    pub output: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            username: None,
            users_file: None,
            passwords_file: None,
            producers: DEFAULT_PRODUCERS,
            consumers: DEFAULT_CONSUMERS,
            timeouts: Timeouts::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            producer_mode: ProducerMode::default(),
            attempt_delay: Duration::ZERO,
            verbose: false,
            output: None,
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.target.host.trim().is_empty() {
            return Err(EngineError::config("Target cannot be empty"));
        }
        if self.producers == 0 {
            return Err(EngineError::config("At least one producer is required"));
        }
        if self.consumers == 0 {
            return Err(EngineError::config("At least one consumer is required"));
        }
        let t = &self.timeouts;
        if t.connect.is_zero() || t.banner.is_zero() || t.auth.is_zero() {
            return Err(EngineError::config("Timeouts must be greater than zero"));
        }
        if matches!(&self.username, Some(u) if u.trim().is_empty()) {
            return Err(EngineError::config("Username override cannot be empty"));
        }
        Ok(())
    }
}
