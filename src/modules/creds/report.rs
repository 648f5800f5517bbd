use anyhow::{Context, Result};
use colored::*;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::Target;
use crate::modules::creds::engine::{RunStatus, RunSummary};
use crate::modules::creds::pair::{CredentialPair, Outcome, OutcomeKind};

/// Consumer of the outcome stream. Called by workers in emission order, so
/// implementations must be cheap and must not block.
pub trait ResultReporter: Send + Sync {
    fn report(&self, outcome: &Outcome);
}

impl<F> ResultReporter for F
where
    F: Fn(&Outcome) + Send + Sync,
{
    fn report(&self, outcome: &Outcome) {
        self(outcome)
    }
}

/// Discards every outcome.
pub struct Silent;

impl ResultReporter for Silent {
    fn report(&self, _outcome: &Outcome) {}
}

/// Colored one-line-per-attempt output on stdout.
pub struct ConsoleReporter {
    target: Target,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(target: Target, verbose: bool) -> Self {
        Self { target, verbose }
    }

    /// Plain (uncolored) text of the line printed for `outcome`.
    pub fn line(&self, outcome: &Outcome) -> String {
        let prefix = match outcome.kind {
            OutcomeKind::Success => "[+]",
            OutcomeKind::AuthRejected => "[-]",
            OutcomeKind::ConnectionFailed | OutcomeKind::ProtocolError => "[!]",
        };
        let mut line = format!(
            "{} {} -> {} : {:.<50} {}",
            prefix,
            self.target,
            outcome.pair.username,
            outcome.pair.password,
            outcome.kind.label()
        );
        if self.verbose && matches!(
            outcome.kind,
            OutcomeKind::ConnectionFailed | OutcomeKind::ProtocolError
        ) {
            line.push_str(&format!(" ({})", outcome.detail));
        }
        line
    }

    pub fn print_final(&self, summary: &RunSummary) {
        println!();
        match &summary.status {
            RunStatus::CredentialFound(pair) => println!(
                "{}",
                format!("[+] Valid credentials: {} -> {}", self.target, pair)
                    .green()
                    .bold()
            ),
            RunStatus::Exhausted => println!("{}", "[-] No credentials found.".yellow()),
            RunStatus::Cancelled => println!("{}", "[*] Run cancelled.".yellow()),
        }

        let stats = &summary.stats;
        println!("{}", "=== Statistics ===".bold());
        println!("  Total attempts:    {}", stats.total);
        println!("  Successful:        {}", stats.successful.to_string().green().bold());
        println!("  Rejected:          {}", stats.rejected);
        println!("  Connection errors: {}", stats.connection_failures.to_string().red());
        println!("  Protocol errors:   {}", stats.protocol_errors.to_string().red());
        println!("  Elapsed time:      {:.2}s", summary.elapsed.as_secs_f64());
        if stats.rate() > 0.0 {
            println!("  Average rate:      {:.1} attempts/s", stats.rate());
        }

        if !summary.top_errors.is_empty() {
            println!("\n{}", "Top Errors:".bold());
            for (msg, count) in &summary.top_errors {
                println!("  - {}: {}", msg.yellow(), count);
            }
        }
    }
}

impl ResultReporter for ConsoleReporter {
    fn report(&self, outcome: &Outcome) {
        let line = self.line(outcome);
        match outcome.kind {
            OutcomeKind::Success => println!("{}", line.green().bold()),
            OutcomeKind::AuthRejected => println!("{}", line),
            OutcomeKind::ConnectionFailed | OutcomeKind::ProtocolError => {
                println!("{}", line.red())
            }
        }
    }
}

/// Write a found credential as `host:port -> user:pass`, replacing the file.
pub fn save_result(path: &Path, target: &Target, pair: &CredentialPair) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("Failed to open output file '{}'", path.display()))?;
    writeln!(file, "{} -> {}", target, pair)
        .with_context(|| format!("Failed to write output file '{}'", path.display()))?;
    Ok(())
}
