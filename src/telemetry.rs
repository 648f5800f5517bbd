use tracing_subscriber::EnvFilter;

/// Install the stderr diagnostics subscriber. `RUST_LOG` wins when set;
/// otherwise only warnings, or this crate's debug events when `verbose`.
/// Calling it again is a no-op.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "warn,credforce=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
