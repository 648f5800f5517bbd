use colored::*;
use std::io;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::modules::creds::coordinator::{Coordinator, ShutdownReason};

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
pub async fn wait_for_termination() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = hangup.recv() => "SIGHUP",
        _ = terminate.recv() => "SIGTERM",
    };
    Ok(name)
}

#[cfg(not(unix))]
pub async fn wait_for_termination() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}

/// Turn the first termination signal into exactly one shutdown request.
/// The listener exits on its own once the run stops for any other reason.
pub fn shutdown_on_signal(coordinator: Coordinator) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = coordinator.stopped() => {}
            received = wait_for_termination() => match received {
                Ok(name) => {
                    println!("{}", format!("[*] Received exit signal {}", name).yellow());
                    coordinator.request_shutdown(ShutdownReason::Cancelled);
                }
                Err(e) => warn!(error = %e, "could not install signal handlers"),
            },
        }
    })
}
