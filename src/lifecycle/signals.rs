//! OS signal handling.
//!
//! SIGTERM, SIGINT and SIGHUP (Ctrl+C on non-unix platforms) all trigger a
//! graceful shutdown.

use std::io;

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Wait for a termination signal and return its name.
#[cfg(unix)]
pub async fn wait_for_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut hup = signal(SignalKind::hangup())?;

    Ok(tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = int.recv() => "SIGINT",
        _ = hup.recv() => "SIGHUP",
    })
}

/// Wait for a termination signal and return its name.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl_c")
}

/// Trigger `shutdown` when a termination signal arrives.
///
/// The task ends on its own if shutdown is triggered by another source.
pub fn install(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = wait_for_signal() => match res {
                Ok(signal) => {
                    shutdown.trigger(signal);
                }
                Err(e) => tracing::error!(error = %e, "Failed to install signal handlers"),
            },
            _ = shutdown.triggered() => {}
        }
    })
}
