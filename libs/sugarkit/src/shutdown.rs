//! Process shutdown signals bridged onto a [`CancellationToken`].

use std::future::Future;
use std::io;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Which signal ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    CtrlC,
    #[cfg(unix)]
    Sigterm,
}

/// Wait for SIGINT (Ctrl+C) or, on unix, SIGTERM.
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown() -> io::Result<ShutdownSignal> {
    #[cfg(unix)]
    let received = {
        // Installed before waiting so a failure surfaces immediately.
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res.map(|()| ShutdownSignal::CtrlC)?,
            _ = sigterm.recv() => ShutdownSignal::Sigterm,
        }
    };
    #[cfg(not(unix))]
    let received = {
        signal::ctrl_c().await?;
        ShutdownSignal::CtrlC
    };

    tracing::info!(signal = ?received, "Shutdown signal received, initiating graceful shutdown");
    Ok(received)
}

/// Cancel `token` on the first shutdown signal.
///
/// The task ends as soon as the token is cancelled by anyone. If the signal
/// handlers cannot be installed it falls back to plain Ctrl+C; if that fails
/// too, the token is cancelled and the task resolves to the install error.
pub fn cancel_on_signal(token: CancellationToken) -> JoinHandle<io::Result<()>> {
    cancel_when(token, wait_for_shutdown(), signal::ctrl_c())
}

pub(crate) fn cancel_when<W, F>(
    token: CancellationToken,
    waiter: W,
    fallback: F,
) -> JoinHandle<io::Result<()>>
where
    W: Future<Output = io::Result<ShutdownSignal>> + Send + 'static,
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let err = tokio::select! {
            () = token.cancelled() => return Ok(()),
            res = waiter => match res {
                Ok(_) => {
                    token.cancel();
                    return Ok(());
                }
                Err(e) => e,
            },
        };

        tracing::warn!(error = %err, "Signal handlers unavailable, falling back to Ctrl+C only");
        tokio::select! {
            () = token.cancelled() => Ok(()),
            res = fallback => {
                token.cancel();
                res.inspect_err(|e| {
                    tracing::error!(error = %e, "Cannot install any shutdown signal handler");
                })
            }
        }
    })
}
