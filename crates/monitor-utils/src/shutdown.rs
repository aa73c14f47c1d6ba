use anyhow::Context;
use tokio::{
    sync::broadcast,
    task::JoinHandle,
};
use tracing::{
    error,
    info,
};

/// Process signal that asked for a graceful stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Terminate,
    Interrupt,
}

/// Resolves with the first SIGTERM or SIGINT (Ctrl+C elsewhere).
///
/// # Errors
///
/// Returns an error if a signal handler cannot be installed.
pub async fn wait_for_shutdown_signal() -> anyhow::Result<ShutdownSignal> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{
            SignalKind,
            signal,
        };

        let mut terminate =
            signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
        let mut interrupt =
            signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

        Ok(tokio::select! {
            _ = terminate.recv() => ShutdownSignal::Terminate,
            _ = interrupt.recv() => ShutdownSignal::Interrupt,
        })
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for ctrl-c")?;
        Ok(ShutdownSignal::Interrupt)
    }
}

/// Broadcast on `shutdown_tx` once a shutdown signal arrives.
///
/// The listener sends on its own clone, so the channel stays open for as long
/// as the caller holds `shutdown_tx`, even if no handler could be installed.
pub fn spawn_shutdown_listener(shutdown_tx: &broadcast::Sender<()>) -> JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(signal) => {
                info!(signal = ?signal, "Shutdown signal received");
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                error!(
                    error = ?e,
                    "Unable to listen for shutdown signals, the process must be killed to stop"
                );
            }
        }
    })
}
