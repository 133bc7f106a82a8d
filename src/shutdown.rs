use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Flips the returned receiver to `true` on Ctrl+C (or SIGTERM on unix).
#[must_use]
pub fn signal_shutdown() -> (watch::Receiver<bool>, JoinHandle<()>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received");
        if shutdown_tx.send(true).is_err() {
            warn!("Shutdown signal arrived after every listener stopped");
        }
    });
    (shutdown_rx, handle)
}

/// Resolves once `shutdown` turns true. Never resolves if the signal task is
/// gone without having fired.
pub async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            break;
        }
    }
    std::future::pending::<()>().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    let mut term_signal = match signal(SignalKind::terminate()) {
        Ok(signal) => Some(signal),
        Err(err) => {
            warn!("Failed to install SIGTERM handler: {}", err);
            None
        }
    };
    match term_signal.as_mut() {
        Some(term) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => log_ctrl_c_error(result),
                _ = term.recv() => {}
            }
        }
        None => log_ctrl_c_error(tokio::signal::ctrl_c().await),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    log_ctrl_c_error(tokio::signal::ctrl_c().await);
}

fn log_ctrl_c_error(result: std::io::Result<()>) {
    if let Err(err) = result {
        warn!("Failed to listen for Ctrl+C: {}", err);
    }
}
