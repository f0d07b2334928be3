use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel the returned token on SIGTERM or SIGINT.
///
/// The listener, failure detector and status API all stop when the token
/// fires. If SIGTERM cannot be hooked, Ctrl-C alone still works.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM, stopping node");
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received SIGINT, stopping node");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for SIGINT only");
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Failed to install SIGINT handler");
                    return;
                }
                tracing::info!("Received SIGINT, stopping node");
            }
        }

        trigger.cancel();
    });

    token
}
