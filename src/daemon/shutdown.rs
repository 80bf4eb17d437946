use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels the token on Ctrl+C, or returns early if something else already cancelled it.
///
/// On Windows detached processes can't detect signals sent to them, so `daybook daemon stop`
/// terminates the process instead.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt, shutting down");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
