use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleep for one tick. Returns `true` when the quit signal fired first, in
/// which case the caller must stop without finishing the wait.
pub async fn wait_tick(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
