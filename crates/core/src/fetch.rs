use tracing::info;

use crate::downloaders::{Downloader, FetchError, Snapshot, SnapshotRequest};
use crate::retry::{retry, RetryError, RetryPolicy};

/// Mirror `request` with `downloader`, retrying failed snapshots per `policy`.
///
/// Each retry is a fresh snapshot call; files that finished on an earlier
/// attempt are left to the downloader to skip.
pub async fn snapshot_with_retry(
    downloader: &dyn Downloader,
    request: &SnapshotRequest,
    policy: &RetryPolicy,
) -> Result<Snapshot, RetryError<FetchError>> {
    retry(policy, |attempt| async move {
        info!(
            "Downloading {} to {} (attempt {}/{})",
            request.repo_id,
            request.local_dir.display(),
            attempt,
            policy.max_attempts()
        );
        downloader.snapshot(request).await
    })
    .await
}
