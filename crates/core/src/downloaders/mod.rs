pub mod huggingface;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Config;
use crate::patterns::FilePatterns;

pub use huggingface::HuggingFaceDownloader;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("repository '{0}' not found (or revision missing)")]
    NotFound(String),

    #[error("access to '{0}' denied; set HF_TOKEN for gated or private repositories")]
    Unauthorized(String),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("no files in '{0}' match the allow/ignore patterns")]
    NoMatchingFiles(String),

    #[error("refusing to write remote path '{0}' outside the download directory")]
    InvalidPath(String),

    #[error("invalid hub endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything needed to mirror one repository revision.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub repo_id: String,
    pub revision: String,
    pub token: Option<String>,
    pub local_dir: PathBuf,
    pub patterns: FilePatterns,
}

impl SnapshotRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            repo_id: config.download.repo_id.clone(),
            revision: config.download.revision.clone(),
            token: config.download.token.clone(),
            local_dir: config.download.local_dir.clone(),
            patterns: config.patterns(),
        }
    }
}

/// Result of a completed snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub repo_id: String,
    pub revision: String,
    /// Commit the revision resolved to, when the hub reported one
    pub commit: Option<String>,
    pub local_dir: PathBuf,
    /// Repository-relative paths of every selected file
    pub files: Vec<String>,
    /// Bytes transferred by this call; files already on disk count as zero
    pub bytes_downloaded: u64,
    pub skipped: usize,
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, FetchError>;
}
