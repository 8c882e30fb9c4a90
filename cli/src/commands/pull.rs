use anyhow::{Context, Result};
use clap::Args;
use modelfetch_core::{
    snapshot_with_retry, Config, HuggingFaceDownloader, Snapshot, SnapshotRequest,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

use super::list;

#[derive(Args, Debug, Default, Clone)]
pub struct PullArgs {
    /// Repository id or URL (overrides MODEL_REPO)
    #[arg(long)]
    pub repo: Option<String>,

    /// Access token (overrides HF_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Download directory (overrides MODEL_DIR, default /models)
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// Branch, tag or commit (overrides MODEL_REVISION)
    #[arg(long)]
    pub revision: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of snapshot attempts
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Seconds to wait between failed attempts
    #[arg(long)]
    pub retry_delay: Option<u64>,
}

impl PullArgs {
    /// Defaults, then config file, then environment, then flags.
    pub fn resolve_config<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::load(self.config.as_deref())?;
        config.apply_env(lookup);

        if let Some(repo) = &self.repo {
            config.download.repo_id = repo.clone();
        }
        if let Some(token) = &self.token {
            config.download.token = Some(token.clone());
        }
        if let Some(dir) = &self.local_dir {
            config.download.local_dir = dir.clone();
        }
        if let Some(revision) = &self.revision {
            config.download.revision = revision.clone();
        }
        if let Some(attempts) = self.attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(delay) = self.retry_delay {
            config.retry.delay_secs = delay;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Final state of a pull, mapped to the process exit status by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    Complete,
    /// Every snapshot attempt failed
    Failed,
}

impl PullStatus {
    pub fn code(self) -> u8 {
        match self {
            PullStatus::Complete => 0,
            PullStatus::Failed => 1,
        }
    }
}

impl From<PullStatus> for ExitCode {
    fn from(status: PullStatus) -> Self {
        ExitCode::from(status.code())
    }
}

pub async fn execute(args: &PullArgs) -> Result<PullStatus> {
    run(args, |key| std::env::var(key).ok()).await
}

async fn run<F>(args: &PullArgs, lookup: F) -> Result<PullStatus>
where
    F: Fn(&str) -> Option<String>,
{
    let config = args.resolve_config(lookup)?;
    let request = SnapshotRequest::from_config(&config);
    let policy = config.retry_policy();

    println!(
        "Downloading {} to {}",
        request.repo_id,
        request.local_dir.display()
    );

    let downloader = HuggingFaceDownloader::new(&config.download.endpoint)
        .context("Failed to create HTTP client")?;

    match snapshot_with_retry(&downloader, &request, &policy).await {
        Ok(snapshot) => Ok(finish(&snapshot)),
        Err(e) => {
            error!("Download of {} failed: {}", request.repo_id, e);
            Ok(PullStatus::Failed)
        }
    }
}

/// Print the summary and directory report. Report problems are logged, not fatal.
fn finish(snapshot: &Snapshot) -> PullStatus {
    println!("Download complete!");
    println!(
        "  {} file(s), {} skipped as already present",
        snapshot.files.len(),
        snapshot.skipped
    );

    if let Err(e) = list::print_report(&snapshot.local_dir) {
        warn!("Could not report on {}: {:#}", snapshot.local_dir.display(), e);
    }

    PullStatus::Complete
}
