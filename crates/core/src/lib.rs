//! modelfetch_core - Mirror model repositories from the Hugging Face hub
//!
//! This crate provides:
//! - Configuration from TOML files and the process environment
//! - Allow/ignore file pattern filtering
//! - Snapshot downloads with a bounded retry loop
//! - Disk usage reports for a download directory

pub mod config;
pub mod downloaders;
pub mod fetch;
pub mod patterns;
pub mod report;
pub mod retry;

pub use config::{Config, ConfigError};
pub use downloaders::{Downloader, FetchError, HuggingFaceDownloader, Snapshot, SnapshotRequest};
pub use fetch::snapshot_with_retry;
pub use patterns::FilePatterns;
pub use report::{scan, DirReport};
pub use retry::{RetryError, RetryPolicy};
