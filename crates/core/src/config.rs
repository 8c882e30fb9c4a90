use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::patterns::{FilePatterns, DEFAULT_ALLOW_PATTERNS, DEFAULT_IGNORE_PATTERNS};
use crate::retry::RetryPolicy;

pub const HF_BASE_URL: &str = "https://huggingface.co";

pub const ENV_MODEL_REPO: &str = "MODEL_REPO";
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";
pub const ENV_HF_ENDPOINT: &str = "HF_ENDPOINT";
pub const ENV_MODEL_DIR: &str = "MODEL_DIR";
pub const ENV_MODEL_REVISION: &str = "MODEL_REVISION";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no model repository configured (set MODEL_REPO or pass --repo)")]
    MissingRepo,

    #[error("invalid model repository '{0}': expected 'name' or 'owner/name'")]
    InvalidRepo(String),

    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("download.allow_patterns must not be empty")]
    NoAllowPatterns,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// What to fetch and where to put it
    #[serde(default)]
    pub download: DownloadConfig,

    /// Attempt budget for the snapshot
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Repository id, e.g. "mistralai/Mistral-7B-v0.1"
    #[serde(default)]
    pub repo_id: String,

    /// Access token for gated or private repositories
    #[serde(default)]
    pub token: Option<String>,

    /// Directory the snapshot is mirrored into
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// Branch, tag or commit
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Hub base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_allow_patterns")]
    pub allow_patterns: Vec<String>,

    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total number of snapshot attempts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between failed attempts, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("/models")
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_endpoint() -> String {
    HF_BASE_URL.to_string()
}

fn default_allow_patterns() -> Vec<String> {
    DEFAULT_ALLOW_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_ignore_patterns() -> Vec<String> {
    DEFAULT_IGNORE_PATTERNS.iter().map(|p| p.to_string()).collect()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_secs() -> u64 {
    5
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            repo_id: String::new(),
            token: None,
            local_dir: default_local_dir(),
            revision: default_revision(),
            endpoint: default_endpoint(),
            allow_patterns: default_allow_patterns(),
            ignore_patterns: default_ignore_patterns(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_secs: default_delay_secs(),
        }
    }
}

impl Config {
    /// Load config from `path`, or the built-in defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?;
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    /// Overlay values from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Overlay values from an environment lookup. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(repo) = get(ENV_MODEL_REPO) {
            self.download.repo_id = repo;
        }
        if let Some(token) = get(ENV_HF_TOKEN) {
            self.download.token = Some(token);
        }
        if let Some(endpoint) = get(ENV_HF_ENDPOINT) {
            self.download.endpoint = endpoint;
        }
        if let Some(dir) = get(ENV_MODEL_DIR) {
            self.download.local_dir = PathBuf::from(dir);
        }
        if let Some(revision) = get(ENV_MODEL_REVISION) {
            self.download.revision = revision;
        }
    }

    /// Normalize the repo id and check the settings are usable.
    pub fn validate(&mut self) -> std::result::Result<(), ConfigError> {
        let repo_id = normalize_repo_id(&self.download.repo_id);
        if repo_id.is_empty() {
            return Err(ConfigError::MissingRepo);
        }
        if !is_valid_repo_id(&repo_id) {
            return Err(ConfigError::InvalidRepo(repo_id));
        }
        self.download.repo_id = repo_id;

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.download.allow_patterns.is_empty() {
            return Err(ConfigError::NoAllowPatterns);
        }
        Ok(())
    }

    pub fn patterns(&self) -> FilePatterns {
        FilePatterns::new(
            self.download.allow_patterns.clone(),
            self.download.ignore_patterns.clone(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.delay_secs),
        )
    }
}

/// Turn a hub URL or bare id into a repo id: "https://huggingface.co/org/model/" -> "org/model".
pub fn normalize_repo_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://huggingface.co/")
        .or_else(|| trimmed.strip_prefix("http://huggingface.co/"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

fn is_valid_repo_id(repo_id: &str) -> bool {
    let parts: Vec<&str> = repo_id.split('/').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        !part.is_empty()
            && *part != "."
            && *part != ".."
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_normalize_strips_hub_prefix() {
        assert_eq!(
            normalize_repo_id("https://huggingface.co/mistralai/Mistral-7B-v0.1"),
            "mistralai/Mistral-7B-v0.1"
        );
        assert_eq!(normalize_repo_id("http://huggingface.co/gpt2/"), "gpt2");
        assert_eq!(normalize_repo_id("  Qwen/Qwen2-0.5B "), "Qwen/Qwen2-0.5B");
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.download.local_dir, PathBuf::from("/models"));
        assert_eq!(config.download.revision, "main");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_secs, 5);
        assert!(config.download.token.is_none());
    }

    #[test]
    fn test_env_overlay() {
        let mut config = Config::default();
        config.apply_env(env(&[
            (ENV_MODEL_REPO, "https://huggingface.co/org/model"),
            (ENV_HF_TOKEN, "hf_secret"),
            (ENV_MODEL_DIR, "/tmp/weights"),
        ]));
        config.validate().unwrap();

        assert_eq!(config.download.repo_id, "org/model");
        assert_eq!(config.download.token.as_deref(), Some("hf_secret"));
        assert_eq!(config.download.local_dir, PathBuf::from("/tmp/weights"));
        assert_eq!(config.download.endpoint, HF_BASE_URL);
    }

    #[test]
    fn test_empty_token_is_unset() {
        let mut config = Config::default();
        config.apply_env(env(&[(ENV_MODEL_REPO, "gpt2"), (ENV_HF_TOKEN, "")]));
        assert!(config.download.token.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_repos() {
        let mut config = Config::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingRepo));

        config.download.repo_id = "https://huggingface.co/".to_string();
        assert_eq!(config.validate(), Err(ConfigError::MissingRepo));

        config.download.repo_id = "a/b/c".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRepo(_))));

        config.download.repo_id = "org/../etc".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRepo(_))));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.download.repo_id = "gpt2".to_string();
        config.retry.max_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelfetch.toml");
        fs::write(
            &path,
            "[download]\nrepo_id = \"org/model\"\nallow_patterns = [\"*.gguf\"]\n\n[retry]\ndelay_secs = 1\n",
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.download.repo_id, "org/model");
        assert_eq!(config.download.allow_patterns, vec!["*.gguf".to_string()]);
        assert_eq!(config.download.ignore_patterns.len(), DEFAULT_IGNORE_PATTERNS.len());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry_policy().delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("nope.toml").as_path())).is_err());
    }
}
