use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{Downloader, FetchError, Snapshot, SnapshotRequest};

pub struct HuggingFaceDownloader {
    client: Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
pub struct HfRepoInfo {
    pub id: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub siblings: Vec<HfSibling>,
}

#[derive(Debug, Deserialize)]
pub struct HfSibling {
    pub rfilename: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl HuggingFaceDownloader {
    pub fn new(endpoint: &str) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|_| FetchError::InvalidEndpoint(endpoint.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(FetchError::InvalidEndpoint(endpoint.to_string()));
        }

        let client = Client::builder()
            .user_agent(concat!("modelfetch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Append percent-encoded path segments to the endpoint.
    fn url<'a, I>(&self, segments: I) -> Result<Url, FetchError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `{endpoint}/api/models/{repo}/revision/{revision}`, revision as a single segment.
    fn repo_info_url(&self, repo_id: &str, revision: &str) -> Result<Url, FetchError> {
        self.url(
            ["api", "models"]
                .into_iter()
                .chain(repo_id.split('/'))
                .chain(["revision", revision]),
        )
    }

    /// `{endpoint}/{repo}/resolve/{revision}/{filename}`, filename split on `/`.
    fn resolve_url(
        &self,
        repo_id: &str,
        revision: &str,
        filename: &str,
    ) -> Result<Url, FetchError> {
        self.url(
            repo_id
                .split('/')
                .chain(["resolve", revision])
                .chain(filename.split('/')),
        )
    }

    fn authorized(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// List the files of `repo_id` at `revision`, with sizes when the hub reports them.
    pub async fn get_repo_info(
        &self,
        repo_id: &str,
        revision: &str,
        token: Option<&str>,
    ) -> Result<HfRepoInfo, FetchError> {
        let mut url = self.repo_info_url(repo_id, revision)?;
        url.query_pairs_mut().append_pair("blobs", "true");
        debug!("GET {}", url);

        let response = self
            .authorized(self.client.get(url.clone()), token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(repo_id.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(FetchError::Unauthorized(repo_id.to_string()))
            }
            status => Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    /// Fetch `filename` at `commit` into `dest_path`.
    async fn download_file(
        &self,
        request: &SnapshotRequest,
        commit: &str,
        filename: &str,
        dest_path: &Path,
    ) -> Result<u64, FetchError> {
        let url = self.resolve_url(&request.repo_id, commit, filename)?;

        let response = self
            .authorized(self.client.get(url.clone()), request.token.as_deref())
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::Unauthorized(request.repo_id.clone()))
            }
            status => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                })
            }
        }

        let total_size = response.content_length().unwrap_or(0);

        let pb = ProgressBar::new(total_size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(filename.to_string());

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Partial data lives in `<name>.part` until the stream completes
        let part_path = part_path(dest_path);
        let mut file = File::create(&part_path).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().await?;
        drop(file);

        fs::rename(&part_path, dest_path).await?;

        pb.finish_with_message(format!("Downloaded {}", filename));
        Ok(downloaded)
    }
}

#[async_trait]
impl Downloader for HuggingFaceDownloader {
    async fn snapshot(&self, request: &SnapshotRequest) -> Result<Snapshot, FetchError> {
        info!(
            "Fetching file list for {}@{}",
            request.repo_id, request.revision
        );
        let repo_info = self
            .get_repo_info(&request.repo_id, &request.revision, request.token.as_deref())
            .await?;
        // Every file comes from the same commit, even if the branch moves mid-snapshot
        let commit = repo_info.sha.as_deref().unwrap_or(&request.revision);
        debug!("{}@{} resolved to {}", repo_info.id, request.revision, commit);

        let selected: Vec<&HfSibling> = repo_info
            .siblings
            .iter()
            .filter(|s| request.patterns.is_match(&s.rfilename))
            .collect();

        if selected.is_empty() {
            return Err(FetchError::NoMatchingFiles(request.repo_id.clone()));
        }

        info!(
            "Downloading {} of {} file(s) to {}",
            selected.len(),
            repo_info.siblings.len(),
            request.local_dir.display()
        );
        fs::create_dir_all(&request.local_dir).await?;

        let mut bytes_downloaded = 0u64;
        let mut skipped = 0usize;
        let mut files = Vec::with_capacity(selected.len());

        for sibling in selected {
            let dest_path = local_path(&request.local_dir, &sibling.rfilename)?;

            if is_complete(&dest_path, sibling.size).await {
                debug!("{} already present, skipping", sibling.rfilename);
                skipped += 1;
            } else {
                bytes_downloaded += self
                    .download_file(request, commit, &sibling.rfilename, &dest_path)
                    .await?;
            }
            files.push(sibling.rfilename.clone());
        }

        Ok(Snapshot {
            repo_id: request.repo_id.clone(),
            revision: request.revision.clone(),
            commit: repo_info.sha.clone(),
            local_dir: request.local_dir.clone(),
            files,
            bytes_downloaded,
            skipped,
        })
    }
}

/// Map a repository path under `local_dir`, rejecting anything that would escape it.
fn local_path(local_dir: &Path, rfilename: &str) -> Result<PathBuf, FetchError> {
    let relative = Path::new(rfilename);
    let safe = relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(FetchError::InvalidPath(rfilename.to_string()));
    }
    Ok(local_dir.join(relative))
}

fn part_path(dest_path: &Path) -> PathBuf {
    let mut name = dest_path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// A file counts as complete when it exists with the size the hub reported.
async fn is_complete(path: &Path, expected: Option<u64>) -> bool {
    match (fs::metadata(path).await, expected) {
        (Ok(meta), Some(size)) => meta.is_file() && meta.len() == size,
        // Without a size to compare against, always re-fetch
        (Ok(_), None) => false,
        (Err(_), _) => false,
    }
}
