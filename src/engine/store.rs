//! On-disk cache of remote filter lists.

use crate::config::Config;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};

/// One remote rule source and where its cached copy lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterList {
    pub name: String,
    pub label: String,
    pub url: String,
    pub path: PathBuf,
    pub max_age: Duration,
    pub enabled: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP {status} while downloading {url}")]
    Status { url: String, status: StatusCode },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct FilterStore {
    client: Client,
}

impl FilterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder().user_agent(config.http.user_agent.clone());
        if let Some(timeout) = config.download_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self::new(builder.build()?))
    }

    /// True when the cache file is missing, unreadable, or older than the
    /// list's staleness threshold.
    pub async fn needs_download(list: &FilterList) -> bool {
        let Ok(metadata) = fs::metadata(&list.path).await else {
            return true;
        };
        match metadata.modified() {
            // A modification time in the future counts as fresh.
            Ok(modified) => SystemTime::now()
                .duration_since(modified)
                .map(|age| age > list.max_age)
                .unwrap_or(false),
            Err(_) => true,
        }
    }

    /// Downloads `list` if its cache is absent or stale.
    /// Returns `Ok(true)` when a new copy was written.
    pub async fn ensure_fresh(&self, list: &FilterList) -> Result<bool, DownloadError> {
        if !Self::needs_download(list).await {
            debug!("{} is fresh, skipping download", list.label);
            return Ok(false);
        }
        self.download(list).await?;
        Ok(true)
    }

    /// Streams the list into a staging file and renames it over the cache
    /// only once the whole body has arrived. An existing cache is never
    /// touched by a failed download.
    async fn download(&self, list: &FilterList) -> Result<(), DownloadError> {
        if let Some(parent) = list.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| DownloadError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        info!("Fetching filter list '{}' from {}", list.label, list.url);
        let response = self
            .client
            .get(&list.url)
            .send()
            .await
            .map_err(|source| DownloadError::Transport {
                url: list.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: list.url.clone(),
                status,
            });
        }

        let staging = staging_path(&list.path);
        let written = match write_body(response, &staging).await {
            Ok(written) => written,
            Err(source) => {
                let _ = fs::remove_file(&staging).await;
                return Err(DownloadError::Io {
                    path: staging,
                    source,
                });
            }
        };

        if let Err(source) = fs::rename(&staging, &list.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(DownloadError::Io {
                path: list.path.clone(),
                source,
            });
        }

        info!(
            "Saved filter list '{}' ({} bytes) to {}",
            list.label,
            written,
            list.path.display()
        );
        Ok(())
    }

    /// Reads every cached list in order and concatenates their lines.
    /// Lists that were never downloaded contribute nothing.
    pub async fn load_all_rule_lines(lists: &[FilterList]) -> Vec<String> {
        let mut lines = Vec::new();
        for list in lists {
            match fs::read(&list.path).await {
                Ok(bytes) => {
                    // Stray non-UTF-8 bytes only spoil their own line.
                    let text = String::from_utf8_lossy(&bytes);
                    let before = lines.len();
                    lines.extend(text.lines().map(str::to_owned));
                    debug!("Loaded {} lines from '{}'", lines.len() - before, list.label);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("No cached copy of '{}', skipping", list.label);
                }
                Err(e) => {
                    warn!("Failed to read '{}': {}", list.path.display(), e);
                }
            }
        }
        lines
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".download");
    path.with_file_name(name)
}

async fn write_body(response: reqwest::Response, path: &Path) -> std::io::Result<u64> {
    let stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let mut reader = StreamReader::new(stream);
    let mut file = File::create(path).await?;
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    Ok(written)
}
