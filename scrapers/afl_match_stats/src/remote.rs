use anyhow::{Context, Result as AnyResult};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use nonzero_ext::nonzero;
use serde::Deserialize;
use std::{
    fs, io,
    num::NonZeroU32,
    path::{Component, Path, PathBuf},
    thread,
    time::{Duration, Instant},
};
use tracing::{debug, error, info, warn};

use crate::{
    config::PipelineConfig,
    error::RemoteError,
    metrics::MetricsCollector,
    types::{DirEntry, EntryKind},
};

/// Path-addressable content host holding the fixture, round folders and stat CSVs.
pub trait ContentStore {
    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError>;
    fn get_file_bytes(&self, path: &str) -> Result<Vec<u8>, RemoteError>;
}

impl<S: ContentStore + ?Sized> ContentStore for &S {
    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        (**self).list_directory(path)
    }

    fn get_file_bytes(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        (**self).get_file_bytes(path)
    }
}

impl<S: ContentStore + ?Sized> ContentStore for Box<S> {
    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        (**self).list_directory(path)
    }

    fn get_file_bytes(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        (**self).get_file_bytes(path)
    }
}

pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[derive(Debug, Deserialize)]
struct ContentsItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentsItem>),
    Single(serde_json::Value),
}

/// Reads a GitHub repository through the contents API.
pub struct GithubContentStore {
    client: reqwest::blocking::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    metrics: MetricsCollector,
    base_url: String,
    branch: String,
    token: Option<String>,
    max_attempts: u32,
    initial_delay: Duration,
}

impl GithubContentStore {
    pub fn new(config: &PipelineConfig) -> AnyResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.scraping.user_agent)
            .timeout(Duration::from_secs(config.scraping.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let rps = match NonZeroU32::new(config.rate_limits.requests_per_second) {
            Some(rps) => rps,
            None => {
                warn!("requests_per_second is 0, falling back to 1 request per second");
                nonzero!(1u32)
            }
        };
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        let repo = &config.repository;
        let base_url = format!(
            "{}/repos/{}/{}/contents",
            repo.api_base.trim_end_matches('/'),
            repo.owner,
            repo.name
        );

        Ok(Self {
            client,
            rate_limiter,
            metrics: MetricsCollector::new(),
            base_url,
            branch: repo.branch.clone(),
            token: repo.token.clone(),
            max_attempts: config.retry.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry.initial_delay_ms),
        })
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    fn url_for(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.base_url, encoded.join("/"))
    }

    fn wait_for_rate_limiter(&self) {
        let started = Instant::now();
        let mut waited = false;
        while self.rate_limiter.check().is_err() {
            waited = true;
            thread::sleep(Duration::from_millis(25));
        }
        if waited {
            self.metrics.record_rate_limit_wait(started.elapsed());
        }
    }

    fn retry_with_backoff<F, T>(&self, path: &str, mut operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Result<T, RemoteError>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    info!("Retry attempt {} for {} after error: {}", attempt, path, e);
                    self.metrics.record_retry();
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!("Giving up on {} after {} attempts: {}", path, attempt, e);
                    }
                    self.metrics.record_error(e.to_string());
                    return Err(e);
                }
            }
        }
    }

    fn get(&self, path: &str, accept: &str) -> Result<Vec<u8>, RemoteError> {
        self.retry_with_backoff(path, || {
            self.wait_for_rate_limiter();
            let tracker = self.metrics.record_request_start();
            let url = self.url_for(path);
            debug!("GET {}", url);

            let mut request = self
                .client
                .get(&url)
                .query(&[("ref", self.branch.as_str())])
                .header(reqwest::header::ACCEPT, accept);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let result = request
                .send()
                .map_err(|e| RemoteError::Connectivity {
                    path: path.to_string(),
                    message: e.to_string(),
                })
                .and_then(|response| {
                    let status = response.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(RemoteError::NotFound { path: path.to_string() });
                    }
                    if !status.is_success() {
                        return Err(RemoteError::Connectivity {
                            path: path.to_string(),
                            message: format!("HTTP {}", status),
                        });
                    }
                    response
                        .bytes()
                        .map(|b| b.to_vec())
                        .map_err(|e| RemoteError::Connectivity {
                            path: path.to_string(),
                            message: e.to_string(),
                        })
                });

            tracker.finish(result.as_ref().ok().map(Vec::len));
            result
        })
    }
}

impl ContentStore for GithubContentStore {
    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        let body = self.get(path, "application/vnd.github+json")?;
        let parsed: ContentsResponse =
            serde_json::from_slice(&body).map_err(|e| RemoteError::Connectivity {
                path: path.to_string(),
                message: format!("unexpected listing payload: {}", e),
            })?;

        match parsed {
            ContentsResponse::Listing(items) => {
                info!("Listed {} entries under {}", items.len(), path);
                Ok(items
                    .into_iter()
                    .map(|item| DirEntry {
                        kind: match item.kind.as_str() {
                            "dir" => EntryKind::Dir,
                            "file" => EntryKind::File,
                            _ => EntryKind::Other,
                        },
                        name: item.name,
                    })
                    .collect())
            }
            // the contents API answers a file path with a single object
            ContentsResponse::Single(_) => Err(RemoteError::NotFound { path: path.to_string() }),
        }
    }

    fn get_file_bytes(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let bytes = self.get(path, "application/vnd.github.raw")?;
        info!("Downloaded {} ({} bytes)", path, bytes.len());
        Ok(bytes)
    }
}

/// A checked-out copy of the stats repository on local disk.
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, RemoteError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(RemoteError::NotFound { path: path.to_string() });
        }
        Ok(self.root.join(relative))
    }

    fn map_io(path: &str, err: io::Error) -> RemoteError {
        if err.kind() == io::ErrorKind::NotFound {
            RemoteError::NotFound { path: path.to_string() }
        } else {
            RemoteError::Connectivity {
                path: path.to_string(),
                message: err.to_string(),
            }
        }
    }
}

impl ContentStore for LocalContentStore {
    fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, RemoteError> {
        let dir = self.resolve(path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| Self::map_io(path, e))? {
            let entry = entry.map_err(|e| Self::map_io(path, e))?;
            let file_type = entry.file_type().map_err(|e| Self::map_io(path, e))?;
            let kind = if file_type.is_dir() {
                EntryKind::Dir
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                EntryKind::Other
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        // read_dir order is platform dependent
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn get_file_bytes(&self, path: &str) -> Result<Vec<u8>, RemoteError> {
        fs::read(self.resolve(path)?).map_err(|e| Self::map_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("Round_9", "A v B"), "Round_9/A v B");
        assert_eq!(join_path("Round_9/", "A v B"), "Round_9/A v B");
        assert_eq!(join_path("", "AFLFixtures2023.csv"), "AFLFixtures2023.csv");
    }

    #[test]
    fn test_local_store_lists_sorted_entries() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Round_1/Zeta v Alpha Stats")).unwrap();
        fs::create_dir_all(dir.path().join("Round_1/Alpha v Beta Stats")).unwrap();
        fs::write(dir.path().join("Round_1/notes.txt"), "x").unwrap();

        let store = LocalContentStore::new(dir.path());
        let entries = store.list_directory("Round_1").unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry::dir("Alpha v Beta Stats"),
                DirEntry::dir("Zeta v Alpha Stats"),
                DirEntry::file("notes.txt"),
            ]
        );
    }

    #[test]
    fn test_local_store_missing_paths() {
        let dir = tempdir().unwrap();
        let store = LocalContentStore::new(dir.path());
        assert!(matches!(
            store.list_directory("Round_4"),
            Err(RemoteError::NotFound { .. })
        ));
        assert!(matches!(
            store.get_file_bytes("../etc/passwd"),
            Err(RemoteError::NotFound { .. })
        ));
    }

    #[test]
    fn test_url_encodes_segments() {
        let store = GithubContentStore::new(&PipelineConfig::default()).unwrap();
        assert_eq!(
            store.url_for("Round_9/Carlton v Collingwood/Carlton Season Average.csv"),
            "https://api.github.com/repos/hermclane/AFL/contents/Round_9/Carlton%20v%20Collingwood/Carlton%20Season%20Average.csv"
        );
    }
}
