//! Remote retrieval of dataset files.
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;

use crate::error::{BenchmarkError, Result};

/// Downloads `url` to `dest`.
///
/// Implementations must leave either a complete file or no file at `dest`.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        HttpFetcher { timeout }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher::new(Duration::from_secs(300))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let fetch_err = |reason: String| BenchmarkError::Fetch {
            url: url.to_string(),
            reason,
        };

        log::info!("[hpo-svm::io] Downloading {}", url);
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| fetch_err(e.to_string()))?;
        let mut response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_err(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| BenchmarkError::io(parent, e))?;
        }
        let partial = partial_path(dest);
        let mut file = File::create(&partial).map_err(|e| BenchmarkError::io(&partial, e))?;
        if let Err(e) = io::copy(&mut response, &mut file) {
            let _ = fs::remove_file(&partial);
            return Err(fetch_err(e.to_string()));
        }
        drop(file);
        fs::rename(&partial, dest).map_err(|e| BenchmarkError::io(dest, e))
    }
}

/// Sibling path a download is streamed to before being renamed into place.
pub fn partial_path(dest: &Path) -> std::path::PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!("{}.part", name))
}
