use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::LoaderOptions;
use crate::data_handling::{DatasetId, RawDataset};
use crate::error::Result;
use crate::io::fetch::{Fetcher, HttpFetcher};
use crate::io::load_dataset;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    id: DatasetId,
    data_dir: PathBuf,
    combine: bool,
}

/// Loaded datasets, one per (dataset, storage directory, combine flag).
///
/// Datasets are handed out behind `Arc` and never mutated, so any number of
/// arms can be evaluated against one load.
pub struct DatasetCache {
    options: LoaderOptions,
    fetcher: Box<dyn Fetcher>,
    entries: Mutex<HashMap<CacheKey, Arc<RawDataset>>>,
}

impl DatasetCache {
    pub fn new(options: LoaderOptions) -> Self {
        Self::with_fetcher(options, Box::new(HttpFetcher::default()))
    }

    pub fn with_fetcher(options: LoaderOptions, fetcher: Box<dyn Fetcher>) -> Self {
        DatasetCache {
            options,
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Return the cached dataset or load it. The lock is held while loading so
    /// concurrent callers asking for the same dataset decode it only once.
    pub fn get_or_load(&self, id: DatasetId, data_dir: &Path) -> Result<Arc<RawDataset>> {
        let key = CacheKey {
            id,
            data_dir: data_dir.to_path_buf(),
            combine: self.options.combine,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(raw) = entries.get(&key) {
            log::debug!("[hpo-svm::io] {} served from cache", id);
            return Ok(Arc::clone(raw));
        }
        let raw = Arc::new(load_dataset(
            id,
            data_dir,
            &self.options,
            self.fetcher.as_ref(),
        )?);
        entries.insert(key, Arc::clone(&raw));
        Ok(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
