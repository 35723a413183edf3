//! Dataset loaders.
//!
//! Every loader takes the storage directory explicitly; nothing here changes
//! the process working directory. Missing MNIST files are fetched through a
//! [`Fetcher`], CIFAR-10 batches must already be present.
pub mod cache;
pub mod cifar;
pub mod fetch;
pub mod mnist;

use std::path::Path;

pub use cache::DatasetCache;
pub use fetch::{Fetcher, HttpFetcher};

use crate::config::LoaderOptions;
use crate::data_handling::{DatasetId, RawDataset, Split};
use crate::error::{BenchmarkError, Result};

/// Load and decode `id` from `data_dir`.
///
/// # Arguments
///
/// * `id` - Dataset to load.
/// * `data_dir` - Storage directory holding (or receiving) the dataset files.
/// * `options` - Loader options (combine mode, download mirror).
/// * `fetcher` - Used for files that are missing and may be downloaded.
///
/// # Returns
///
/// The train/validation/test splits.
pub fn load_dataset(
    id: DatasetId,
    data_dir: &Path,
    options: &LoaderOptions,
    fetcher: &dyn Fetcher,
) -> Result<RawDataset> {
    log::info!(
        "[hpo-svm::io] loading {} from {}",
        id,
        data_dir.display()
    );
    let raw = match id {
        DatasetId::Mnist => mnist::load(data_dir, &options.mnist_mirror, fetcher)?,
        DatasetId::Cifar10 => cifar::load(data_dir)?,
    };
    let raw = if options.combine {
        log::info!("[hpo-svm::io] combine mode: prepending validation to training split");
        combine_validation(raw)?
    } else {
        raw
    };
    raw.log_summary(id);
    Ok(raw)
}

/// Prepend the validation split to the training split. The validation split
/// itself is kept unchanged.
pub fn combine_validation(raw: RawDataset) -> Result<RawDataset> {
    let train = Split::concat(&[&raw.validation, &raw.train])?;
    RawDataset::new(train, raw.validation, raw.test)
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| BenchmarkError::io(path, e))
}
