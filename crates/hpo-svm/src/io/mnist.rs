//! MNIST in the gzip-compressed IDX format.
//!
//! The nominal training set (60,000 images) is split into 50,000 training and
//! 10,000 validation examples; the 10,000 test images form the test split.
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::{Array1, Array2};

use crate::data_handling::{RawDataset, Split};
use crate::error::{BenchmarkError, Result};
use crate::io::fetch::Fetcher;
use crate::io::read_file;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte.gz";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte.gz";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte.gz";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte.gz";

/// The four files the loader needs, all directly inside the storage directory.
pub const FILES: [&str; 4] = [TRAIN_IMAGES, TRAIN_LABELS, TEST_IMAGES, TEST_LABELS];

/// Number of trailing training examples held out for validation.
pub const VALIDATION_SIZE: usize = 10_000;

pub const IMAGE_MAGIC: u32 = 2051;
pub const LABEL_MAGIC: u32 = 2049;
pub const IMAGE_SIDE: usize = 28;

const IMAGE_HEADER: usize = 16;
const LABEL_HEADER: usize = 8;

fn decode_err(file: &str, reason: impl Into<String>) -> BenchmarkError {
    BenchmarkError::Decode {
        dataset: "mnist".to_string(),
        file: file.to_string(),
        reason: reason.into(),
    }
}

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Download any of the four files that are missing from `data_dir`.
/// Files already present are never fetched again.
pub fn ensure_files(data_dir: &Path, mirror: &str, fetcher: &dyn Fetcher) -> Result<()> {
    for file in FILES {
        let path = data_dir.join(file);
        if path.exists() {
            continue;
        }
        let url = format!("{}/{}", mirror.trim_end_matches('/'), file);
        fetcher.fetch(&url, &path)?;
    }
    Ok(())
}

fn gunzip(data_dir: &Path, file: &str) -> Result<Vec<u8>> {
    let compressed = read_file(&data_dir.join(file))?;
    let mut bytes = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .read_to_end(&mut bytes)
        .map_err(|e| decode_err(file, format!("gzip: {}", e)))?;
    Ok(bytes)
}

/// Decode an uncompressed IDX image file into one flattened row per image,
/// scaled by 1/256 into [0, 255/256].
pub fn decode_images(bytes: &[u8], file: &str) -> Result<Array2<f32>> {
    if bytes.len() < IMAGE_HEADER {
        return Err(decode_err(file, "truncated header"));
    }
    let magic = be_u32(bytes, 0);
    if magic != IMAGE_MAGIC {
        return Err(decode_err(file, format!("bad magic number {}", magic)));
    }
    let count = be_u32(bytes, 4) as usize;
    let rows = be_u32(bytes, 8) as usize;
    let cols = be_u32(bytes, 12) as usize;
    if rows != IMAGE_SIDE || cols != IMAGE_SIDE {
        return Err(decode_err(
            file,
            format!("expected {0}x{0} images, found {1}x{2}", IMAGE_SIDE, rows, cols),
        ));
    }
    let pixels = &bytes[IMAGE_HEADER..];
    let dim = rows * cols;
    if pixels.len() != count * dim {
        return Err(decode_err(
            file,
            format!(
                "header announces {} images but payload holds {} bytes",
                count,
                pixels.len()
            ),
        ));
    }
    let data = pixels.iter().map(|&p| p as f32 / 256.0).collect();
    Array2::from_shape_vec((count, dim), data).map_err(|e| decode_err(file, e.to_string()))
}

/// Decode an uncompressed IDX label file.
pub fn decode_labels(bytes: &[u8], file: &str) -> Result<Array1<i32>> {
    if bytes.len() < LABEL_HEADER {
        return Err(decode_err(file, "truncated header"));
    }
    let magic = be_u32(bytes, 0);
    if magic != LABEL_MAGIC {
        return Err(decode_err(file, format!("bad magic number {}", magic)));
    }
    let count = be_u32(bytes, 4) as usize;
    let labels = &bytes[LABEL_HEADER..];
    if labels.len() != count {
        return Err(decode_err(
            file,
            format!("header announces {} labels but payload holds {}", count, labels.len()),
        ));
    }
    Ok(labels.iter().map(|&l| l as i32).collect())
}

fn load_split(data_dir: &Path, images: &str, labels: &str) -> Result<Split> {
    let x = decode_images(&gunzip(data_dir, images)?, images)?;
    let y = decode_labels(&gunzip(data_dir, labels)?, labels)?;
    if x.nrows() != y.len() {
        return Err(decode_err(
            labels,
            format!("{} labels for {} images in {}", y.len(), x.nrows(), images),
        ));
    }
    Split::new(x, y)
}

/// Load MNIST from `data_dir`, downloading missing files from `mirror`.
pub fn load(data_dir: &Path, mirror: &str, fetcher: &dyn Fetcher) -> Result<RawDataset> {
    ensure_files(data_dir, mirror, fetcher)?;
    let full_train = load_split(data_dir, TRAIN_IMAGES, TRAIN_LABELS)?;
    let test = load_split(data_dir, TEST_IMAGES, TEST_LABELS)?;
    if full_train.len() <= VALIDATION_SIZE {
        return Err(decode_err(
            TRAIN_IMAGES,
            format!(
                "{} training images, need more than {} to hold out a validation split",
                full_train.len(),
                VALIDATION_SIZE
            ),
        ));
    }
    let (train, validation) = full_train.split_tail(VALIDATION_SIZE)?;
    RawDataset::new(train, validation, test)
}
