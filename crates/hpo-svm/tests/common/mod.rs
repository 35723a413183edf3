//! Synthetic datasets and fetchers shared by the integration tests.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use hpo_svm::data_handling::{RawDataset, Split};
use hpo_svm::error::{BenchmarkError, Result};
use hpo_svm::io::{cifar, mnist, Fetcher};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Gaussian-ish blobs: `per_class` points around a distinct center per class.
pub fn blobs(seed: u64, classes: usize, per_class: usize, dim: usize, spread: f32) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(classes * per_class * dim);
    let mut y = Vec::with_capacity(classes * per_class);
    for k in 0..classes {
        for _ in 0..per_class {
            for d in 0..dim {
                let center = if d % classes == k { 3.0 } else { 0.0 };
                x.push(center + rng.gen_range(-spread..spread));
            }
            y.push(k as i32);
        }
    }
    Split::new(
        Array2::from_shape_vec((classes * per_class, dim), x).unwrap(),
        Array1::from_vec(y),
    )
    .unwrap()
}

pub fn blob_dataset(seed: u64) -> RawDataset {
    RawDataset::new(
        blobs(seed, 3, 30, 4, 0.8),
        blobs(seed + 1, 3, 15, 4, 0.8),
        blobs(seed + 2, 3, 15, 4, 0.8),
    )
    .unwrap()
}

pub fn idx_images(count: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let side = mnist::IMAGE_SIDE as u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&mnist::IMAGE_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&(count as u32).to_be_bytes());
    bytes.extend_from_slice(&side.to_be_bytes());
    bytes.extend_from_slice(&side.to_be_bytes());
    for i in 0..count * (side * side) as usize {
        // mostly blank pixels, like real digits
        bytes.push(if i % 97 == 0 { rng.gen() } else { 0 });
    }
    bytes
}

pub fn idx_labels(count: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&mnist::LABEL_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&(count as u32).to_be_bytes());
    bytes.extend((0..count).map(|i| (i % 10) as u8));
    bytes
}

pub fn write_gz(path: &Path, bytes: &[u8]) {
    let file = File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::fast());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap();
}

/// Training examples written for synthetic MNIST: just enough to hold out
/// the validation split.
pub const MNIST_TRAIN: usize = mnist::VALIDATION_SIZE + 20;
pub const MNIST_TEST: usize = 15;

pub fn mnist_file_bytes(file: &str) -> Vec<u8> {
    match file {
        mnist::TRAIN_IMAGES => idx_images(MNIST_TRAIN, 1),
        mnist::TRAIN_LABELS => idx_labels(MNIST_TRAIN),
        mnist::TEST_IMAGES => idx_images(MNIST_TEST, 2),
        mnist::TEST_LABELS => idx_labels(MNIST_TEST),
        other => panic!("unexpected mnist file {}", other),
    }
}

pub fn write_mnist(dir: &Path) {
    for file in mnist::FILES {
        write_gz(&dir.join(file), &mnist_file_bytes(file));
    }
}

/// Fetcher that serves synthetic MNIST files and counts its calls.
#[derive(Clone, Default)]
pub struct CountingFetcher {
    pub calls: Arc<AtomicUsize>,
}

impl CountingFetcher {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for CountingFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let file = url.rsplit('/').next().unwrap_or_default();
        write_gz(dest, &mnist_file_bytes(file));
        Ok(())
    }
}

/// Fetcher that always fails, for checking that nothing is downloaded.
pub struct FailingFetcher;

impl Fetcher for FailingFetcher {
    fn fetch(&self, url: &str, _dest: &Path) -> Result<()> {
        Err(BenchmarkError::Fetch {
            url: url.to_string(),
            reason: "network disabled in tests".to_string(),
        })
    }
}

fn cifar_batch(records: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = Vec::with_capacity(records * cifar::RECORD_BYTES);
    for i in 0..records {
        let label = (i % 3) as u8;
        bytes.push(label);
        for p in 0..cifar::IMAGE_BYTES {
            // class-dependent brightness so the classes are learnable
            let base = 60 * label as u32 + (p % 7) as u32;
            bytes.push((base + rng.gen_range(0..20)) as u8);
        }
    }
    bytes
}

/// Write a small CIFAR-10 binary distribution with `records` per batch.
pub fn write_cifar(dir: &Path, records: usize) {
    let batch_dir = dir.join(cifar::BATCH_DIR);
    fs::create_dir_all(&batch_dir).unwrap();
    for (i, file) in cifar::TRAIN_BATCHES.iter().enumerate() {
        fs::write(batch_dir.join(file), cifar_batch(records, i as u64)).unwrap();
    }
    fs::write(batch_dir.join(cifar::VALIDATION_BATCH), cifar_batch(records, 10)).unwrap();
    fs::write(batch_dir.join(cifar::TEST_BATCH), cifar_batch(records, 11)).unwrap();
}
