//! CIFAR-10, binary distribution (`cifar-10-batches-bin`).
//!
//! Each batch file is a flat sequence of records: one label byte followed by
//! 3072 pixel bytes (1024 red, 1024 green, 1024 blue). Pixels are kept as raw
//! 0..=255 values.
use std::path::Path;

use ndarray::{Array1, Array2};

use crate::data_handling::{RawDataset, Split};
use crate::error::{BenchmarkError, Result};
use crate::io::read_file;

pub const BATCH_DIR: &str = "cifar-10-batches-bin";
/// Directory of the python pickle distribution, which is not supported.
pub const PICKLE_DIR: &str = "cifar-10-batches-py";
pub const TRAIN_BATCHES: [&str; 4] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
];
pub const VALIDATION_BATCH: &str = "data_batch_5.bin";
pub const TEST_BATCH: &str = "test_batch.bin";

pub const IMAGE_BYTES: usize = 32 * 32 * 3;
pub const RECORD_BYTES: usize = IMAGE_BYTES + 1;
pub const NUM_CLASSES: i32 = 10;

/// Decode one batch file's contents.
pub fn decode_batch(bytes: &[u8], file: &str) -> Result<Split> {
    let decode_err = |reason: String| BenchmarkError::Decode {
        dataset: "cifar10".to_string(),
        file: file.to_string(),
        reason,
    };
    if bytes.is_empty() || bytes.len() % RECORD_BYTES != 0 {
        return Err(decode_err(format!(
            "{} bytes is not a whole number of {}-byte records",
            bytes.len(),
            RECORD_BYTES
        )));
    }
    let count = bytes.len() / RECORD_BYTES;
    let mut labels = Vec::with_capacity(count);
    let mut pixels = Vec::with_capacity(count * IMAGE_BYTES);
    for (i, record) in bytes.chunks_exact(RECORD_BYTES).enumerate() {
        let label = record[0] as i32;
        if label >= NUM_CLASSES {
            return Err(decode_err(format!("record {} has label {}", i, label)));
        }
        labels.push(label);
        pixels.extend(record[1..].iter().map(|&p| p as f32));
    }
    let x = Array2::from_shape_vec((count, IMAGE_BYTES), pixels)
        .map_err(|e| decode_err(e.to_string()))?;
    Split::new(x, Array1::from_vec(labels))
}

fn load_batch(batch_dir: &Path, file: &str) -> Result<Split> {
    let bytes = read_file(&batch_dir.join(file))?;
    decode_batch(&bytes, file)
}

/// Load CIFAR-10 from `data_dir/cifar-10-batches-bin`: batches 1-4 are the
/// training split, batch 5 is validation and the test batch is test.
pub fn load(data_dir: &Path) -> Result<RawDataset> {
    let batch_dir = data_dir.join(BATCH_DIR);
    if !batch_dir.exists() && data_dir.join(PICKLE_DIR).exists() {
        return Err(BenchmarkError::Decode {
            dataset: "cifar10".to_string(),
            file: PICKLE_DIR.to_string(),
            reason: format!(
                "found the pickle distribution; expected the binary distribution in {} ({}, {}, {})",
                BATCH_DIR,
                TRAIN_BATCHES.join(", "),
                VALIDATION_BATCH,
                TEST_BATCH
            ),
        });
    }
    let train_batches = TRAIN_BATCHES
        .iter()
        .map(|file| load_batch(&batch_dir, file))
        .collect::<Result<Vec<_>>>()?;
    let train = Split::concat(&train_batches.iter().collect::<Vec<_>>())?;
    let validation = load_batch(&batch_dir, VALIDATION_BATCH)?;
    let test = load_batch(&batch_dir, TEST_BATCH)?;
    RawDataset::new(train, validation, test)
}
