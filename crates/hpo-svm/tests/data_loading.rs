//! Integration tests for the dataset loaders and the dataset cache.

mod common;

use std::sync::Arc;

use common::{CountingFetcher, FailingFetcher, MNIST_TEST, MNIST_TRAIN};
use hpo_svm::config::LoaderOptions;
use hpo_svm::data_handling::DatasetId;
use hpo_svm::error::BenchmarkError;
use hpo_svm::io::fetch::partial_path;
use hpo_svm::io::{cifar, load_dataset, mnist, DatasetCache};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// MNIST
// ---------------------------------------------------------------------------

#[test]
fn mnist_fetches_missing_files_once() {
    common::init_logging();
    let dir = TempDir::new().unwrap();
    let fetcher = CountingFetcher::default();
    let options = LoaderOptions::default();

    let first = load_dataset(DatasetId::Mnist, dir.path(), &options, &fetcher).unwrap();
    assert_eq!(fetcher.count(), mnist::FILES.len());
    for file in mnist::FILES {
        assert!(dir.path().join(file).exists(), "{} not stored", file);
        assert!(!partial_path(&dir.path().join(file)).exists());
    }

    let second = load_dataset(DatasetId::Mnist, dir.path(), &options, &fetcher).unwrap();
    assert_eq!(fetcher.count(), mnist::FILES.len(), "second load hit the network");
    assert_eq!(first, second);
}

#[test]
fn mnist_holds_out_last_training_examples_for_validation() {
    let dir = TempDir::new().unwrap();
    common::write_mnist(dir.path());
    let raw = load_dataset(DatasetId::Mnist, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap();

    assert_eq!(raw.train.len(), MNIST_TRAIN - mnist::VALIDATION_SIZE);
    assert_eq!(raw.validation.len(), mnist::VALIDATION_SIZE);
    assert_eq!(raw.test.len(), MNIST_TEST);
    assert_eq!(raw.n_features(), 784);

    // labels are i % 10 over the full training file
    let first_validation = (MNIST_TRAIN - mnist::VALIDATION_SIZE) % 10;
    assert_eq!(raw.validation.y[0], first_validation as i32);
    assert!(raw.train.x.iter().all(|&v| (0.0..1.0).contains(&v)));
}

#[test]
fn mnist_only_missing_files_are_fetched() {
    let dir = TempDir::new().unwrap();
    common::write_mnist(dir.path());
    std::fs::remove_file(dir.path().join(mnist::TEST_LABELS)).unwrap();

    let fetcher = CountingFetcher::default();
    load_dataset(DatasetId::Mnist, dir.path(), &LoaderOptions::default(), &fetcher).unwrap();
    assert_eq!(fetcher.count(), 1);
}

#[test]
fn mnist_fetch_failure_surfaces() {
    let dir = TempDir::new().unwrap();
    let err = load_dataset(DatasetId::Mnist, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap_err();
    assert!(matches!(err, BenchmarkError::Fetch { .. }));
    assert!(!err.is_configuration());
}

#[test]
fn mnist_corrupt_file_is_a_decode_error() {
    let dir = TempDir::new().unwrap();
    common::write_mnist(dir.path());
    common::write_gz(&dir.path().join(mnist::TEST_IMAGES), b"not an idx file at all");
    let err = load_dataset(DatasetId::Mnist, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap_err();
    assert!(matches!(err, BenchmarkError::Decode { .. }), "{:?}", err);
}

// ---------------------------------------------------------------------------
// CIFAR-10
// ---------------------------------------------------------------------------

#[test]
fn cifar_batches_map_to_splits() {
    let dir = TempDir::new().unwrap();
    common::write_cifar(dir.path(), 6);
    let raw = load_dataset(DatasetId::Cifar10, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap();

    assert_eq!(raw.train.len(), 6 * cifar::TRAIN_BATCHES.len());
    assert_eq!(raw.validation.len(), 6);
    assert_eq!(raw.test.len(), 6);
    assert_eq!(raw.n_features(), cifar::IMAGE_BYTES);
    // raw pixel range, not rescaled
    assert!(raw.train.x.iter().any(|&v| v > 1.0));
    assert_eq!(raw.train.y.to_vec()[..3], [0, 1, 2]);
}

#[test]
fn cifar_missing_batch_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    common::write_cifar(dir.path(), 3);
    std::fs::remove_file(dir.path().join(cifar::BATCH_DIR).join(cifar::TEST_BATCH)).unwrap();
    let err = load_dataset(DatasetId::Cifar10, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap_err();
    match err {
        BenchmarkError::Io { path, .. } => assert!(path.ends_with(cifar::TEST_BATCH)),
        other => panic!("expected Io error, got {:?}", other),
    }
}

#[test]
fn cifar_pickle_distribution_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join(cifar::PICKLE_DIR)).unwrap();
    let err = load_dataset(DatasetId::Cifar10, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap_err();
    match err {
        BenchmarkError::Decode { file, reason, .. } => {
            assert_eq!(file, cifar::PICKLE_DIR);
            assert!(reason.contains(cifar::BATCH_DIR), "{}", reason);
            assert!(reason.contains(cifar::TEST_BATCH), "{}", reason);
        }
        other => panic!("expected Decode error, got {:?}", other),
    }

    // the binary layout wins when both are present
    common::write_cifar(dir.path(), 2);
    load_dataset(DatasetId::Cifar10, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap();
}

// ---------------------------------------------------------------------------
// Combine mode
// ---------------------------------------------------------------------------

#[test]
fn combine_prepends_validation_to_train() {
    let dir = TempDir::new().unwrap();
    common::write_cifar(dir.path(), 4);
    let plain = load_dataset(DatasetId::Cifar10, dir.path(), &LoaderOptions::default(), &FailingFetcher).unwrap();

    let options = LoaderOptions {
        combine: true,
        ..LoaderOptions::default()
    };
    let combined = load_dataset(DatasetId::Cifar10, dir.path(), &options, &FailingFetcher).unwrap();

    let n_val = plain.validation.len();
    assert_eq!(combined.train.len(), plain.train.len() + n_val);
    assert_eq!(combined.validation, plain.validation);
    assert_eq!(combined.test, plain.test);
    assert_eq!(
        combined.train.x.row(0),
        plain.validation.x.row(0),
        "validation rows come first"
    );
    assert_eq!(combined.train.x.row(n_val), plain.train.x.row(0));
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[test]
fn cache_loads_each_dataset_once() {
    let dir = TempDir::new().unwrap();
    let fetcher = CountingFetcher::default();
    let cache = DatasetCache::with_fetcher(LoaderOptions::default(), Box::new(fetcher.clone()));
    assert!(cache.is_empty());

    let a = cache.get_or_load(DatasetId::Mnist, dir.path()).unwrap();
    let b = cache.get_or_load(DatasetId::Mnist, dir.path()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
    assert_eq!(fetcher.count(), mnist::FILES.len());
}

#[test]
fn cache_keys_on_storage_directory() {
    let (d1, d2) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    common::write_cifar(d1.path(), 3);
    common::write_cifar(d2.path(), 4);
    let cache = DatasetCache::with_fetcher(LoaderOptions::default(), Box::new(FailingFetcher));

    let a = cache.get_or_load(DatasetId::Cifar10, d1.path()).unwrap();
    let b = cache.get_or_load(DatasetId::Cifar10, d2.path()).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 2);
    assert_eq!(b.test.len(), 4);
}

#[test]
fn failed_load_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = DatasetCache::with_fetcher(LoaderOptions::default(), Box::new(FailingFetcher));
    assert!(cache.get_or_load(DatasetId::Cifar10, dir.path()).is_err());
    assert!(cache.is_empty());

    common::write_cifar(dir.path(), 3);
    assert!(cache.get_or_load(DatasetId::Cifar10, dir.path()).is_ok());
}
