//! Seeded train/test split.

use crate::config::TestSize;
use crate::error::Result;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Disjoint row indices of the two partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_samples` with a ChaCha8 stream seeded from `seed`; the first
/// `k` shuffled indices are the test partition, the rest the train partition.
///
/// The same `n_samples`, `test_size` and `seed` always give the same split.
///
/// # Errors
///
/// Returns [`LearningError::Data`](crate::LearningError::Data) when the test
/// size does not leave both partitions non-empty.
pub fn train_test_split(n_samples: usize, test_size: TestSize, seed: u64) -> Result<TrainTestSplit> {
    let n_test = test_size.resolve(n_samples)?;

    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let split = train_test_split(50, TestSize::Fraction(0.2), 1).unwrap();
        assert_eq!(split.test.len(), 10);
        assert_eq!(split.train.len(), 40);

        let test: HashSet<_> = split.test.iter().collect();
        assert!(split.train.iter().all(|i| !test.contains(i)));

        let mut all: Vec<_> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = train_test_split(100, TestSize::Count(13), 42).unwrap();
        let b = train_test_split(100, TestSize::Count(13), 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_different_split() {
        let a = train_test_split(100, TestSize::Count(20), 1).unwrap();
        let b = train_test_split(100, TestSize::Count(20), 2).unwrap();
        assert_ne!(a.test, b.test);
    }

    #[test]
    fn test_two_rows_one_each() {
        let split = train_test_split(2, TestSize::Count(1), 1).unwrap();
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.train.len(), 1);
        assert_ne!(split.test[0], split.train[0]);
    }

    #[test]
    fn test_oversized_test_is_data_error() {
        let err = train_test_split(10, TestSize::Count(10), 1).unwrap_err();
        assert_eq!(err.error_code(), "DATA_ERROR");
    }
}
