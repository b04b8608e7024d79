//! Seeded k-fold partitioning.
//!
//! Row positions are shuffled with a `StdRng` seeded from the caller's seed,
//! then cut into `k` contiguous blocks. The first `n % k` blocks hold one
//! extra row. Each block is one fold's test set; the remaining rows are its
//! training set. Both index lists are sorted ascending.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `0..n_rows` into `n_splits` folds.
///
/// The same `(n_rows, n_splits, seed)` always yields the same folds.
pub fn k_fold(n_rows: usize, n_splits: usize, seed: u64) -> Result<Vec<Fold>> {
    if n_splits < 2 {
        return Err(Error::InvalidParameter(format!(
            "fold count must be at least 2, got {n_splits}"
        )));
    }
    if n_splits > n_rows {
        return Err(Error::InvalidParameter(format!(
            "cannot split {n_rows} rows into {n_splits} folds"
        )));
    }

    let mut order: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let base = n_rows / n_splits;
    let extra = n_rows % n_splits;
    let mut folds = Vec::with_capacity(n_splits);
    let mut start = 0;
    for i in 0..n_splits {
        let end = start + base + usize::from(i < extra);
        let mut test = order[start..end].to_vec();
        test.sort_unstable();

        let mut in_test = vec![false; n_rows];
        for &row in &test {
            in_test[row] = true;
        }
        let train = (0..n_rows).filter(|&row| !in_test[row]).collect();

        folds.push(Fold { train, test });
        start = end;
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_cover_every_row_once() {
        let folds = k_fold(23, 5, 7).unwrap();
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 23);
            assert!(fold.train.iter().all(|r| !fold.test.contains(r)));
        }
    }

    #[test]
    fn sizes_spread_the_remainder_over_the_first_folds() {
        let sizes: Vec<usize> = k_fold(23, 5, 1)
            .unwrap()
            .iter()
            .map(|f| f.test.len())
            .collect();
        assert_eq!(sizes, vec![5, 5, 5, 4, 4]);
    }

    #[test]
    fn same_seed_same_partition() {
        assert_eq!(k_fold(40, 4, 2026).unwrap(), k_fold(40, 4, 2026).unwrap());
        assert_ne!(k_fold(40, 4, 2026).unwrap(), k_fold(40, 4, 2027).unwrap());
    }

    #[test]
    fn invalid_fold_counts_are_rejected() {
        assert!(matches!(k_fold(10, 1, 0), Err(Error::InvalidParameter(_))));
        assert!(matches!(k_fold(3, 4, 0), Err(Error::InvalidParameter(_))));
    }
}
