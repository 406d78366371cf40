// SPDX-License-Identifier: PMPL-1.0-or-later

//! Seeded train/test splits and cross-validation folds

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

pub fn class_counts(labels: &[String]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for label in labels {
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    counts
}

/// Stratification needs at least two samples of every class
pub fn can_stratify(counts: &BTreeMap<String, usize>) -> bool {
    !counts.is_empty() && counts.values().all(|&c| c >= 2)
}

fn indices_by_class(labels: &[String]) -> BTreeMap<&str, Vec<usize>> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        groups.entry(label.as_str()).or_default().push(i);
    }
    groups
}

/// Partition row indices into `(train, test)`, both sorted ascending.
///
/// With `stratify`, every class keeps at least one row on each side.
pub fn train_test_split(
    labels: &[String],
    test_fraction: f64,
    seed: u64,
    stratify: bool,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut train = Vec::new();
    let mut test = Vec::new();

    if stratify {
        for (_, mut rows) in indices_by_class(labels) {
            rows.shuffle(&mut rng);
            let n = rows.len();
            let n_test = ((n as f64 * fraction).round() as usize).clamp(1, n.saturating_sub(1).max(1));
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }
    } else {
        let mut rows: Vec<usize> = (0..labels.len()).collect();
        rows.shuffle(&mut rng);
        let n = rows.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * fraction).ceil() as usize).clamp(1, n - 1)
        };
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// `k` stratified folds of held-out row indices. Each class is spread
/// round-robin over the folds, continuing where the previous class stopped
/// so fold sizes stay even.
pub fn stratified_folds(labels: &[String], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0;

    for (_, mut rows) in indices_by_class(labels) {
        rows.shuffle(&mut rng);
        for row in rows {
            folds[next % k].push(row);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}
