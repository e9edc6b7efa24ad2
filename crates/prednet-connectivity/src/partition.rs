// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Target partitioning across workers.
*/

use crate::types::Gid;
use std::ops::Range;

/// Contiguous share `[lo, hi)` of `total` items owned by `rank`.
///
/// The remainder of `total / n_workers` goes to the lowest ranks, one item
/// each. Shares of consecutive ranks are adjacent and together cover
/// `0..total` exactly once.
pub fn distribute_n(total: usize, n_workers: usize, rank: usize) -> (usize, usize) {
    if n_workers == 0 || rank >= n_workers {
        return (total, total);
    }
    let base = total / n_workers;
    let remainder = total % n_workers;
    let lo = rank * base + rank.min(remainder);
    let hi = lo + base + usize::from(rank < remainder);
    (lo, hi)
}

/// `distribute_n` as a gid range
pub fn target_range(total: usize, n_workers: usize, rank: usize) -> Range<Gid> {
    let (lo, hi) = distribute_n(total, n_workers, rank);
    lo..hi
}
