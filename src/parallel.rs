//! Parallel processing utilities using Rayon.

use crate::config::is_parallel;
use crate::interval::BedRecord;
use log::debug;
use rayon::prelude::*;

/// Minimum number of records before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Whether work over `total` records should go to the rayon pool.
#[inline]
pub fn use_parallel(total: usize) -> bool {
    total >= PARALLEL_THRESHOLD && is_parallel()
}

/// Split records sorted by chromosome into contiguous per-chromosome runs.
pub fn chromosome_runs(records: &[BedRecord]) -> Vec<(&str, &[BedRecord])> {
    let mut runs = Vec::new();
    let mut begin = 0;

    for i in 1..=records.len() {
        if i == records.len() || records[i].chrom() != records[begin].chrom() {
            if begin < i {
                runs.push((records[begin].chrom(), &records[begin..i]));
            }
            begin = i;
        }
    }

    runs
}

/// Run `f` over independent partitions and concatenate the results in
/// partition order, so sequential and parallel runs give the same output.
pub fn run_partitions<P, T, F>(partitions: Vec<P>, total: usize, f: F) -> Vec<T>
where
    P: Send,
    T: Send,
    F: Fn(P) -> Vec<T> + Sync + Send,
{
    let parallel = use_parallel(total);
    debug!(
        "sweeping {} partitions over {} records ({})",
        partitions.len(),
        total,
        if parallel { "parallel" } else { "sequential" }
    );

    if parallel {
        let results: Vec<Vec<T>> = partitions.into_par_iter().map(f).collect();
        results.into_iter().flatten().collect()
    } else {
        partitions.into_iter().flat_map(f).collect()
    }
}

/// Stable sort of records by `key`, on the rayon pool for large inputs.
pub fn sort_records_by<F>(records: &mut [BedRecord], key: F)
where
    F: Fn(&BedRecord, &BedRecord) -> std::cmp::Ordering + Sync,
{
    if use_parallel(records.len()) {
        records.par_sort_by(key);
    } else {
        records.sort_by(key);
    }
}
