//! Closest command implementation - find the nearest B interval for each A.
//!
//! Per group and chromosome: overlaps come from the shared sweep, the
//! nearest upstream B from a sweep over B sorted by end, and the nearest
//! downstream B from a binary search over B sorted by start. O(n log m).

use crate::bed::Result;
use crate::config::{TieHandling, UnmatchedPolicy};
use crate::engine::{for_each_overlap, pair_record, paired_group_keys, sweep, OverlapPair};
use crate::interval::{BedRecord, Value};
use crate::interval_set::{IntervalSet, SetOptions};

/// Closest command configuration.
#[derive(Debug, Clone)]
pub struct ClosestCommand {
    /// How to handle ties
    pub tie_handling: TieHandling,
    /// Ignore overlapping intervals
    pub ignore_overlaps: bool,
    /// Ignore upstream intervals
    pub ignore_upstream: bool,
    /// Ignore downstream intervals
    pub ignore_downstream: bool,
    /// How A records without any candidate are reported
    pub unmatched: UnmatchedPolicy,
}

impl Default for ClosestCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ClosestCommand {
    pub fn new() -> Self {
        Self {
            tie_handling: TieHandling::First,
            ignore_overlaps: false,
            ignore_upstream: false,
            ignore_downstream: false,
            unmatched: UnmatchedPolicy::EmitNull,
        }
    }

    pub fn with_ties(mut self, tie_handling: TieHandling) -> Self {
        self.tie_handling = tie_handling;
        self
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }

    /// Nearest-B pairs for every A record, in A order.
    pub fn pairs<'a>(&self, a: &'a IntervalSet, b: &'a IntervalSet) -> Result<Vec<OverlapPair<'a>>> {
        sweep(a, b, |a_run, b_run| self.closest_partition(a_run, b_run))
    }

    /// One row per reported pair, with `.overlap` and signed `.dist`.
    pub fn closest(&self, a: &IntervalSet, b: &IntervalSet) -> Result<IntervalSet> {
        let b_columns = b.columns();
        let rows: Vec<BedRecord> = self
            .pairs(a, b)?
            .iter()
            .map(|pair| {
                let mut row = pair_record(pair, &b_columns);
                let dist = pair.distance.map(Value::from).unwrap_or(Value::Missing);
                row.attrs.insert(".dist", dist);
                row
            })
            .collect();

        IntervalSet::from_records(rows, &paired_group_keys(a.group_keys()), &SetOptions::default())
    }

    fn closest_partition<'a>(
        &self,
        a_sorted: &'a [BedRecord],
        b_sorted: &'a [BedRecord],
    ) -> Vec<OverlapPair<'a>> {
        let b_len = b_sorted.len();

        // Indices of B sorted by end, for upstream queries.
        let b_by_end: Vec<usize> = {
            let mut idx: Vec<usize> = (0..b_len).collect();
            idx.sort_by_key(|&i| (b_sorted[i].end(), i));
            idx
        };
        let mut end_ptr: usize = 0;

        let mut out = Vec::with_capacity(a_sorted.len());
        let mut candidates: Vec<(usize, i64)> = Vec::with_capacity(8);

        for_each_overlap(a_sorted, b_sorted, |a_rec, hits| {
            let a_start = a_rec.start();
            let a_end = a_rec.end();
            candidates.clear();

            // Sweep pointer: B with end <= A.start are upstream.
            while end_ptr < b_len && b_sorted[b_by_end[end_ptr]].end() <= a_start {
                end_ptr += 1;
            }

            if !self.ignore_overlaps && !hits.is_empty() {
                for &hit in hits {
                    out.push(OverlapPair::new(a_rec, hit));
                    if self.tie_handling == TieHandling::First {
                        break;
                    }
                }
                return;
            }

            // Best upstream: the largest end at or before A.start.
            if !self.ignore_upstream && end_ptr > 0 {
                let best_end = b_sorted[b_by_end[end_ptr - 1]].end();
                let dist = -((a_start - best_end) as i64);
                let first = b_by_end[..end_ptr].partition_point(|&i| b_sorted[i].end() < best_end);
                for &i in &b_by_end[first..end_ptr] {
                    candidates.push((i, dist));
                }
            }

            // Best downstream: the smallest start at or after A.end.
            if !self.ignore_downstream {
                let ds = b_sorted.partition_point(|b| b.start() < a_end);
                if ds < b_len {
                    let best_start = b_sorted[ds].start();
                    let dist = (best_start - a_end) as i64;
                    for (offset, b_rec) in b_sorted[ds..].iter().enumerate() {
                        if b_rec.start() != best_start {
                            break;
                        }
                        candidates.push((ds + offset, dist));
                    }
                }
            }

            let Some(min_abs) = candidates.iter().map(|(_, d)| d.abs()).min() else {
                if self.unmatched == UnmatchedPolicy::EmitNull {
                    out.push(OverlapPair::unmatched(a_rec));
                }
                return;
            };

            // Upstream (negative) first on an exact tie, then B sort order.
            candidates.retain(|(_, d)| d.abs() == min_abs);
            candidates.sort_by_key(|&(i, d)| (d.signum(), i));

            let take = match self.tie_handling {
                TieHandling::First => 1,
                TieHandling::All => candidates.len(),
            };
            for &(i, dist) in candidates.iter().take(take) {
                out.push(OverlapPair {
                    query: a_rec,
                    matched: Some(&b_sorted[i]),
                    overlap: 0,
                    distance: Some(dist),
                });
            }
        });

        out
    }
}
