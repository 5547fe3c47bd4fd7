//! Intersect command implementation.
//!
//! Uses O(n + m) sweep-line per group and chromosome.

use crate::bed::Result;
use crate::config::UnmatchedPolicy;
use crate::engine::{for_each_overlap, pair_record, paired_group_keys, sweep, OverlapPair};
use crate::interval::BedRecord;
use crate::interval_set::{IntervalSet, SetOptions};
use log::info;

/// Intersect command configuration.
#[derive(Debug, Clone)]
pub struct IntersectCommand {
    /// How A records with no overlap are reported
    pub unmatched: UnmatchedPolicy,
    /// Minimum overlap in bases for a pair to count
    pub min_overlap: u64,
    /// Only report A records with NO overlap
    pub invert: bool,
}

impl Default for IntersectCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl IntersectCommand {
    pub fn new() -> Self {
        Self {
            unmatched: UnmatchedPolicy::Omit,
            min_overlap: 1,
            invert: false,
        }
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn with_min_overlap(mut self, min_overlap: u64) -> Self {
        self.min_overlap = min_overlap.max(1);
        self
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    /// All overlap pairs, in A order and then B order.
    ///
    /// Under [`UnmatchedPolicy::EmitNull`] an A record without matches
    /// yields one unmatched pair.
    pub fn pairs<'a>(&self, a: &'a IntervalSet, b: &'a IntervalSet) -> Result<Vec<OverlapPair<'a>>> {
        sweep(a, b, |a_run, b_run| {
            let mut out = Vec::new();
            for_each_overlap(a_run, b_run, |query, hits| {
                let before = out.len();
                for &matched in hits {
                    let pair = OverlapPair::new(query, matched);
                    if pair.overlap >= self.min_overlap {
                        out.push(pair);
                    }
                }
                if out.len() == before && self.unmatched == UnmatchedPolicy::EmitNull {
                    out.push(OverlapPair::unmatched(query));
                }
            });
            out
        })
    }

    /// Intersect A with B, one output row per pair.
    ///
    /// With `invert`, returns the A records that overlap nothing in B.
    pub fn intersect(&self, a: &IntervalSet, b: &IntervalSet) -> Result<IntervalSet> {
        if self.invert {
            return self.without_overlap(a, b);
        }

        let b_columns = b.columns();
        let rows: Vec<BedRecord> = self
            .pairs(a, b)?
            .iter()
            .map(|pair| pair_record(pair, &b_columns))
            .collect();
        info!("intersect: {} A x {} B -> {} rows", a.len(), b.len(), rows.len());

        IntervalSet::from_records(rows, &paired_group_keys(a.group_keys()), &SetOptions::default())
    }

    /// A records without any qualifying overlap, attributes unchanged.
    pub fn without_overlap(&self, a: &IntervalSet, b: &IntervalSet) -> Result<IntervalSet> {
        let kept = sweep(a, b, |a_run, b_run| {
            let mut out = Vec::new();
            for_each_overlap(a_run, b_run, |query, hits| {
                let matched = hits
                    .iter()
                    .any(|m| query.interval.overlap_length(&m.interval) >= self.min_overlap);
                if !matched {
                    out.push(query.clone());
                }
            });
            out
        })?;
        IntervalSet::from_records(kept, a.group_keys(), &SetOptions::default())
    }
}
