//! Subtract command implementation.
//!
//! Uses O(n + m) sweep-line algorithm per group and chromosome.

use crate::bed::Result;
use crate::engine::{for_each_overlap, sweep};
use crate::interval::BedRecord;
use crate::interval_set::{IntervalSet, SetOptions};

/// Subtract command configuration.
#[derive(Debug, Clone, Default)]
pub struct SubtractCommand {
    /// Remove entire A feature if any overlap (like bedtools -A)
    pub remove_entire: bool,
}

impl SubtractCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_entire(mut self, remove_entire: bool) -> Self {
        self.remove_entire = remove_entire;
        self
    }

    /// Remove the portions of each A record covered by B.
    ///
    /// Each A record yields zero or more pieces carrying its attributes and
    /// strand.
    pub fn subtract(&self, a: &IntervalSet, b: &IntervalSet) -> Result<IntervalSet> {
        let pieces = sweep(a, b, |a_run, b_run| {
            let mut out = Vec::with_capacity(a_run.len());
            for_each_overlap(a_run, b_run, |a_rec, hits| {
                if hits.is_empty() {
                    out.push(a_rec.clone());
                } else if !self.remove_entire {
                    uncovered_pieces(a_rec, hits, &mut out);
                }
            });
            out
        })?;

        IntervalSet::from_records(pieces, a.group_keys(), &SetOptions::default())
    }
}

/// Emit the parts of `a_rec` not covered by `hits` (sorted by start).
fn uncovered_pieces(a_rec: &BedRecord, hits: &[&BedRecord], out: &mut Vec<BedRecord>) {
    let mut cursor = a_rec.start();

    for b_rec in hits {
        if b_rec.start() > cursor {
            out.push(piece(a_rec, cursor, b_rec.start()));
        }
        cursor = cursor.max(b_rec.end());
        if cursor >= a_rec.end() {
            return;
        }
    }

    if cursor < a_rec.end() {
        out.push(piece(a_rec, cursor, a_rec.end()));
    }
}

#[inline]
fn piece(a_rec: &BedRecord, start: u64, end: u64) -> BedRecord {
    let mut rec = a_rec.clone();
    rec.interval.start = start;
    rec.interval.end = end;
    rec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::parse_records;
    use crate::interval::Value;

    fn set(content: &str) -> IntervalSet {
        IntervalSet::from_records(
            parse_records(content).unwrap(),
            &[] as &[&str],
            &SetOptions::default(),
        )
        .unwrap()
    }

    fn coords(set: &IntervalSet) -> Vec<(u64, u64)> {
        set.records().iter().map(|r| (r.start(), r.end())).collect()
    }

    #[test]
    fn test_hole_in_middle() {
        let a = set("chr1\t100\t200\tkeep\n");
        let b = set("chr1\t150\t160\n");

        let out = SubtractCommand::new().subtract(&a, &b).unwrap();
        assert_eq!(coords(&out), vec![(100, 150), (160, 200)]);
        for rec in out.records() {
            assert_eq!(rec.field("name"), Value::from("keep"));
        }
    }

    #[test]
    fn test_overlapping_b_union() {
        let a = set("chr1\t0\t100\n");
        let b = set("chr1\t10\t30\nchr1\t20\t40\nchr1\t60\t70\nchr1\t95\t150\n");

        let out = SubtractCommand::new().subtract(&a, &b).unwrap();
        assert_eq!(coords(&out), vec![(0, 10), (40, 60), (70, 95)]);
    }

    #[test]
    fn test_fully_covered_and_untouched() {
        let a = set("chr1\t10\t20\nchr1\t50\t60\nchr2\t0\t5\n");
        let b = set("chr1\t0\t30\n");

        let out = SubtractCommand::new().subtract(&a, &b).unwrap();
        let rows: Vec<_> = out.records().iter().map(|r| (r.chrom(), r.start())).collect();
        assert_eq!(rows, vec![("chr1", 50), ("chr2", 0)]);
    }

    #[test]
    fn test_remove_entire() {
        let a = set("chr1\t100\t200\nchr1\t300\t400\n");
        let b = set("chr1\t150\t160\n");

        let out = SubtractCommand::new().with_remove_entire(true).subtract(&a, &b).unwrap();
        assert_eq!(coords(&out), vec![(300, 400)]);
    }

    #[test]
    fn test_partition_property() {
        let a = set("chr1\t0\t300\nchr1\t400\t500\nchr1\t900\t1200\n");
        let b = set("chr1\t50\t100\nchr1\t90\t210\nchr1\t250\t255\nchr1\t450\t460\nchr1\t950\t1000\n");

        let remaining = SubtractCommand::new().subtract(&a, &b).unwrap();

        for a_rec in a.records() {
            let mut covered = vec![false; a_rec.len() as usize];
            for b_rec in b.records() {
                let lo = b_rec.start().max(a_rec.start());
                let hi = b_rec.end().min(a_rec.end());
                for pos in lo..hi.max(lo) {
                    covered[(pos - a_rec.start()) as usize] = true;
                }
            }
            let removed = covered.iter().filter(|c| **c).count() as u64;

            let pieces: Vec<_> = remaining
                .records()
                .iter()
                .filter(|r| r.start() >= a_rec.start() && r.end() <= a_rec.end())
                .collect();
            let kept: u64 = pieces.iter().map(|r| r.len()).sum();

            assert_eq!(kept + removed, a_rec.len());
            for piece in pieces {
                assert!(b.records().iter().all(|b_rec| !piece.interval.overlaps(&b_rec.interval)));
            }
        }
    }
}
