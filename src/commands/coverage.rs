//! Coverage command implementation - breadth of B coverage over each A.
//!
//! Uses O(n + m) sweep-line algorithm per group and chromosome.

use crate::bed::Result;
use crate::engine::{for_each_overlap, sweep};
use crate::interval::{BedRecord, Value};
use crate::interval_set::{IntervalSet, SetOptions};
use log::info;

/// Coverage command configuration.
#[derive(Debug, Clone, Default)]
pub struct CoverageCommand;

impl CoverageCommand {
    pub fn new() -> Self {
        Self
    }

    /// Each A record with `.ints` (overlapping B count), `.cov` (bases
    /// covered by the union of B), `.len` and `.frac` (`.cov / .len`).
    pub fn coverage(&self, a: &IntervalSet, b: &IntervalSet) -> Result<IntervalSet> {
        let rows = sweep(a, b, |a_run, b_run| {
            let mut out = Vec::with_capacity(a_run.len());
            for_each_overlap(a_run, b_run, |query, hits| {
                let covered = covered_bases(query, hits);
                let mut row = query.clone();
                row.attrs.insert(".ints", hits.len() as u64);
                row.attrs.insert(".cov", covered);
                row.attrs.insert(".len", query.len());
                row.attrs
                    .insert(".frac", Value::Num(covered as f64 / query.len() as f64));
                out.push(row);
            });
            out
        })?;
        info!("coverage: {} A records against {} B", a.len(), b.len());

        IntervalSet::from_records(rows, a.group_keys(), &SetOptions::default())
    }
}

/// Bases of `query` covered by the union of `hits` (sorted by start).
fn covered_bases(query: &BedRecord, hits: &[&BedRecord]) -> u64 {
    let mut covered = 0;
    let mut cursor = query.start();
    for hit in hits {
        let start = hit.start().max(cursor);
        let end = hit.end().min(query.end());
        if end > start {
            covered += end - start;
            cursor = end;
        }
    }
    covered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::parse_records;

    fn set(content: &str) -> IntervalSet {
        IntervalSet::from_records(
            parse_records(content).unwrap(),
            &[] as &[&str],
            &SetOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_coverage_columns() {
        let a = set("chr1\t0\t100\nchr1\t200\t300\n");
        let b = set("chr1\t10\t30\nchr1\t20\t40\nchr1\t90\t210\n");

        let out = CoverageCommand::new().coverage(&a, &b).unwrap();
        let first = &out.records()[0];
        assert_eq!(first.field(".ints"), Value::Num(3.0));
        assert_eq!(first.field(".cov"), Value::Num(40.0));
        assert_eq!(first.field(".len"), Value::Num(100.0));
        assert_eq!(first.field(".frac"), Value::Num(0.4));

        let second = &out.records()[1];
        assert_eq!(second.field(".ints"), Value::Num(1.0));
        assert_eq!(second.field(".cov"), Value::Num(10.0));
    }

    #[test]
    fn test_uncovered_record() {
        let a = set("chr2\t0\t10\n");
        let b = set("chr1\t0\t10\n");

        let out = CoverageCommand::new().coverage(&a, &b).unwrap();
        assert_eq!(out.records()[0].field(".ints"), Value::Num(0.0));
        assert_eq!(out.records()[0].field(".frac"), Value::Num(0.0));
    }

    #[test]
    fn test_nested_hits() {
        let a = set("chr1\t0\t100\n");
        let b = set("chr1\t10\t80\nchr1\t20\t30\nchr1\t70\t90\n");

        let out = CoverageCommand::new().coverage(&a, &b).unwrap();
        assert_eq!(out.records()[0].field(".cov"), Value::Num(80.0));
    }
}
