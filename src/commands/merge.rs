//! Merge command implementation.
//!
//! Single-pass sweep-line merge per group and chromosome over records the
//! set already keeps sorted.

use crate::aggregate::{check_summary_names, Summary};
use crate::bed::{BedError, Result};
use crate::interval::{BedRecord, Strand, Value};
use crate::interval_set::{IntervalSet, SetOptions};
use crate::parallel::{chromosome_runs, run_partitions};
use log::info;

/// Merge command configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    /// Maximum distance between intervals to merge (default: 0)
    pub distance: u64,
    /// Named reducers combining the attributes of merged records
    pub summaries: Vec<Summary>,
}

impl MergeCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum merge distance.
    pub fn with_distance(mut self, d: u64) -> Self {
        self.distance = d;
        self
    }

    pub fn with_summaries(mut self, summaries: Vec<Summary>) -> Self {
        self.summaries = summaries;
        self
    }

    /// Merge overlapping and nearby records within each group.
    ///
    /// Output records carry the group-key attributes, the shared strand (or
    /// unknown when members disagree) and one column per summary.
    pub fn merge(&self, set: &IntervalSet) -> Result<IntervalSet> {
        check_summary_names(&self.summaries)?;
        if let Some(clash) = self
            .summaries
            .iter()
            .find(|s| set.group_keys().contains(&s.name))
        {
            return Err(BedError::InvalidArgument(format!(
                "summary '{}' collides with a group key",
                clash.name
            )));
        }
        set.check_sorted()?;

        let runs: Vec<&[BedRecord]> = set
            .grouped_view()
            .flat_map(|(_, group)| chromosome_runs(group).into_iter().map(|(_, run)| run))
            .collect();

        let merged = run_partitions(runs, set.len(), |run| {
            self.merge_sorted(run, set.group_keys())
        });
        info!("merge: {} records -> {}", set.len(), merged.len());

        IntervalSet::from_records(merged, set.group_keys(), &SetOptions::default())
    }

    /// O(n) sweep over one chromosome run sorted by start.
    fn merge_sorted(&self, records: &[BedRecord], group_keys: &[String]) -> Vec<BedRecord> {
        let mut result = Vec::new();
        let mut begin = 0;
        let mut current_end = 0;

        for (i, rec) in records.iter().enumerate() {
            if i == 0 {
                current_end = rec.end();
                continue;
            }
            if rec.start() <= current_end.saturating_add(self.distance) {
                current_end = current_end.max(rec.end());
            } else {
                result.push(self.emit_merged_record(&records[begin..i], current_end, group_keys));
                begin = i;
                current_end = rec.end();
            }
        }

        if begin < records.len() {
            result.push(self.emit_merged_record(&records[begin..], current_end, group_keys));
        }
        result
    }

    /// Create a merged record from a run of overlapping records.
    fn emit_merged_record(&self, group: &[BedRecord], end: u64, group_keys: &[String]) -> BedRecord {
        let first = &group[0];
        let strand = if group.iter().all(|r| r.strand == first.strand) {
            first.strand
        } else {
            Strand::Unknown
        };

        let mut merged = BedRecord::new(first.chrom(), first.start(), end).with_strand(strand);
        for key in group_keys {
            if key != "chrom" && key != "strand" {
                merged.attrs.insert(key.as_str(), first.field(key));
            }
        }
        for summary in &self.summaries {
            merged
                .attrs
                .insert(summary.name.as_str(), summary.apply(group, &Value::Missing));
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::parse_records;

    fn set(content: &str, keys: &[&str]) -> IntervalSet {
        IntervalSet::from_records(parse_records(content).unwrap(), keys, &SetOptions::default())
            .unwrap()
    }

    fn coords(set: &IntervalSet) -> Vec<(&str, u64, u64)> {
        set.records().iter().map(|r| (r.chrom(), r.start(), r.end())).collect()
    }

    #[test]
    fn test_basic_merge() {
        let merged = MergeCommand::new()
            .merge(&set("chr1\t300\t400\nchr1\t100\t200\nchr1\t150\t250\n", &[]))
            .unwrap();
        assert_eq!(coords(&merged), vec![("chr1", 100, 250), ("chr1", 300, 400)]);
    }

    #[test]
    fn test_merge_with_distance() {
        let input = set("chr1\t100\t200\nchr1\t250\t350\n", &[]);

        let merged = MergeCommand::new().with_distance(50).merge(&input).unwrap();
        assert_eq!(coords(&merged), vec![("chr1", 100, 350)]);

        let apart = MergeCommand::new().with_distance(49).merge(&input).unwrap();
        assert_eq!(apart.len(), 2);
    }

    #[test]
    fn test_merge_with_huge_distance() {
        let input = set("chr1\t100\t200\nchr1\t5000\t6000\nchr2\t0\t10\n", &[]);
        let merged = MergeCommand::new().with_distance(u64::MAX).merge(&input).unwrap();
        assert_eq!(coords(&merged), vec![("chr1", 100, 6000), ("chr2", 0, 10)]);
    }

    #[test]
    fn test_merge_adjacent_and_contained() {
        let merged = MergeCommand::new()
            .merge(&set("chr1\t100\t200\nchr1\t200\t300\nchr1\t120\t130\nchr2\t100\t200\n", &[]))
            .unwrap();
        assert_eq!(coords(&merged), vec![("chr1", 100, 300), ("chr2", 100, 200)]);
    }

    #[test]
    fn test_merge_per_group() {
        let input = set(
            "chr1\t100\t200\ta\t1\t+\nchr1\t150\t250\tb\t2\t-\nchr1\t180\t300\tc\t3\t+\n",
            &["strand"],
        );
        let merged = MergeCommand::new().merge(&input).unwrap();

        let rows: Vec<_> = merged
            .records()
            .iter()
            .map(|r| (r.strand, r.start(), r.end()))
            .collect();
        assert_eq!(rows, vec![(Strand::Plus, 100, 300), (Strand::Minus, 150, 250)]);
        assert_eq!(merged.group_keys(), &["strand".to_string()]);
    }

    #[test]
    fn test_merge_keeps_group_attribute_and_summaries() {
        let input = set(
            "chr1\t100\t200\tg1\t5\nchr1\t150\t250\tg1\t7\nchr1\t160\t170\tg2\t1\n",
            &["name"],
        );
        let summaries = vec![
            Summary::new("total", "score", "sum").unwrap(),
            Summary::new("n", "score", "count").unwrap(),
        ];
        let merged = MergeCommand::new().with_summaries(summaries).merge(&input).unwrap();

        assert_eq!(merged.len(), 2);
        let g1 = &merged.records()[0];
        assert_eq!(g1.field("name"), Value::from("g1"));
        assert_eq!(g1.field("total"), Value::Num(12.0));
        assert_eq!(g1.field("n"), Value::Num(2.0));
        assert_eq!((g1.start(), g1.end()), (100, 250));
    }

    #[test]
    fn test_mixed_strand_becomes_unknown() {
        let merged = MergeCommand::new()
            .merge(&set("chr1\t0\t10\ta\t0\t+\nchr1\t5\t20\tb\t0\t-\n", &[]))
            .unwrap();
        assert_eq!(merged.records()[0].strand, Strand::Unknown);
    }

    #[test]
    fn test_merge_idempotent() {
        let input = set(
            "chr1\t0\t50\nchr1\t40\t60\nchr1\t60\t70\nchr1\t100\t110\nchr2\t5\t9\nchr2\t7\t8\n",
            &[],
        );
        let once = MergeCommand::new().merge(&input).unwrap();
        let twice = MergeCommand::new().merge(&once).unwrap();
        assert_eq!(once, twice);

        for pair in once.records().windows(2) {
            if pair[0].chrom() == pair[1].chrom() {
                assert!(pair[0].end() < pair[1].start());
            }
        }
    }

    #[test]
    fn test_summary_name_clash() {
        let input = set("chr1\t0\t10\tg\t1\n", &["name"]);
        let summaries = vec![Summary::new("name", "score", "sum").unwrap()];
        assert!(matches!(
            MergeCommand::new().with_summaries(summaries).merge(&input),
            Err(BedError::InvalidArgument(_))
        ));
    }
}
