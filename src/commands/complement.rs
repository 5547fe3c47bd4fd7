//! Complement command implementation.
//!
//! Returns genomic regions NOT covered by any record, ignoring groups.

use crate::bed::Result;
use crate::genome::Genome;
use crate::interval::BedRecord;
use crate::interval_set::{IntervalSet, SetOptions};
use log::info;
use rustc_hash::FxHashMap;

/// Complement command configuration.
#[derive(Debug, Clone, Default)]
pub struct ComplementCommand;

impl ComplementCommand {
    pub fn new() -> Self {
        Self
    }

    /// Uncovered regions in genome chromosome order.
    ///
    /// Every record must lie within the genome; a record on an unknown
    /// chromosome or past a chromosome end is `OutOfBounds`.
    pub fn gaps(&self, set: &IntervalSet, genome: &Genome) -> Result<Vec<BedRecord>> {
        let mut spans: FxHashMap<&str, Vec<(u64, u64)>> = FxHashMap::default();
        for record in set.records() {
            genome.validate(&record.interval)?;
            spans
                .entry(record.chrom())
                .or_default()
                .push((record.start(), record.end()));
        }

        let mut gaps = Vec::new();
        for (chrom, chrom_size) in genome.iter() {
            let mut last_end = 0u64;
            if let Some(chrom_spans) = spans.get_mut(chrom) {
                // Groups interleave chromosomes, so re-sort per chromosome.
                chrom_spans.sort_unstable();
                for &(start, end) in chrom_spans.iter() {
                    if start > last_end {
                        gaps.push(BedRecord::new(chrom, last_end, start));
                    }
                    last_end = last_end.max(end);
                }
            }
            if last_end < chrom_size {
                gaps.push(BedRecord::new(chrom, last_end, chrom_size));
            }
        }

        info!("complement: {} records -> {} gaps", set.len(), gaps.len());
        Ok(gaps)
    }

    /// The uncovered regions as an ungrouped set.
    pub fn complement(&self, set: &IntervalSet, genome: &Genome) -> Result<IntervalSet> {
        let gaps = self.gaps(set, genome)?;
        IntervalSet::from_records(gaps, &[] as &[&str], &SetOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::{parse_records, BedError};

    fn set(content: &str, keys: &[&str]) -> IntervalSet {
        IntervalSet::from_records(parse_records(content).unwrap(), keys, &SetOptions::default())
            .unwrap()
    }

    fn coords(records: &[BedRecord]) -> Vec<(&str, u64, u64)> {
        records.iter().map(|r| (r.chrom(), r.start(), r.end())).collect()
    }

    #[test]
    fn test_basic_complement() {
        let genome = Genome::from_pairs([("chr2", 300), ("chr1", 1000)]).unwrap();
        let input = set("chr1\t100\t200\nchr1\t150\t300\nchr1\t900\t1000\n", &[]);

        let gaps = ComplementCommand::new().gaps(&input, &genome).unwrap();
        assert_eq!(
            coords(&gaps),
            vec![("chr2", 0, 300), ("chr1", 0, 100), ("chr1", 300, 900)]
        );

        let sorted = ComplementCommand::new().complement(&input, &genome).unwrap();
        assert_eq!(sorted.records()[0].chrom(), "chr1");
    }

    #[test]
    fn test_complement_ignores_groups() {
        let genome = Genome::from_pairs([("chr1", 100)]).unwrap();
        let input = set("chr1\t0\t40\ta\t0\t-\nchr1\t30\t60\tb\t0\t+\n", &["strand"]);

        let gaps = ComplementCommand::new().gaps(&input, &genome).unwrap();
        assert_eq!(coords(&gaps), vec![("chr1", 60, 100)]);
    }

    #[test]
    fn test_unknown_chromosome() {
        let genome = Genome::from_pairs([("chr1", 100)]).unwrap();
        let input = set("chrUn\t0\t10\n", &[]);
        assert!(matches!(
            ComplementCommand::new().gaps(&input, &genome),
            Err(BedError::OutOfBounds { .. })
        ));
    }
}
