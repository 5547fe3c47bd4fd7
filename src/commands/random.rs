//! Random interval generation and shuffling against a genome.
//!
//! Both commands draw from one `SmallRng` seeded by the caller, so identical
//! seeds and inputs always give identical output.

use crate::bed::{BedError, Result};
use crate::commands::MergeCommand;
use crate::config::{LengthPolicy, ShuffleScope};
use crate::genome::Genome;
use crate::interval::BedRecord;
use crate::interval_set::{IntervalSet, SetOptions};
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

/// Chromosomes long enough for a given length, weighted by the number of
/// valid start positions.
#[derive(Debug, Clone)]
struct WeightedChroms<'g> {
    chromosomes: Vec<(&'g str, u64)>,
    /// Cumulative start-position counts for weighted sampling
    cumulative: Vec<u64>,
    total: u64,
}

impl<'g> WeightedChroms<'g> {
    /// Returns `None` if no chromosome fits `length`.
    fn new(genome: &'g Genome, length: u64) -> Option<Self> {
        let chromosomes: Vec<(&str, u64)> = genome
            .iter()
            .filter(|&(_, size)| size >= length)
            .collect();

        let mut cumulative = Vec::with_capacity(chromosomes.len());
        let mut running_total = 0u64;
        for &(_, size) in &chromosomes {
            running_total += size - length + 1;
            cumulative.push(running_total);
        }

        (running_total > 0).then_some(Self {
            chromosomes,
            cumulative,
            total: running_total,
        })
    }

    /// Sample a chromosome, then a start uniformly among its valid positions.
    #[inline]
    fn sample(&self, rng: &mut SmallRng, length: u64) -> (&'g str, u64) {
        let target = rng.gen_range(0..self.total);
        let idx = self.cumulative.partition_point(|&x| x <= target);
        let (chrom, size) = self.chromosomes[idx];
        (chrom, rng.gen_range(0..=size - length))
    }
}

/// Random interval generator.
#[derive(Debug, Clone)]
pub struct RandomCommand {
    /// Number of intervals to draw
    pub count: usize,
    /// Length of every interval
    pub length: u64,
    pub seed: u64,
    pub length_policy: LengthPolicy,
}

impl RandomCommand {
    pub fn new(count: usize, length: u64, seed: u64) -> Self {
        Self {
            count,
            length,
            seed,
            length_policy: LengthPolicy::Reject,
        }
    }

    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    /// Draw `count` intervals of `length` bases, returned sorted.
    pub fn random_intervals(&self, genome: &Genome) -> Result<IntervalSet> {
        if self.length == 0 {
            return Err(BedError::InvalidLength {
                length: 0,
                message: "interval length must be positive".to_string(),
            });
        }
        if self.length_policy == LengthPolicy::Reject {
            if let Some((chrom, size)) = genome.iter().find(|&(_, size)| size < self.length) {
                return Err(BedError::InvalidLength {
                    length: self.length,
                    message: format!("longer than chromosome '{}' ({} bp)", chrom, size),
                });
            }
        }
        let weighted = WeightedChroms::new(genome, self.length).ok_or_else(|| {
            BedError::InvalidLength {
                length: self.length,
                message: "longer than every chromosome".to_string(),
            }
        })?;

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let records: Vec<BedRecord> = (0..self.count)
            .map(|_| {
                let (chrom, start) = weighted.sample(&mut rng, self.length);
                BedRecord::new(chrom, start, start + self.length)
            })
            .collect();
        info!("random: drew {} intervals of {} bp", records.len(), self.length);

        IntervalSet::from_records(records, &[] as &[&str], &SetOptions::default())
    }
}

/// Shuffle command configuration.
#[derive(Debug, Clone)]
pub struct ShuffleCommand {
    pub seed: u64,
    pub scope: ShuffleScope,
    /// Regions no shuffled interval may overlap
    pub excluded: Option<IntervalSet>,
    /// Placement attempts per record when regions are excluded
    pub max_tries: usize,
}

impl ShuffleCommand {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            scope: ShuffleScope::WithinChrom,
            excluded: None,
            max_tries: 1000,
        }
    }

    pub fn with_scope(mut self, scope: ShuffleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_excluded(mut self, excluded: IntervalSet) -> Self {
        self.excluded = Some(excluded);
        self
    }

    pub fn with_max_tries(mut self, max_tries: usize) -> Self {
        self.max_tries = max_tries.max(1);
        self
    }

    /// Move every record to a random position of the same length.
    ///
    /// Attributes and strand are kept; records are drawn in set order.
    pub fn shuffle(&self, set: &IntervalSet, genome: &Genome) -> Result<IntervalSet> {
        let excluded = match &self.excluded {
            Some(regions) => excluded_index(regions)?,
            None => FxHashMap::default(),
        };

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut by_length: FxHashMap<u64, WeightedChroms<'_>> = FxHashMap::default();
        let mut shuffled = Vec::with_capacity(set.len());

        for record in set.records() {
            let length = record.len();
            let tries = if excluded.is_empty() { 1 } else { self.max_tries };
            let mut placed = None;

            for _ in 0..tries {
                let (chrom, start) = match self.scope {
                    ShuffleScope::WithinChrom => {
                        let size = chrom_size_for(genome, record)?;
                        let start = rng.gen_range(0..=size - length);
                        (record.chrom(), start)
                    }
                    ShuffleScope::Genome => {
                        if !by_length.contains_key(&length) {
                            let weighted = WeightedChroms::new(genome, length).ok_or_else(|| {
                                BedError::InvalidLength {
                                    length,
                                    message: "longer than every chromosome".to_string(),
                                }
                            })?;
                            by_length.insert(length, weighted);
                        }
                        by_length[&length].sample(&mut rng, length)
                    }
                };

                let blocked = excluded
                    .get(chrom)
                    .is_some_and(|regions| hits_region(regions, start, start + length));
                if !blocked {
                    placed = Some((chrom.to_string(), start));
                    break;
                }
            }

            let (chrom, start) = placed.ok_or_else(|| BedError::PlacementFailed {
                interval: format!("{}:{}:{}", record.chrom(), record.start(), record.end()),
                tries,
            })?;

            let mut moved = record.clone();
            moved.interval.chrom = chrom;
            moved.interval.start = start;
            moved.interval.end = start + length;
            shuffled.push(moved);
        }
        info!("shuffle: placed {} records", shuffled.len());

        IntervalSet::from_records(shuffled, set.group_keys(), &SetOptions::default())
    }
}

/// Size of the record's own chromosome, checked against its length.
fn chrom_size_for(genome: &Genome, record: &BedRecord) -> Result<u64> {
    let size = genome.chrom_size(record.chrom()).ok_or_else(|| BedError::OutOfBounds {
        interval: format!("{}:{}:{}", record.chrom(), record.start(), record.end()),
        message: format!("chromosome '{}' is not in the genome", record.chrom()),
    })?;
    if record.len() > size {
        return Err(BedError::InvalidLength {
            length: record.len(),
            message: format!("longer than chromosome '{}' ({} bp)", record.chrom(), size),
        });
    }
    Ok(size)
}

/// Merged, disjoint excluded regions per chromosome.
fn excluded_index(regions: &IntervalSet) -> Result<FxHashMap<String, Vec<(u64, u64)>>> {
    let merged = MergeCommand::new().merge(&regions.ungroup())?;
    let mut index: FxHashMap<String, Vec<(u64, u64)>> = FxHashMap::default();
    for r in merged.into_records() {
        let span = (r.start(), r.end());
        index.entry(r.interval.chrom).or_default().push(span);
    }
    Ok(index)
}

/// Whether [start, end) overlaps any of the sorted, disjoint `regions`.
#[inline]
fn hits_region(regions: &[(u64, u64)], start: u64, end: u64) -> bool {
    let idx = regions.partition_point(|&(_, e)| e <= start);
    idx < regions.len() && regions[idx].0 < end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::parse_records;
    use crate::interval::{Strand, Value};

    fn genome() -> Genome {
        Genome::from_pairs([("chr1", 1000), ("chr2", 500), ("chr3", 50)]).unwrap()
    }

    fn set(content: &str) -> IntervalSet {
        IntervalSet::from_records(
            parse_records(content).unwrap(),
            &[] as &[&str],
            &SetOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_random_intervals_valid() {
        let genome = genome();
        let out = RandomCommand::new(200, 40, 7).random_intervals(&genome).unwrap();

        assert_eq!(out.len(), 200);
        for rec in out.records() {
            assert_eq!(rec.len(), 40);
            assert!(rec.end() <= genome.chrom_size(rec.chrom()).unwrap());
        }
        assert!(out.check_sorted().is_ok());
    }

    #[test]
    fn test_random_deterministic() {
        let genome = genome();
        let first = RandomCommand::new(50, 10, 99).random_intervals(&genome).unwrap();
        let second = RandomCommand::new(50, 10, 99).random_intervals(&genome).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_random_length_policy() {
        let genome = genome();
        let cmd = RandomCommand::new(20, 100, 1);
        assert!(matches!(
            cmd.random_intervals(&genome),
            Err(BedError::InvalidLength { length: 100, .. })
        ));

        let out = cmd
            .clone()
            .with_length_policy(LengthPolicy::SkipShort)
            .random_intervals(&genome)
            .unwrap();
        assert!(out.records().iter().all(|r| r.chrom() != "chr3"));

        let too_long = RandomCommand::new(1, 5000, 1).with_length_policy(LengthPolicy::SkipShort);
        assert!(too_long.random_intervals(&genome).is_err());
    }

    #[test]
    fn test_exact_fit_has_one_position() {
        let genome = Genome::from_pairs([("chrM", 16)]).unwrap();
        let out = RandomCommand::new(5, 16, 3).random_intervals(&genome).unwrap();
        assert!(out.records().iter().all(|r| r.start() == 0 && r.end() == 16));
    }

    #[test]
    fn test_shuffle_preserves_length_and_attributes() {
        let genome = genome();
        let input = set("chr1\t100\t200\tgene\t5\t-\nchr2\t10\t60\tother\t1\t+\nchr3\t0\t50\n");

        let out = ShuffleCommand::new(11).shuffle(&input, &genome).unwrap();
        assert_eq!(out.len(), input.len());

        for rec in out.records() {
            assert!(rec.end() <= genome.chrom_size(rec.chrom()).unwrap());
            match rec.field("name") {
                Value::Str(name) if name == "gene" => {
                    assert_eq!((rec.chrom(), rec.len(), rec.strand), ("chr1", 100, Strand::Minus));
                }
                Value::Str(name) if name == "other" => {
                    assert_eq!((rec.chrom(), rec.len()), ("chr2", 50));
                }
                _ => assert_eq!((rec.chrom(), rec.start(), rec.end()), ("chr3", 0, 50)),
            }
        }

        let again = ShuffleCommand::new(11).shuffle(&input, &genome).unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn test_shuffle_genome_scope() {
        let genome = genome();
        let input = set("chr3\t0\t10\nchr3\t20\t30\nchr3\t30\t40\n");

        let out = ShuffleCommand::new(5)
            .with_scope(ShuffleScope::Genome)
            .shuffle(&input, &genome)
            .unwrap();
        for rec in out.records() {
            assert_eq!(rec.len(), 10);
            assert!(rec.end() <= genome.chrom_size(rec.chrom()).unwrap());
        }
    }

    #[test]
    fn test_shuffle_excluded_regions() {
        let genome = Genome::from_pairs([("chr1", 1000)]).unwrap();
        let input = set("chr1\t0\t10\nchr1\t100\t120\nchr1\t500\t505\n");
        let excluded = set("chr1\t0\t600\nchr1\t590\t900\n");

        let out = ShuffleCommand::new(42)
            .with_excluded(excluded)
            .shuffle(&input, &genome)
            .unwrap();
        for rec in out.records() {
            assert!(rec.start() >= 900);
        }
    }

    #[test]
    fn test_shuffle_placement_failed() {
        let genome = Genome::from_pairs([("chr1", 100)]).unwrap();
        let input = set("chr1\t0\t10\n");
        let excluded = set("chr1\t0\t100\n");

        let result = ShuffleCommand::new(1)
            .with_excluded(excluded)
            .with_max_tries(25)
            .shuffle(&input, &genome);
        assert!(matches!(result, Err(BedError::PlacementFailed { tries: 25, .. })));
    }

    #[test]
    fn test_shuffle_too_long_for_chromosome() {
        let genome = Genome::from_pairs([("chr1", 100)]).unwrap();
        let input = set("chr1\t0\t150\n");
        assert!(matches!(
            ShuffleCommand::new(1).shuffle(&input, &genome),
            Err(BedError::InvalidLength { length: 150, .. })
        ));
    }

    #[test]
    fn test_hits_region() {
        let regions = [(10, 20), (30, 40)];
        assert!(!hits_region(&regions, 0, 10));
        assert!(hits_region(&regions, 15, 16));
        assert!(!hits_region(&regions, 20, 30));
        assert!(hits_region(&regions, 25, 31));
        assert!(!hits_region(&regions, 40, 50));
    }
}
