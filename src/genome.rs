//! Genome registry: validated chromosome sizes.
//!
//! Parses .genome files (tab-delimited: chrom\tsize) and bounds interval
//! coordinates against them.

use std::fs;
use std::path::Path;

use log::warn;
use rustc_hash::FxHashMap;

use crate::bed::{split_fields, BedError, Result};
use crate::config::BoundsPolicy;
use crate::interval::Interval;

/// Genome information containing chromosome sizes.
/// Preserves chromosome order from input. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    /// Map of chromosome name to size
    sizes: FxHashMap<String, u64>,
    /// Chromosome order (preserves input order)
    order: Vec<String>,
}

impl Genome {
    /// Build a genome from (name, length) pairs.
    ///
    /// Fails with [`BedError::InvalidGenome`] on a duplicate name or a
    /// non-positive length.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut sizes = FxHashMap::default();
        let mut order = Vec::new();

        for (name, length) in pairs {
            let name = name.into();
            if name.is_empty() {
                return Err(BedError::InvalidGenome(
                    "chromosome name must not be empty".to_string(),
                ));
            }
            if length <= 0 {
                return Err(BedError::InvalidGenome(format!(
                    "chromosome '{}' has non-positive length {}",
                    name, length
                )));
            }
            if sizes.contains_key(&name) {
                return Err(BedError::InvalidGenome(format!(
                    "duplicate chromosome '{}'",
                    name
                )));
            }
            order.push(name.clone());
            sizes.insert(name, length as u64);
        }

        Ok(Self { sizes, order })
    }

    /// Parse a genome table from text.
    /// Format: tab-delimited with chrom\tsize per line
    pub fn parse(content: &str) -> Result<Self> {
        let mut pairs = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = split_fields(line);
            if fields.len() < 2 {
                return Err(BedError::MalformedRecord {
                    line: line_num + 1,
                    message: "Genome file requires two columns: chrom and size".to_string(),
                });
            }

            let size: i64 = fields[1].trim().parse().map_err(|_| BedError::MalformedRecord {
                line: line_num + 1,
                message: format!("Invalid chromosome size: {}", fields[1]),
            })?;
            pairs.push((fields[0].to_string(), size));
        }

        Self::from_pairs(pairs)
    }

    /// Load genome from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Get the size of a chromosome.
    #[inline]
    pub fn chrom_size(&self, chrom: &str) -> Option<u64> {
        self.sizes.get(chrom).copied()
    }

    /// Check if a chromosome exists.
    #[inline]
    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.sizes.contains_key(chrom)
    }

    /// Get all chromosome names in order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Iterate (name, size) in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.order.iter().map(move |c| (c.as_str(), self.sizes[c]))
    }

    /// Get number of chromosomes.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Sum of all chromosome sizes.
    pub fn total_size(&self) -> u64 {
        self.sizes.values().sum()
    }

    /// Bound `[start, end)` on `chrom` according to `policy`.
    ///
    /// `Reject` fails if the interval extends past the chromosome end. `Clip`
    /// clamps the end and fails only if nothing is left. An unknown
    /// chromosome is always out of bounds.
    pub fn bound(&self, chrom: &str, start: u64, end: u64, policy: BoundsPolicy) -> Result<(u64, u64)> {
        let interval = || Interval::new(chrom, start, end).to_string().replace('\t', ":");
        let size = self.chrom_size(chrom).ok_or_else(|| BedError::OutOfBounds {
            interval: interval(),
            message: format!("chromosome '{}' is not in the genome", chrom),
        })?;

        if end <= size {
            return Ok((start, end));
        }

        match policy {
            BoundsPolicy::Reject => Err(BedError::OutOfBounds {
                interval: interval(),
                message: format!("end exceeds chromosome length {}", size),
            }),
            BoundsPolicy::Clip if start < size => {
                warn!("clipping {} to chromosome length {}", interval(), size);
                Ok((start, size))
            }
            BoundsPolicy::Clip => Err(BedError::OutOfBounds {
                interval: interval(),
                message: format!("start lies beyond chromosome length {}", size),
            }),
        }
    }

    /// Check that an interval lies within its chromosome.
    pub fn validate(&self, interval: &Interval) -> Result<()> {
        self.bound(&interval.chrom, interval.start, interval.end, BoundsPolicy::Reject)
            .map(|_| ())
    }
}
