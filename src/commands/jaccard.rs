//! Jaccard command implementation.
//!
//! Computes the Jaccard similarity of two sets over their merged bases.

use std::fmt;

use crate::bed::Result;
use crate::commands::{IntersectCommand, MergeCommand};
use crate::interval_set::IntervalSet;
use log::info;

/// Format a float like C's %g: 6 significant figures, trailing zeros trimmed
fn format_g(val: f64) -> String {
    if val == 0.0 {
        return "0".to_string();
    }

    let abs_val = val.abs();

    let precision = if abs_val >= 1.0 {
        let digits_before_decimal = abs_val.log10().floor() as i32 + 1;
        (6 - digits_before_decimal).max(0) as usize
    } else {
        let leading_zeros = (-abs_val.log10()).floor() as usize;
        leading_zeros + 6
    };

    let formatted = format!("{:.prec$}", val, prec = precision);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');

    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Base-level overlap statistics between two sets.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JaccardStats {
    /// Bases covered by both sets
    pub intersection: u64,
    /// Bases covered by either set
    pub union: u64,
    /// intersection / union, 0 when both sets are empty
    pub jaccard: f64,
    /// Overlapping pairs of merged intervals
    pub n_intersections: u64,
}

impl JaccardStats {
    pub const HEADER: &'static str = "intersection\tunion\tjaccard\tn_intersections";
}

impl fmt::Display for JaccardStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.intersection,
            self.union,
            format_g(self.jaccard),
            self.n_intersections
        )
    }
}

/// Jaccard command configuration.
#[derive(Debug, Clone, Default)]
pub struct JaccardCommand;

impl JaccardCommand {
    pub fn new() -> Self {
        Self
    }

    /// Merge each set within its groups, then compare bases group by group.
    pub fn jaccard(&self, a: &IntervalSet, b: &IntervalSet) -> Result<JaccardStats> {
        let merged_a = MergeCommand::new().merge(a)?;
        let merged_b = MergeCommand::new().merge(b)?;

        let pairs = IntersectCommand::new().pairs(&merged_a, &merged_b)?;
        let intersection: u64 = pairs.iter().map(|p| p.overlap).sum();
        let total = |set: &IntervalSet| set.records().iter().map(|r| r.len()).sum::<u64>();
        let union = total(&merged_a) + total(&merged_b) - intersection;

        let jaccard = if union > 0 {
            intersection as f64 / union as f64
        } else {
            0.0
        };
        info!("jaccard: {} / {} = {}", intersection, union, jaccard);

        Ok(JaccardStats {
            intersection,
            union,
            jaccard,
            n_intersections: pairs.len() as u64,
        })
    }
}
