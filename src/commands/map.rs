//! Map command implementation - summarise overlapping B values onto A.

use crate::aggregate::{check_summary_names, Summary};
use crate::bed::{BedError, Result};
use crate::config::UnmatchedPolicy;
use crate::engine::{for_each_overlap, sweep};
use crate::interval::{BedRecord, Value};
use crate::interval_set::{IntervalSet, SetOptions};
use log::info;

/// Map command configuration.
#[derive(Debug, Clone)]
pub struct MapCommand {
    /// Output columns computed from the overlapping B records
    pub summaries: Vec<Summary>,
    /// How A records without any overlap are reported
    pub unmatched: UnmatchedPolicy,
    /// Result for an empty value list when the reducer has no own default
    pub empty_value: Value,
}

impl MapCommand {
    pub fn new(summaries: Vec<Summary>) -> Self {
        Self {
            summaries,
            unmatched: UnmatchedPolicy::EmitNull,
            empty_value: Value::Missing,
        }
    }

    pub fn with_unmatched(mut self, unmatched: UnmatchedPolicy) -> Self {
        self.unmatched = unmatched;
        self
    }

    pub fn with_empty_value(mut self, value: Value) -> Self {
        self.empty_value = value;
        self
    }

    /// Each A record with one extra column per summary.
    pub fn map(&self, a: &IntervalSet, b: &IntervalSet) -> Result<IntervalSet> {
        if self.summaries.is_empty() {
            return Err(BedError::InvalidArgument(
                "map needs at least one summary".to_string(),
            ));
        }
        check_summary_names(&self.summaries)?;
        let existing = a.columns();
        if let Some(clash) = self.summaries.iter().find(|s| {
            matches!(s.name.as_str(), "chrom" | "start" | "end" | "strand")
                || a.group_keys().contains(&s.name)
                || existing.contains(&s.name)
        }) {
            return Err(BedError::InvalidArgument(format!(
                "summary '{}' collides with an existing column",
                clash.name
            )));
        }

        let rows = sweep(a, b, |a_run, b_run| {
            let mut out: Vec<BedRecord> = Vec::with_capacity(a_run.len());
            for_each_overlap(a_run, b_run, |query, hits| {
                if hits.is_empty() && self.unmatched == UnmatchedPolicy::Omit {
                    return;
                }
                let mut row = query.clone();
                for summary in &self.summaries {
                    let value = summary.apply(hits.iter().copied(), &self.empty_value);
                    row.attrs.insert(summary.name.as_str(), value);
                }
                out.push(row);
            });
            out
        })?;
        info!("map: {} A x {} B -> {} rows", a.len(), b.len(), rows.len());

        IntervalSet::from_records(rows, a.group_keys(), &SetOptions::default())
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

    fn summaries() -> Vec<Summary> {
        vec![
            Summary::new("total", "score", "sum").unwrap(),
            Summary::new("hits", "score", "count").unwrap(),
            Summary::new("names", "name", "concat").unwrap(),
        ]
    }

    #[test]
    fn test_map_overlapping_values() {
        let a = set("chr1\t100\t200\tgene\nchr1\t500\t600\tlonely\n", &[]);
        let b = set(
            "chr1\t90\t110\tp1\t3\nchr1\t150\t160\tp2\t4\nchr1\t200\t210\tp3\t100\n",
            &[],
        );

        let out = MapCommand::new(summaries()).map(&a, &b).unwrap();
        assert_eq!(out.len(), 2);

        let gene = &out.records()[0];
        assert_eq!(gene.field("name"), Value::from("gene"));
        assert_eq!(gene.field("total"), Value::Num(7.0));
        assert_eq!(gene.field("hits"), Value::Num(2.0));
        assert_eq!(gene.field("names"), Value::from("p1,p2"));

        let lonely = &out.records()[1];
        assert!(lonely.field("total").is_missing());
        assert_eq!(lonely.field("hits"), Value::Num(0.0));
    }

    #[test]
    fn test_map_empty_value_and_omit() {
        let a = set("chr1\t100\t200\nchr2\t0\t10\n", &[]);
        let b = set("chr1\t150\t160\tp\t1\n", &[]);

        let filled = MapCommand::new(summaries())
            .with_empty_value(Value::Num(0.0))
            .map(&a, &b)
            .unwrap();
        assert_eq!(filled.records()[1].field("total"), Value::Num(0.0));

        let omitted = MapCommand::new(summaries())
            .with_unmatched(UnmatchedPolicy::Omit)
            .map(&a, &b)
            .unwrap();
        assert_eq!(omitted.len(), 1);
    }

    #[test]
    fn test_map_respects_groups() {
        let a = set("chr1\t0\t100\ta\t0\t+\n", &["strand"]);
        let b = set("chr1\t10\t20\tx\t5\t+\nchr1\t30\t40\ty\t9\t-\n", &["strand"]);

        let out = MapCommand::new(summaries()).map(&a, &b).unwrap();
        assert_eq!(out.records()[0].field("total"), Value::Num(5.0));
    }

    #[test]
    fn test_map_rejects_column_clash() {
        let a = set("chr1\t0\t100\tg1\t1\n", &["name"]);
        let b = set("chr1\t10\t20\tx\t5\n", &["name"]);

        for name in ["name", "score", "start"] {
            let summaries = vec![Summary::new(name, "score", "sum").unwrap()];
            assert!(matches!(
                MapCommand::new(summaries).map(&a, &b),
                Err(BedError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_map_requires_summaries() {
        let a = set("chr1\t0\t100\n", &[]);
        assert!(matches!(
            MapCommand::new(Vec::new()).map(&a, &a),
            Err(BedError::InvalidArgument(_))
        ));
    }
}
