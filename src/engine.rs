//! Sweep-line engine shared by every two-set operation.
//!
//! Both sets are sorted per group. Groups are matched by key, then each
//! group is split into per-chromosome partitions that are swept
//! independently (and in parallel for large inputs). Within a partition,
//! [`for_each_overlap`] walks A once while keeping an active window over B,
//! so B is never rescanned from its beginning.

use crate::bed::{BedError, Result};
use crate::interval::{BedRecord, Value};
use crate::interval_set::IntervalSet;
use crate::parallel::{chromosome_runs, run_partitions};

/// A query record paired with a matched record, or with nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlapPair<'a> {
    pub query: &'a BedRecord,
    pub matched: Option<&'a BedRecord>,
    /// Overlapping bases; 0 for a missing or non-overlapping match.
    pub overlap: u64,
    /// Signed distance from query to match, when one exists.
    pub distance: Option<i64>,
}

impl<'a> OverlapPair<'a> {
    pub fn new(query: &'a BedRecord, matched: &'a BedRecord) -> Self {
        Self {
            query,
            matched: Some(matched),
            overlap: query.interval.overlap_length(&matched.interval),
            distance: query.interval.signed_distance(&matched.interval),
        }
    }

    pub fn unmatched(query: &'a BedRecord) -> Self {
        Self {
            query,
            matched: None,
            overlap: 0,
            distance: None,
        }
    }
}

/// One unit of sweep work: A and B records of a single group and chromosome.
pub type Partition<'a> = (&'a [BedRecord], &'a [BedRecord]);

/// Fail with `GroupMismatch` unless both sets use the same group keys.
pub fn check_compatible(a: &IntervalSet, b: &IntervalSet) -> Result<()> {
    if a.group_keys() != b.group_keys() {
        return Err(BedError::GroupMismatch {
            left: a.group_keys().to_vec(),
            right: b.group_keys().to_vec(),
        });
    }
    Ok(())
}

/// Pair every (group, chromosome) run of A with the matching run of B.
///
/// A runs without a counterpart get an empty B slice, so operations such as
/// subtract can still pass A through.
pub fn partitions<'a>(a: &'a IntervalSet, b: &'a IntervalSet) -> Result<Vec<Partition<'a>>> {
    check_compatible(a, b)?;
    a.check_sorted()?;
    b.check_sorted()?;

    let mut parts = Vec::new();
    for (key, a_group) in a.grouped_view() {
        let b_runs = b.group(key).map(chromosome_runs).unwrap_or_default();
        for (chrom, a_run) in chromosome_runs(a_group) {
            let b_run = b_runs
                .binary_search_by(|(c, _)| (*c).cmp(chrom))
                .map(|i| b_runs[i].1)
                .unwrap_or(&[]);
            parts.push((a_run, b_run));
        }
    }
    Ok(parts)
}

/// Run `f` on every partition and concatenate the outputs in group order.
pub fn sweep<'a, T, F>(a: &'a IntervalSet, b: &'a IntervalSet, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&'a [BedRecord], &'a [BedRecord]) -> Vec<T> + Sync + Send,
{
    let parts = partitions(a, b)?;
    Ok(run_partitions(parts, a.len() + b.len(), |(a_run, b_run)| {
        f(a_run, b_run)
    }))
}

/// Visit each A record with the B records overlapping it, in B order.
///
/// Both slices must be sorted by (start, end) on one chromosome. B records
/// enter the active window once their start is below the current A end and
/// leave it once their end is at or before the current A start; since A
/// starts never decrease, a retired record cannot overlap any later A.
///
/// The window stays sorted by start, so the hits are its prefix of records
/// starting before the A end. Retirement still walks the whole window, so
/// the cost is O(n + m + total window size over all A). A long A followed by
/// many short A nested inside it keeps every B it pulled in live until an A
/// starts past that B's end.
pub fn for_each_overlap<'a, F>(a_sorted: &'a [BedRecord], b_sorted: &'a [BedRecord], mut visit: F)
where
    F: FnMut(&'a BedRecord, &[&'a BedRecord]),
{
    let mut next_b = 0;
    let mut active: Vec<&'a BedRecord> = Vec::with_capacity(64);

    for a in a_sorted {
        while next_b < b_sorted.len() && b_sorted[next_b].start() < a.end() {
            active.push(&b_sorted[next_b]);
            next_b += 1;
        }
        active.retain(|b| b.end() > a.start());

        // A later A may end before an earlier one, so the window can hold
        // records starting past this A's end.
        let n_hits = active.partition_point(|b| b.start() < a.end());
        visit(a, &active[..n_hits]);
    }
}

/// Render a pair as an output record.
///
/// The row keeps the query's interval and strand. Query attributes get a
/// `.x` suffix; the match contributes `start.y`, `end.y`, `strand.y` and its
/// attributes with a `.y` suffix (all missing for an unmatched pair, using
/// `b_columns` as the match's attribute names), followed by `.overlap`.
pub fn pair_record(pair: &OverlapPair<'_>, b_columns: &[String]) -> BedRecord {
    let query = pair.query;
    let mut record = BedRecord::new(query.chrom(), query.start(), query.end())
        .with_strand(query.strand);

    for (key, value) in query.attrs.iter() {
        record.attrs.insert(format!("{}.x", key), value.clone());
    }

    match pair.matched {
        Some(m) => {
            record.attrs.insert("start.y", m.start());
            record.attrs.insert("end.y", m.end());
            record.attrs.insert("strand.y", m.strand.as_str());
            for column in b_columns {
                let value = m.attrs.get(column).cloned().unwrap_or(Value::Missing);
                record.attrs.insert(format!("{}.y", column), value);
            }
            record.attrs.insert(".overlap", pair.overlap);
        }
        None => {
            record.attrs.insert("start.y", Value::Missing);
            record.attrs.insert("end.y", Value::Missing);
            record.attrs.insert("strand.y", Value::Missing);
            for column in b_columns {
                record.attrs.insert(format!("{}.y", column), Value::Missing);
            }
            record.attrs.insert(".overlap", Value::Missing);
        }
    }
    record
}

/// Group keys of a paired output set: pseudo-columns keep their name,
/// attribute keys follow the query's `.x` suffix.
pub fn paired_group_keys(keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|k| match k.as_str() {
            "chrom" | "strand" => k.clone(),
            _ => format!("{}.x", k),
        })
        .collect()
}
