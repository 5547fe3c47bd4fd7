//! Grouped, sorted interval sets.
//!
//! An [`IntervalSet`] owns its records sorted by (group key, chrom, start,
//! end). The group key is an ordered list of column names fixed at
//! construction; every sweep operates on one group at a time and never
//! mixes groups.

use std::ops::Range;

use rustc_hash::FxHashSet;

use crate::aggregate::Summary;
use crate::bed::{parse_row, validate_columns, BedError, Result};
use crate::commands::MergeCommand;
use crate::config::{BoundsPolicy, SortPolicy};
use crate::genome::Genome;
use crate::interval::{BedRecord, GroupKey};
use crate::parallel::sort_records_by;

/// Construction options shared by every way of building a set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOptions<'g> {
    /// Validate (and optionally clip) coordinates against this genome.
    pub genome: Option<&'g Genome>,
    pub bounds: BoundsPolicy,
    pub sort: SortPolicy,
}

impl<'g> SetOptions<'g> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_genome(mut self, genome: &'g Genome) -> Self {
        self.genome = Some(genome);
        self
    }

    pub fn with_bounds(mut self, bounds: BoundsPolicy) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_sort(mut self, sort: SortPolicy) -> Self {
        self.sort = sort;
        self
    }
}

/// An immutable, grouped, per-group sorted collection of records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IntervalSet {
    records: Vec<BedRecord>,
    group_keys: Vec<String>,
    /// Contiguous record ranges per group, ascending by key.
    groups: Vec<(GroupKey, Range<usize>)>,
}

fn group_key_of(record: &BedRecord, keys: &[String]) -> GroupKey {
    GroupKey(keys.iter().map(|k| record.field(k)).collect())
}

fn is_sorted(records: &[BedRecord]) -> bool {
    records.windows(2).all(|w| w[0].cmp_position(&w[1]).is_le())
}

fn first_unsorted(records: &[BedRecord]) -> Option<usize> {
    records
        .windows(2)
        .position(|w| w[0].cmp_position(&w[1]).is_gt())
        .map(|i| i + 1)
}

impl IntervalSet {
    /// An empty, ungrouped set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from typed records.
    ///
    /// Records are validated (start < end, genome bounds when a genome is
    /// given), partitioned by `group_keys` and sorted within each group, or
    /// rejected with `UnsortedInput` under [`SortPolicy::Reject`].
    pub fn from_records<S: AsRef<str>>(
        mut records: Vec<BedRecord>,
        group_keys: &[S],
        options: &SetOptions<'_>,
    ) -> Result<Self> {
        let group_keys = check_group_keys(group_keys)?;

        for (i, record) in records.iter_mut().enumerate() {
            if record.start() >= record.end() {
                return Err(BedError::MalformedRecord {
                    line: i + 1,
                    message: format!(
                        "Start ({}) must be less than end ({})",
                        record.start(),
                        record.end()
                    ),
                });
            }
            if let Some(genome) = options.genome {
                let (start, end) =
                    genome.bound(record.chrom(), record.start(), record.end(), options.bounds)?;
                record.interval.start = start;
                record.interval.end = end;
            }
        }

        let mut keyed: Vec<(GroupKey, BedRecord)> = records
            .into_iter()
            .map(|r| (group_key_of(&r, &group_keys), r))
            .collect();
        // Stable: keeps each group's internal order for the check below.
        if !keyed.windows(2).all(|w| w[0].0 <= w[1].0) {
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
        }
        let (keys, mut records): (Vec<GroupKey>, Vec<BedRecord>) = keyed.into_iter().unzip();

        let mut groups: Vec<(GroupKey, Range<usize>)> = Vec::new();
        let mut begin = 0;
        for i in 1..=keys.len() {
            if i == keys.len() || keys[i] != keys[begin] {
                groups.push((keys[begin].clone(), begin..i));
                begin = i;
            }
        }

        for (key, range) in &groups {
            let slice = &mut records[range.clone()];
            if let Some(pos) = first_unsorted(slice) {
                match options.sort {
                    SortPolicy::Sort => sort_records_by(slice, |a, b| a.cmp_position(b)),
                    SortPolicy::Reject => {
                        return Err(BedError::UnsortedInput {
                            group: key.to_string(),
                            message: format!(
                                "{} at position {} comes after {}",
                                slice[pos].interval,
                                pos + 1,
                                slice[pos - 1].interval
                            )
                            .replace('\t', ":"),
                        })
                    }
                }
            }
        }

        Ok(Self {
            records,
            group_keys,
            groups,
        })
    }

    /// Build a set from raw string rows named by `columns`.
    ///
    /// The schema must start with `chrom`, `start`, `end`. A `strand` column
    /// fills the strand field; every other column becomes an attribute.
    pub fn from_rows<I, R, T, S, K>(
        rows: I,
        columns: &[S],
        group_keys: &[K],
        options: &SetOptions<'_>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[T]>,
        T: AsRef<str>,
        S: AsRef<str>,
        K: AsRef<str>,
    {
        validate_columns(columns)?;
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                let fields: Vec<&str> = row.as_ref().iter().map(|f| f.as_ref()).collect();
                parse_row(&fields, columns, i + 1)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_records(records, group_keys, options)
    }

    /// Records in storage order.
    #[inline]
    pub fn records(&self) -> &[BedRecord] {
        &self.records
    }

    /// Take the records out in storage order.
    pub fn into_records(self) -> Vec<BedRecord> {
        self.records
    }

    /// Names of the group-key columns.
    #[inline]
    pub fn group_keys(&self) -> &[String] {
        &self.group_keys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of groups.
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Records of one group, if present.
    pub fn group(&self, key: &GroupKey) -> Option<&[BedRecord]> {
        self.groups
            .binary_search_by(|(k, _)| k.cmp(key))
            .ok()
            .map(|i| &self.records[self.groups[i].1.clone()])
    }

    /// Lazy (key, records) view over the groups in key order. Each call
    /// starts from the first group.
    pub fn grouped_view(&self) -> GroupedView<'_> {
        GroupedView { set: self, next: 0 }
    }

    /// Attribute column names in first-seen order.
    pub fn columns(&self) -> Vec<String> {
        attribute_columns(&self.records)
    }

    /// Verify the per-group sort invariant.
    pub fn check_sorted(&self) -> Result<()> {
        for (key, range) in &self.groups {
            let slice = &self.records[range.clone()];
            if let Some(pos) = first_unsorted(slice) {
                return Err(BedError::UnsortedInput {
                    group: key.to_string(),
                    message: format!("record {} is out of order", pos + 1),
                });
            }
        }
        if !self.groups.windows(2).all(|w| w[0].0 < w[1].0) {
            return Err(BedError::UnsortedInput {
                group: "<all>".to_string(),
                message: "groups are not in key order".to_string(),
            });
        }
        Ok(())
    }

    /// The same records grouped by different keys.
    pub fn regroup<S: AsRef<str>>(&self, keys: &[S]) -> Result<Self> {
        Self::from_records(self.records.clone(), keys, &SetOptions::default())
    }

    /// The same records as a single group.
    pub fn ungroup(&self) -> Self {
        let mut records = self.records.clone();
        if !is_sorted(&records) {
            sort_records_by(&mut records, |a, b| a.cmp_position(b));
        }
        let groups = if records.is_empty() {
            Vec::new()
        } else {
            vec![(GroupKey::default(), 0..records.len())]
        };
        Self {
            records,
            group_keys: Vec::new(),
            groups,
        }
    }

    /// Coalesce overlapping or nearby records within each group.
    ///
    /// Records merge when the next one starts at most `max_gap` bases after
    /// the current end, so `max_gap = 0` also joins book-ended records.
    /// Attributes of merged records are combined by `summaries`.
    pub fn merge(&self, max_gap: u64, summaries: &[Summary]) -> Result<Self> {
        MergeCommand::new()
            .with_distance(max_gap)
            .with_summaries(summaries.to_vec())
            .merge(self)
    }
}

/// Attribute names across `records`, in first-seen order.
pub fn attribute_columns(records: &[BedRecord]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut columns = Vec::new();
    for record in records {
        for key in record.attrs.keys() {
            if !seen.contains(key) {
                seen.insert(key.to_string());
                columns.push(key.to_string());
            }
        }
    }
    columns
}

fn check_group_keys<S: AsRef<str>>(keys: &[S]) -> Result<Vec<String>> {
    let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
    for (i, key) in keys.iter().enumerate() {
        if key.is_empty() || key == "start" || key == "end" {
            return Err(BedError::InvalidArgument(format!(
                "'{}' cannot be used as a group key",
                key
            )));
        }
        if keys[..i].contains(key) {
            return Err(BedError::InvalidArgument(format!(
                "duplicate group key '{}'",
                key
            )));
        }
    }
    Ok(keys)
}

/// Iterator over the groups of an [`IntervalSet`].
#[derive(Debug, Clone)]
pub struct GroupedView<'a> {
    set: &'a IntervalSet,
    next: usize,
}

impl<'a> Iterator for GroupedView<'a> {
    type Item = (&'a GroupKey, &'a [BedRecord]);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, range) = self.set.groups.get(self.next)?;
        self.next += 1;
        Some((key, &self.set.records[range.clone()]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.set.groups.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GroupedView<'_> {}
