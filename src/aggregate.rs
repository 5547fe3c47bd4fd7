//! Named reducers and group-by aggregation.
//!
//! A [`Reducer`] collapses a sequence of values into one. Reducers are looked
//! up by name in a [`ReducerRegistry`], so callers can extend the set without
//! an expression language. [`Aggregator`] groups result rows by join-key
//! columns and applies one [`Summary`] per output column.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::bed::{BedError, Result};
use crate::interval::{BedRecord, GroupKey, Value};
use crate::interval_set::IntervalSet;

/// Collapse a sequence of values into a single value.
///
/// `reduce` is only called with a non-empty slice of non-missing values.
pub trait Reducer: Send + Sync {
    fn reduce(&self, values: &[Value]) -> Value;

    /// Result for an empty input, if the reducer defines one.
    fn empty(&self) -> Option<Value> {
        None
    }
}

impl<F> Reducer for F
where
    F: Fn(&[Value]) -> Value + Send + Sync,
{
    fn reduce(&self, values: &[Value]) -> Value {
        self(values)
    }
}

/// Apply `reducer`, falling back to its own empty result and then to
/// `default` when there is nothing to reduce.
pub fn reduce_or(reducer: &dyn Reducer, values: &[Value], default: &Value) -> Value {
    if values.is_empty() {
        reducer.empty().unwrap_or_else(|| default.clone())
    } else {
        reducer.reduce(values)
    }
}

/// Built-in reducers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinReducer {
    Sum,
    Mean,
    Median,
    Min,
    Max,
    Variance,
    Sd,
    Count,
    NDistinct,
    Concat,
    Distinct,
    First,
    Last,
}

impl BuiltinReducer {
    pub const ALL: [BuiltinReducer; 13] = [
        BuiltinReducer::Sum,
        BuiltinReducer::Mean,
        BuiltinReducer::Median,
        BuiltinReducer::Min,
        BuiltinReducer::Max,
        BuiltinReducer::Variance,
        BuiltinReducer::Sd,
        BuiltinReducer::Count,
        BuiltinReducer::NDistinct,
        BuiltinReducer::Concat,
        BuiltinReducer::Distinct,
        BuiltinReducer::First,
        BuiltinReducer::Last,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sum" => Some(Self::Sum),
            "mean" => Some(Self::Mean),
            "median" => Some(Self::Median),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "variance" | "var" => Some(Self::Variance),
            "sd" => Some(Self::Sd),
            "count" => Some(Self::Count),
            "n_distinct" | "count_distinct" => Some(Self::NDistinct),
            "concat" | "collapse" => Some(Self::Concat),
            "distinct" => Some(Self::Distinct),
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Min => "min",
            Self::Max => "max",
            Self::Variance => "variance",
            Self::Sd => "sd",
            Self::Count => "count",
            Self::NDistinct => "n_distinct",
            Self::Concat => "concat",
            Self::Distinct => "distinct",
            Self::First => "first",
            Self::Last => "last",
        }
    }
}

fn numbers(values: &[Value]) -> Vec<f64> {
    values.iter().filter_map(Value::as_f64).collect()
}

fn sample_variance(nums: &[f64]) -> Option<f64> {
    if nums.len() < 2 {
        return None;
    }
    let n = nums.len() as f64;
    let mean = nums.iter().sum::<f64>() / n;
    Some(nums.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1.0))
}

fn joined<'a>(values: impl Iterator<Item = &'a Value>) -> Value {
    let parts: Vec<String> = values.map(|v| v.to_string()).collect();
    if parts.is_empty() {
        Value::Missing
    } else {
        Value::Str(parts.join(","))
    }
}

impl Reducer for BuiltinReducer {
    fn reduce(&self, values: &[Value]) -> Value {
        let numeric = |f: fn(&[f64]) -> Option<f64>| {
            let nums = numbers(values);
            if nums.is_empty() {
                return Value::Missing;
            }
            f(&nums).map(Value::Num).unwrap_or(Value::Missing)
        };

        match self {
            Self::Sum => numeric(|n| Some(n.iter().sum())),
            Self::Mean => numeric(|n| Some(n.iter().sum::<f64>() / n.len() as f64)),
            Self::Median => numeric(|n| {
                let mut sorted = n.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                Some(if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                })
            }),
            Self::Min => numeric(|n| n.iter().copied().reduce(f64::min)),
            Self::Max => numeric(|n| n.iter().copied().reduce(f64::max)),
            Self::Variance => numeric(sample_variance),
            Self::Sd => numeric(|n| sample_variance(n).map(f64::sqrt)),
            Self::Count => Value::from(values.len() as u64),
            Self::NDistinct => {
                let distinct: FxHashSet<&Value> = values.iter().collect();
                Value::from(distinct.len() as u64)
            }
            Self::Concat => joined(values.iter()),
            Self::Distinct => {
                let mut seen = FxHashSet::default();
                joined(values.iter().filter(|v| seen.insert(*v)))
            }
            Self::First => values.first().cloned().unwrap_or(Value::Missing),
            Self::Last => values.last().cloned().unwrap_or(Value::Missing),
        }
    }

    fn empty(&self) -> Option<Value> {
        match self {
            Self::Count | Self::NDistinct => Some(Value::Num(0.0)),
            _ => None,
        }
    }
}

/// Name -> reducer lookup, pre-populated with the built-ins.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducers: FxHashMap<String, Arc<dyn Reducer>>,
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ReducerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.reducers.keys().collect();
        names.sort();
        f.debug_struct("ReducerRegistry").field("reducers", &names).finish()
    }
}

impl ReducerRegistry {
    /// A registry holding the built-in reducers.
    pub fn builtin() -> Self {
        let reducers = BuiltinReducer::ALL
            .iter()
            .map(|r| (r.name().to_string(), Arc::new(*r) as Arc<dyn Reducer>))
            .collect();
        Self { reducers }
    }

    /// Add or replace a reducer.
    pub fn register(&mut self, name: impl Into<String>, reducer: impl Reducer + 'static) {
        self.reducers.insert(name.into(), Arc::new(reducer));
    }

    /// Look up a reducer by name. Built-in aliases (`collapse`, `var`, ...)
    /// resolve to their canonical reducer.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Reducer>> {
        if let Some(reducer) = self.reducers.get(name) {
            return Ok(Arc::clone(reducer));
        }
        BuiltinReducer::parse(name)
            .and_then(|b| self.reducers.get(b.name()).cloned())
            .ok_or_else(|| BedError::InvalidArgument(format!("unknown reducer '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }
}

/// One named output column: a reducer applied to one input column.
#[derive(Clone)]
pub struct Summary {
    pub name: String,
    pub column: String,
    reducer_name: String,
    reducer: Arc<dyn Reducer>,
}

impl fmt::Debug for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}({})", self.name, self.reducer_name, self.column)
    }
}

impl Summary {
    /// A summary using a built-in reducer.
    pub fn new(name: impl Into<String>, column: impl Into<String>, reducer: &str) -> Result<Self> {
        Self::with_registry(name, column, reducer, &ReducerRegistry::builtin())
    }

    /// A summary using a reducer from `registry`.
    pub fn with_registry(
        name: impl Into<String>,
        column: impl Into<String>,
        reducer: &str,
        registry: &ReducerRegistry,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            column: column.into(),
            reducer_name: reducer.to_string(),
            reducer: registry.get(reducer)?,
        })
    }

    /// Parse `NAME=COLUMN:REDUCER` or `COLUMN:REDUCER` (named `COLUMN_REDUCER`).
    pub fn parse(spec: &str, registry: &ReducerRegistry) -> Result<Self> {
        let (name, rest) = match spec.split_once('=') {
            Some((name, rest)) => (Some(name.trim()), rest),
            None => (None, spec),
        };
        let (column, reducer) = rest.split_once(':').ok_or_else(|| {
            BedError::InvalidArgument(format!(
                "summary '{}' must look like NAME=COLUMN:REDUCER",
                spec
            ))
        })?;
        let (column, reducer) = (column.trim(), reducer.trim());
        if column.is_empty() || name.is_some_and(str::is_empty) {
            return Err(BedError::InvalidArgument(format!("empty name in summary '{}'", spec)));
        }
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_{}", column, reducer));
        Self::with_registry(name, column, reducer, registry)
    }

    /// Reduce the non-missing values of this summary's column.
    pub fn apply<'a, I>(&self, records: I, default: &Value) -> Value
    where
        I: IntoIterator<Item = &'a BedRecord>,
    {
        let values: Vec<Value> = records
            .into_iter()
            .map(|r| r.field(&self.column))
            .filter(|v| !v.is_missing())
            .collect();
        reduce_or(self.reducer.as_ref(), &values, default)
    }
}

pub(crate) fn check_summary_names(summaries: &[Summary]) -> Result<()> {
    for (i, s) in summaries.iter().enumerate() {
        if summaries[..i].iter().any(|o| o.name == s.name) {
            return Err(BedError::InvalidArgument(format!(
                "duplicate output column '{}'",
                s.name
            )));
        }
    }
    Ok(())
}

/// A plain result table: one row per group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` in the named column.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// Group rows by join-key columns and summarise each group.
#[derive(Debug, Clone)]
pub struct Aggregator {
    join_keys: Vec<String>,
    summaries: Vec<Summary>,
    registry: ReducerRegistry,
    empty_value: Value,
}

impl Aggregator {
    pub fn new<S: AsRef<str>>(join_keys: &[S]) -> Self {
        Self {
            join_keys: join_keys.iter().map(|k| k.as_ref().to_string()).collect(),
            summaries: Vec::new(),
            registry: ReducerRegistry::builtin(),
            empty_value: Value::Missing,
        }
    }

    /// Use `registry` for reducers named in later `summarise` calls.
    pub fn with_registry(mut self, registry: ReducerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Value used when a group has no values for a reducer without an
    /// empty result. Defaults to missing.
    pub fn with_empty_value(mut self, value: Value) -> Self {
        self.empty_value = value;
        self
    }

    /// Add an output column `name` = `reducer(column)`.
    pub fn summarise(mut self, name: &str, column: &str, reducer: &str) -> Result<Self> {
        let summary = Summary::with_registry(name, column, reducer, &self.registry)?;
        self.summaries.push(summary);
        check_summary_names(&self.summaries)?;
        Ok(self)
    }

    /// Add a prepared summary.
    pub fn with_summary(mut self, summary: Summary) -> Result<Self> {
        self.summaries.push(summary);
        check_summary_names(&self.summaries)?;
        Ok(self)
    }

    /// One row per distinct join key, in key order.
    pub fn aggregate(&self, set: &IntervalSet) -> Result<Table> {
        if let Some(clash) = self
            .summaries
            .iter()
            .find(|s| self.join_keys.contains(&s.name))
        {
            return Err(BedError::InvalidArgument(format!(
                "output column '{}' collides with a join key",
                clash.name
            )));
        }

        let mut groups: FxHashMap<GroupKey, Vec<&BedRecord>> = FxHashMap::default();
        for record in set.records() {
            let key = GroupKey(self.join_keys.iter().map(|k| record.field(k)).collect());
            groups.entry(key).or_default().push(record);
        }

        let mut groups: Vec<_> = groups.into_iter().collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let columns = self
            .join_keys
            .iter()
            .cloned()
            .chain(self.summaries.iter().map(|s| s.name.clone()))
            .collect();

        let rows = groups
            .into_iter()
            .map(|(key, records)| {
                let mut row = key.0;
                for summary in &self.summaries {
                    row.push(summary.apply(records.iter().copied(), &self.empty_value));
                }
                row
            })
            .collect();

        Ok(Table { columns, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bed::parse_records;
    use crate::interval_set::SetOptions;

    fn nums(values: &[f64]) -> Vec<Value> {
        values.iter().map(|&v| Value::Num(v)).collect()
    }

    #[test]
    fn test_numeric_reducers() {
        let values = nums(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(BuiltinReducer::Sum.reduce(&values), Value::Num(10.0));
        assert_eq!(BuiltinReducer::Mean.reduce(&values), Value::Num(2.5));
        assert_eq!(BuiltinReducer::Median.reduce(&values), Value::Num(2.5));
        assert_eq!(BuiltinReducer::Min.reduce(&values), Value::Num(1.0));
        assert_eq!(BuiltinReducer::Max.reduce(&values), Value::Num(4.0));

        let var = BuiltinReducer::Variance.reduce(&values).as_f64().unwrap();
        assert!((var - 5.0 / 3.0).abs() < 1e-12);
        let sd = BuiltinReducer::Sd.reduce(&values).as_f64().unwrap();
        assert!((sd - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_variance_of_single_value_is_missing() {
        assert!(BuiltinReducer::Variance.reduce(&nums(&[7.0])).is_missing());
    }

    #[test]
    fn test_text_reducers() {
        let values = vec![Value::from("a"), Value::from("b"), Value::from("a")];

        assert_eq!(BuiltinReducer::Concat.reduce(&values), Value::from("a,b,a"));
        assert_eq!(BuiltinReducer::Distinct.reduce(&values), Value::from("a,b"));
        assert_eq!(BuiltinReducer::NDistinct.reduce(&values), Value::Num(2.0));
        assert_eq!(BuiltinReducer::Count.reduce(&values), Value::Num(3.0));
        assert_eq!(BuiltinReducer::First.reduce(&values), Value::from("a"));
        assert_eq!(BuiltinReducer::Last.reduce(&values), Value::from("a"));
        assert!(BuiltinReducer::Sum.reduce(&values).is_missing());
    }

    #[test]
    fn test_empty_policy() {
        let registry = ReducerRegistry::builtin();
        let count = registry.get("count").unwrap();
        let mean = registry.get("mean").unwrap();

        assert_eq!(reduce_or(count.as_ref(), &[], &Value::Missing), Value::Num(0.0));
        assert!(reduce_or(mean.as_ref(), &[], &Value::Missing).is_missing());
        assert_eq!(reduce_or(mean.as_ref(), &[], &Value::Num(0.0)), Value::Num(0.0));
    }

    #[test]
    fn test_registry_lookup_and_registration() {
        let mut registry = ReducerRegistry::builtin();
        assert!(registry.contains("collapse"));
        assert!(matches!(registry.get("mode"), Err(BedError::InvalidArgument(_))));

        registry.register("range", |values: &[Value]| {
            let nums = numbers(values);
            let lo = nums.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = nums.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            Value::Num(hi - lo)
        });
        let range = registry.get("range").unwrap();
        assert_eq!(range.reduce(&nums(&[3.0, 9.0, 4.0])), Value::Num(6.0));
    }

    #[test]
    fn test_summary_parse() {
        let registry = ReducerRegistry::builtin();
        let named = Summary::parse("avg=score:mean", &registry).unwrap();
        assert_eq!(named.name, "avg");
        assert_eq!(named.column, "score");

        let unnamed = Summary::parse("score:max", &registry).unwrap();
        assert_eq!(unnamed.name, "score_max");

        assert!(Summary::parse("score", &registry).is_err());
        assert!(Summary::parse("score:nope", &registry).is_err());
    }

    #[test]
    fn test_aggregate_by_join_key() {
        let content = "chr1\t0\t10\tw1\t1\nchr1\t10\t20\tw2\t4\nchr1\t20\t30\tw1\t3\n";
        let set = IntervalSet::from_records(
            parse_records(content).unwrap(),
            &[] as &[&str],
            &SetOptions::default(),
        )
        .unwrap();

        let table = Aggregator::new(&["name"])
            .summarise("total", "score", "sum")
            .unwrap()
            .summarise("n", "score", "count")
            .unwrap()
            .aggregate(&set)
            .unwrap();

        assert_eq!(table.columns, vec!["name", "total", "n"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(0, "name"), Some(&Value::from("w1")));
        assert_eq!(table.value(0, "total"), Some(&Value::Num(4.0)));
        assert_eq!(table.value(0, "n"), Some(&Value::Num(2.0)));
        assert_eq!(table.value(1, "total"), Some(&Value::Num(4.0)));
    }

    #[test]
    fn test_aggregate_missing_values_use_default() {
        let set = IntervalSet::from_records(
            vec![BedRecord::new("chr1", 0, 10).with_attr("v", Value::Missing)],
            &[] as &[&str],
            &SetOptions::default(),
        )
        .unwrap();

        let table = Aggregator::new(&["chrom"])
            .with_empty_value(Value::Num(-1.0))
            .summarise("m", "v", "mean")
            .unwrap()
            .summarise("c", "v", "count")
            .unwrap()
            .aggregate(&set)
            .unwrap();

        assert_eq!(table.value(0, "m"), Some(&Value::Num(-1.0)));
        assert_eq!(table.value(0, "c"), Some(&Value::Num(0.0)));
    }

    #[test]
    fn test_duplicate_output_names() {
        let result = Aggregator::new(&["name"])
            .summarise("x", "score", "sum")
            .unwrap()
            .summarise("x", "score", "max");
        assert!(result.is_err());
    }
}
