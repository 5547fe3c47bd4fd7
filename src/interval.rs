//! Core interval types for genomic region representation.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A genomic interval with chromosome, start, and end positions.
/// Uses 0-based, half-open coordinates (BED format).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Returns the length of the interval.
    #[inline]
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the interval has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if this interval overlaps with another.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    /// Compute the overlap length with another interval.
    #[inline]
    pub fn overlap_length(&self, other: &Interval) -> u64 {
        if !self.overlaps(other) {
            return 0;
        }
        self.end.min(other.end) - self.start.max(other.start)
    }

    /// Signed distance from this interval to `other`.
    ///
    /// Zero when the intervals overlap, negative when `other` lies upstream
    /// (lower coordinates), positive when it lies downstream. The magnitude
    /// is the number of bases separating the two.
    #[inline]
    pub fn signed_distance(&self, other: &Interval) -> Option<i64> {
        if self.chrom != other.chrom {
            return None;
        }
        if self.overlaps(other) {
            return Some(0);
        }
        if other.end <= self.start {
            Some(-((self.start - other.end) as i64))
        } else {
            Some((other.start - self.end) as i64)
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.chrom, self.start, self.end)
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chrom
            .cmp(&other.chrom)
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Strand {
    Plus,
    Minus,
    #[default]
    Unknown,
}

impl Strand {
    /// Parse a strand column value. Anything other than `+` or `-` is unknown.
    pub fn parse(s: &str) -> Self {
        match s {
            "+" => Strand::Plus,
            "-" => Strand::Minus,
            _ => Strand::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Unknown => ".",
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute cell.
///
/// Values are totally ordered (`Missing < Num < Str`, numbers by IEEE total
/// order) so that they can be used as group keys.
#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Str(String),
    Missing,
}

impl Value {
    /// Parse a raw text cell. Empty cells, `.` and `NA` are missing.
    ///
    /// Text becomes `Num` only when it is the canonical rendering of a finite
    /// number, so the cell prints back unchanged. Other numeric text such as
    /// `007` or `1.50` stays `Str` and still reduces numerically through
    /// [`Value::as_f64`].
    pub fn parse(s: &str) -> Self {
        match s {
            "" | "." | "NA" => return Value::Missing,
            _ => {}
        }
        match parse_finite(s) {
            Some(n) if Value::Num(n).to_string() == s => Value::Num(n),
            _ => Value::Str(s.to_string()),
        }
    }

    /// Numeric reading of the cell. Text cells count when they parse as a
    /// finite number.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => parse_finite(s),
            Value::Missing => None,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Missing => 0,
            Value::Num(_) => 1,
            Value::Str(_) => 2,
        }
    }
}

fn parse_finite(s: &str) -> Option<f64> {
    let numeric_lead = s
        .as_bytes()
        .first()
        .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.'));
    if !numeric_lead {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Num(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Num(n) => n.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                let mut buf = itoa::Buffer::new();
                f.write_str(buf.format(*n as i64))
            }
            Value::Num(n) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*n))
            }
            Value::Str(s) => f.write_str(s),
            Value::Missing => f.write_str("."),
        }
    }
}

/// Ordered attribute bag (column name -> value).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes(Vec<(String, Value)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Set a value, replacing an existing column in place or appending a new one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

/// The values of a record's group-key columns, in key order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GroupKey(pub Vec<Value>);

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<all>");
        }
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

/// An interval record with strand and arbitrary named attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct BedRecord {
    pub interval: Interval,
    pub strand: Strand,
    pub attrs: Attributes,
}

impl BedRecord {
    /// Create a minimal BED3 record.
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            interval: Interval::new(chrom, start, end),
            strand: Strand::Unknown,
            attrs: Attributes::new(),
        }
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key, value);
        self
    }

    /// Get the chromosome.
    #[inline]
    pub fn chrom(&self) -> &str {
        &self.interval.chrom
    }

    /// Get the start position.
    #[inline]
    pub fn start(&self) -> u64 {
        self.interval.start
    }

    /// Get the end position.
    #[inline]
    pub fn end(&self) -> u64 {
        self.interval.end
    }

    /// Get the interval length.
    #[inline]
    pub fn len(&self) -> u64 {
        self.interval.len()
    }

    /// Check if the interval is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.interval.is_empty()
    }

    /// Look up a column by name. `chrom`, `start`, `end` and `strand` resolve
    /// to the record's own fields; anything else is an attribute. Unknown
    /// columns are `Missing`.
    pub fn field(&self, name: &str) -> Value {
        match name {
            "chrom" => Value::Str(self.interval.chrom.clone()),
            "start" => Value::from(self.interval.start),
            "end" => Value::from(self.interval.end),
            "strand" => Value::Str(self.strand.as_str().to_string()),
            _ => self.attrs.get(name).cloned().unwrap_or(Value::Missing),
        }
    }

    /// Position ordering used by every sweep: (chrom, start, end).
    #[inline]
    pub fn cmp_position(&self, other: &BedRecord) -> Ordering {
        self.interval.cmp(&other.interval)
    }
}

impl fmt::Display for BedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.interval)?;
        if self.strand != Strand::Unknown {
            write!(f, "\t{}", self.strand)?;
        }
        for (_, value) in self.attrs.iter() {
            write!(f, "\t{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_overlap() {
        let a = Interval::new("chr1", 100, 200);
        let b = Interval::new("chr1", 150, 250);
        let c = Interval::new("chr1", 200, 300);
        let d = Interval::new("chr2", 100, 200);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // Adjacent, not overlapping
        assert!(!a.overlaps(&d)); // Different chromosome
        assert_eq!(a.overlap_length(&b), 50);
        assert_eq!(a.overlap_length(&c), 0);
    }

    #[test]
    fn test_signed_distance() {
        let a = Interval::new("chr1", 100, 200);

        assert_eq!(a.signed_distance(&Interval::new("chr1", 300, 310)), Some(100));
        assert_eq!(a.signed_distance(&Interval::new("chr1", 40, 90)), Some(-10));
        assert_eq!(a.signed_distance(&Interval::new("chr1", 150, 160)), Some(0));
        assert_eq!(a.signed_distance(&Interval::new("chr2", 150, 160)), None);
    }

    #[test]
    fn test_book_ended_distance() {
        // Touching records are zero bases apart without sharing a base.
        let a = Interval::new("chr1", 100, 200);
        let after = Interval::new("chr1", 200, 300);
        let before = Interval::new("chr1", 50, 100);

        assert!(!a.overlaps(&after));
        assert_eq!(a.signed_distance(&after), Some(0));
        assert_eq!(a.overlap_length(&after), 0);
        assert!(!a.overlaps(&before));
        assert_eq!(a.signed_distance(&before), Some(0));
    }

    #[test]
    fn test_interval_ordering() {
        let mut intervals = [
            Interval::new("chr2", 100, 200),
            Interval::new("chr1", 200, 300),
            Interval::new("chr1", 100, 200),
        ];
        intervals.sort();

        assert_eq!(intervals[0].chrom, "chr1");
        assert_eq!(intervals[0].start, 100);
        assert_eq!(intervals[1].start, 200);
        assert_eq!(intervals[2].chrom, "chr2");
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse("12"), Value::Num(12.0));
        assert_eq!(Value::parse("-0.5"), Value::Num(-0.5));
        assert_eq!(Value::parse("gene1"), Value::Str("gene1".into()));
        assert_eq!(Value::parse("inf"), Value::Str("inf".into()));
        assert!(Value::parse(".").is_missing());
        assert!(Value::parse("NA").is_missing());
    }

    #[test]
    fn test_value_parse_keeps_text() {
        for text in ["007", "1.50", "1e3", "+5", "-0"] {
            let value = Value::parse(text);
            assert_eq!(value, Value::Str(text.into()));
            assert_eq!(value.to_string(), text);
        }
        assert_eq!(Value::parse("1.50").as_f64(), Some(1.5));
        assert_eq!(Value::parse("1e3").as_f64(), Some(1000.0));
        assert_eq!(Value::parse("gene1").as_f64(), None);
        assert_eq!(Value::parse("0.25"), Value::Num(0.25));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Num(10.0).to_string(), "10");
        assert_eq!(Value::Num(2.5).to_string(), "2.5");
        assert_eq!(Value::Missing.to_string(), ".");
    }

    #[test]
    fn test_value_total_order() {
        let mut values = vec![
            Value::Str("b".into()),
            Value::Num(3.0),
            Value::Missing,
            Value::Num(-1.0),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Missing,
                Value::Num(-1.0),
                Value::Num(3.0),
                Value::Str("b".into())
            ]
        );
    }

    #[test]
    fn test_record_fields() {
        let rec = BedRecord::new("chr1", 10, 20)
            .with_strand(Strand::Minus)
            .with_attr("name", "g1")
            .with_attr("score", 5.0);

        assert_eq!(rec.field("chrom"), Value::from("chr1"));
        assert_eq!(rec.field("strand"), Value::from("-"));
        assert_eq!(rec.field("score"), Value::Num(5.0));
        assert!(rec.field("absent").is_missing());
        assert_eq!(rec.to_string(), "chr1\t10\t20\t-\tg1\t5");
    }

    #[test]
    fn test_attributes_insert_replaces() {
        let mut attrs = Attributes::new();
        attrs.insert("a", 1.0);
        attrs.insert("b", 2.0);
        attrs.insert("a", 3.0);

        let keys: Vec<_> = attrs.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(attrs.get("a"), Some(&Value::Num(3.0)));
    }
}
