//! Delimited interval record parsing and output.
//!
//! This is the tabular boundary of the crate: rows of text come in, typed
//! [`BedRecord`]s go out, and result sets are rendered back to text.

use crate::aggregate::Table;
use crate::interval::{BedRecord, Strand, Value};
use crate::interval_set::{attribute_columns, IntervalSet, SetOptions};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors raised by parsing and by every engine operation.
#[derive(Error, Debug)]
pub enum BedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("Interval {interval} is out of bounds: {message}")]
    OutOfBounds { interval: String, message: String },

    #[error("Unsorted input in group {group}: {message}")]
    UnsortedInput { group: String, message: String },

    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    #[error("Invalid interval length {length}: {message}")]
    InvalidLength { length: u64, message: String },

    #[error("Group mismatch: query grouped by {left:?}, reference grouped by {right:?}")]
    GroupMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Could not place {interval} outside excluded regions after {tries} tries")]
    PlacementFailed { interval: String, tries: usize },
}

pub type Result<T> = std::result::Result<T, BedError>;

/// Column names assigned to BED fields 4-12 when no schema is given.
const BED_COLUMNS: [&str; 12] = [
    "chrom",
    "start",
    "end",
    "name",
    "score",
    "strand",
    "thick_start",
    "thick_end",
    "item_rgb",
    "block_count",
    "block_sizes",
    "block_starts",
];

/// Split a line on tabs.
#[inline]
pub fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::with_capacity(8);
    let mut last = 0;
    for pos in memchr::memchr_iter(b'\t', line.as_bytes()) {
        fields.push(&line[last..pos]);
        last = pos + 1;
    }
    fields.push(&line[last..]);
    fields
}

/// Default BED column names for a row with `n` fields. Fields past BED12 are
/// named `V13`, `V14`, ...
pub fn bed_columns(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match BED_COLUMNS.get(i) {
            Some(name) => name.to_string(),
            None => format!("V{}", i + 1),
        })
        .collect()
}

/// Check that a schema starts with `chrom`, `start`, `end` and has no
/// duplicate names.
pub fn validate_columns<S: AsRef<str>>(columns: &[S]) -> Result<()> {
    let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    if names.len() < 3 || names[..3] != ["chrom", "start", "end"] {
        return Err(BedError::InvalidArgument(format!(
            "column schema must start with chrom, start, end; got {:?}",
            names
        )));
    }
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(BedError::InvalidArgument(format!(
                "duplicate column '{}' in schema",
                name
            )));
        }
    }
    Ok(())
}

/// Parse one row of fields against a column schema.
///
/// `line` is only used to label errors.
pub fn parse_row<S: AsRef<str>>(fields: &[&str], columns: &[S], line: usize) -> Result<BedRecord> {
    if fields.len() != columns.len() {
        return Err(BedError::MalformedRecord {
            line,
            message: format!(
                "Expected {} fields, got {}",
                columns.len(),
                fields.len()
            ),
        });
    }
    if fields.len() < 3 {
        return Err(BedError::MalformedRecord {
            line,
            message: format!("Expected at least 3 fields, got {}", fields.len()),
        });
    }

    let start = parse_position(fields[1], "start", line)?;
    let end = parse_position(fields[2], "end", line)?;
    if start >= end {
        return Err(BedError::MalformedRecord {
            line,
            message: format!("Start ({}) must be less than end ({})", start, end),
        });
    }

    let mut record = BedRecord::new(fields[0], start, end);
    for (field, column) in fields.iter().zip(columns).skip(3) {
        let column = column.as_ref();
        if column == "strand" {
            record.strand = Strand::parse(field);
        } else {
            record.attrs.insert(column, Value::parse(field));
        }
    }
    Ok(record)
}

fn parse_position(s: &str, field_name: &str, line: usize) -> Result<u64> {
    s.trim().parse().map_err(|_| BedError::MalformedRecord {
        line,
        message: format!("Invalid {} position: '{}'", field_name, s),
    })
}

/// How a reader names the fields of each row.
#[derive(Debug, Clone)]
enum Schema {
    /// Standard BED names, sized by each row's field count.
    Bed,
    /// Fixed column names; every row must match their count.
    Fixed(Vec<String>),
    /// Names are taken from the first data line.
    Header,
}

/// A streaming reader of tab-delimited interval records.
pub struct BedReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
    schema: Schema,
}

impl BedReader<File> {
    /// Open a BED file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> BedReader<R> {
    /// Create a reader that names fields by BED convention.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
            schema: Schema::Bed,
        }
    }

    /// Require every row to match the given column names.
    pub fn with_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Result<Self> {
        validate_columns(columns)?;
        self.schema = Schema::Fixed(columns.iter().map(|c| c.as_ref().to_string()).collect());
        Ok(self)
    }

    /// Take column names from the first data line.
    pub fn with_header(mut self) -> Self {
        self.schema = Schema::Header;
        self
    }

    /// Column names in effect, once known.
    pub fn columns(&self) -> Option<&[String]> {
        match &self.schema {
            Schema::Fixed(columns) => Some(columns),
            _ => None,
        }
    }

    fn next_line(&mut self) -> Result<bool> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(false);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }
            return Ok(true);
        }
    }

    /// Read the next record.
    pub fn read_record(&mut self) -> Result<Option<BedRecord>> {
        if !self.next_line()? {
            return Ok(None);
        }

        if let Schema::Header = self.schema {
            let line = self.buffer.trim_end_matches(['\n', '\r']);
            let columns: Vec<String> = split_fields(line).iter().map(|s| s.to_string()).collect();
            validate_columns(&columns)?;
            self.schema = Schema::Fixed(columns);
            if !self.next_line()? {
                return Ok(None);
            }
        }

        let line = self.buffer.trim_end_matches(['\n', '\r']);
        let fields = split_fields(line);
        match &self.schema {
            Schema::Fixed(columns) => parse_row(&fields, columns, self.line_number).map(Some),
            _ => {
                let columns = bed_columns(fields.len());
                parse_row(&fields, &columns, self.line_number).map(Some)
            }
        }
    }

    /// Get an iterator over all records.
    pub fn records(self) -> BedRecordIter<R> {
        BedRecordIter { reader: self }
    }
}

/// Iterator over BED records.
pub struct BedRecordIter<R: Read> {
    reader: BedReader<R>,
}

impl<R: Read> Iterator for BedRecordIter<R> {
    type Item = Result<BedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read all BED records from a file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<BedRecord>> {
    let reader = BedReader::from_path(path)?;
    reader.records().collect()
}

/// Parse records from a string (useful for testing).
pub fn parse_records(content: &str) -> Result<Vec<BedRecord>> {
    BedReader::new(content.as_bytes()).records().collect()
}

/// Parse an interval set from a string using BED column names.
pub fn parse_set<S: AsRef<str>>(
    content: &str,
    group_keys: &[S],
    options: &SetOptions<'_>,
) -> Result<IntervalSet> {
    IntervalSet::from_records(parse_records(content)?, group_keys, options)
}

/// Read an interval set from a file. With `header`, the first data line
/// names the columns.
pub fn read_set<P: AsRef<Path>, S: AsRef<str>>(
    path: P,
    header: bool,
    group_keys: &[S],
    options: &SetOptions<'_>,
) -> Result<IntervalSet> {
    let mut reader = BedReader::from_path(path)?;
    if header {
        reader = reader.with_header();
    }
    let records = reader.records().collect::<Result<Vec<_>>>()?;
    IntervalSet::from_records(records, group_keys, options)
}

/// Write an interval set as tab-delimited rows.
pub fn write_set<W: io::Write>(writer: &mut W, set: &IntervalSet, header: bool) -> io::Result<()> {
    write_records(writer, set.records(), header)
}

/// Write records as tab-delimited rows. Missing attribute cells are written
/// as `.`. The strand column is present only if some record has a known
/// strand.
pub fn write_records<W: io::Write>(
    writer: &mut W,
    records: &[BedRecord],
    header: bool,
) -> io::Result<()> {
    let columns = attribute_columns(records);
    let with_strand = records.iter().any(|r| r.strand != Strand::Unknown);

    if header {
        write!(writer, "chrom\tstart\tend")?;
        if with_strand {
            write!(writer, "\tstrand")?;
        }
        for column in &columns {
            write!(writer, "\t{}", column)?;
        }
        writeln!(writer)?;
    }

    let mut line = String::with_capacity(256);
    for record in records {
        line.clear();
        line.push_str(record.chrom());
        line.push('\t');
        line.push_str(itoa::Buffer::new().format(record.start()));
        line.push('\t');
        line.push_str(itoa::Buffer::new().format(record.end()));
        if with_strand {
            line.push('\t');
            line.push_str(record.strand.as_str());
        }
        for column in &columns {
            line.push('\t');
            match record.attrs.get(column) {
                Some(value) => line.push_str(&value.to_string()),
                None => line.push('.'),
            }
        }
        line.push('\n');
        writer.write_all(line.as_bytes())?;
    }
    Ok(())
}

/// Write an aggregate table as tab-delimited rows.
pub fn write_table<W: io::Write>(writer: &mut W, table: &Table, header: bool) -> io::Result<()> {
    if header {
        writeln!(writer, "{}", table.columns.join("\t"))?;
    }
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", cells.join("\t"))?;
    }
    Ok(())
}
