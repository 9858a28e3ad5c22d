//! Tabular alignment output readers
//!
//! Two line-oriented formats are consumed:
//!
//! * [`TabularFormat::Standard`]: tab-separated, ten columns
//!   (`qseqid sseqid pident length qstart qend sstart send evalue bitscore`).
//! * [`TabularFormat::Extended`]: whitespace-separated, twelve columns with
//!   mismatches and gaps, `#` comment lines.
//!
//! Only the percent identity and the two subject coordinates are kept. The
//! subject coordinates arrive 1-based and inclusive, in reverse order for
//! reverse-strand hits; records are normalized to a 0-based half-open interval.

use crate::error::BenchError;
use crate::input::open_input;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

/// Minimum number of columns an extended line needs to carry a record
pub const EXTENDED_MIN_FIELDS: usize = 12;

/// One alignment segment on the reference, normalized to `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentRecord {
    /// 0-based first covered base
    pub start: u64,
    /// Exclusive end
    pub end: u64,
    /// Percent identity in [0, 100]
    pub identity: f64,
}

impl AlignmentRecord {
    /// Normalize raw 1-based inclusive subject coordinates given in either order
    pub fn from_subject_coords(subject_start: u64, subject_end: u64, identity: f64) -> Self {
        let low = subject_start.min(subject_end);
        let high = subject_start.max(subject_end);
        AlignmentRecord {
            start: low.saturating_sub(1),
            end: high,
            identity,
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The two output layouts, one per aligner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Standard,
    Extended,
}

impl TabularFormat {
    /// Column indices of (identity, subject start, subject end)
    fn columns(self) -> (usize, usize, usize) {
        match self {
            TabularFormat::Standard => (2, 6, 7),
            TabularFormat::Extended => (2, 8, 9),
        }
    }
}

impl FromStr for TabularFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" | "blast" | "outfmt6" => Ok(TabularFormat::Standard),
            "extended" | "blastn" | "lastz" => Ok(TabularFormat::Extended),
            _ => Err(format!(
                "Unknown tabular format '{s}'. Use 'standard' or 'extended'"
            )),
        }
    }
}

impl std::fmt::Display for TabularFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabularFormat::Standard => write!(f, "standard"),
            TabularFormat::Extended => write!(f, "extended"),
        }
    }
}

/// Lazy reader yielding normalized records in input order
pub struct TabularReader<R: BufRead> {
    reader: R,
    format: TabularFormat,
    line: String,
    line_number: usize,
}

impl<R: BufRead> TabularReader<R> {
    pub fn new(format: TabularFormat, reader: R) -> Self {
        TabularReader {
            reader,
            format,
            line: String::new(),
            line_number: 0,
        }
    }

    pub fn format(&self) -> TabularFormat {
        self.format
    }

    /// Next record, skipping lines that carry none. `Ok(None)` at end of input.
    pub fn read_record(&mut self) -> Result<Option<AlignmentRecord>, BenchError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let record = match self.format {
                TabularFormat::Standard => parse_standard(&self.line, self.line_number)?,
                TabularFormat::Extended => parse_extended(&self.line, self.line_number)?,
            };
            if record.is_some() {
                return Ok(record);
            }
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<AlignmentRecord>, BenchError> {
        let mut records = Vec::new();
        while let Some(record) = self.read_record()? {
            records.push(record);
        }
        Ok(records)
    }
}

impl<R: BufRead> Iterator for TabularReader<R> {
    type Item = Result<AlignmentRecord, BenchError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Reader over in-memory tool output
pub fn parse_output(format: TabularFormat, text: &str) -> TabularReader<&[u8]> {
    TabularReader::new(format, text.as_bytes())
}

/// Reader over a saved output file (auto-detects bgzip compression)
pub fn open_tabular<P: AsRef<Path>>(
    format: TabularFormat,
    path: P,
) -> Result<TabularReader<Box<dyn BufRead>>, BenchError> {
    Ok(TabularReader::new(format, open_input(path)?))
}

fn parse_standard(line: &str, line_number: usize) -> Result<Option<AlignmentRecord>, BenchError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split('\t').collect();
    extract(&fields, TabularFormat::Standard, line_number).map(Some)
}

fn parse_extended(line: &str, line_number: usize) -> Result<Option<AlignmentRecord>, BenchError> {
    if line.starts_with('#') {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    // Short lines are informational, not records
    if fields.len() < EXTENDED_MIN_FIELDS {
        return Ok(None);
    }
    extract(&fields, TabularFormat::Extended, line_number).map(Some)
}

fn extract(
    fields: &[&str],
    format: TabularFormat,
    line: usize,
) -> Result<AlignmentRecord, BenchError> {
    let (identity_col, start_col, end_col) = format.columns();

    let identity: f64 = parse_field(fields, identity_col, "percent identity", line)?;
    if !identity.is_finite() {
        return Err(BenchError::Parse {
            line,
            field: "percent identity",
            value: fields[identity_col].to_string(),
        });
    }
    let subject_start = parse_coordinate(fields, start_col, "subject start", line)?;
    let subject_end = parse_coordinate(fields, end_col, "subject end", line)?;

    Ok(AlignmentRecord::from_subject_coords(
        subject_start,
        subject_end,
        identity,
    ))
}

fn parse_field<T: FromStr>(
    fields: &[&str],
    index: usize,
    field: &'static str,
    line: usize,
) -> Result<T, BenchError> {
    let raw = fields
        .get(index)
        .ok_or(BenchError::MissingField { line, field })?;
    raw.trim().parse().map_err(|_| BenchError::Parse {
        line,
        field,
        value: raw.to_string(),
    })
}

/// Subject coordinates are 1-based, so 0 is as malformed as non-numeric text
fn parse_coordinate(
    fields: &[&str],
    index: usize,
    field: &'static str,
    line: usize,
) -> Result<u64, BenchError> {
    let value: u64 = parse_field(fields, index, field, line)?;
    if value == 0 {
        return Err(BenchError::Parse {
            line,
            field,
            value: "0".to_string(),
        });
    }
    Ok(value)
}
