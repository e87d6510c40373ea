// Primitives shared by the CSV and Excel readers.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use log::debug;
use regex::Regex;
use rust_decimal::Decimal;
use snafu::prelude::*;

use crate::cf::*;

pub const TRANS_DATE: &str = "TransDate";
pub const CONTACT_TYPE: &str = "Contact Type";
pub const CANDIDATE: &str = "Cand/Committee";
pub const NAME: &str = "Name";
pub const AMOUNT: &str = "Amount";
pub const ELECTION_YEAR: &str = "Election Year";
pub const ZIP_CODE: &str = "ZipCode";

const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// The form of a header used for matching: no byte order mark, no trailing
/// colon, no surrounding spaces, lowercase.
pub fn normalize_header(h: &str) -> String {
    h.trim_start_matches('\u{feff}')
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_ascii_lowercase()
}

/// The position of each column in the source.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Columns {
    pub trans_date: usize,
    pub contact_type: usize,
    pub candidate: usize,
    pub name: usize,
    pub amount: usize,
    pub election_year: usize,
    pub zip_code: Option<usize>,
}

impl Columns {
    pub fn from_header<S: AsRef<str>>(header: &[S], path: &str) -> LoadResult<Columns> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h.as_ref())).collect();
        debug!("from_header: {}: {:?}", simplify_file_name(path), normalized);
        let find = |name: &str| {
            let target = normalize_header(name);
            normalized.iter().position(|h| *h == target)
        };

        let mut missing: Vec<String> = Vec::new();
        let mut required = |name: &str| match find(name) {
            Some(idx) => idx,
            None => {
                missing.push(name.to_string());
                0
            }
        };
        let trans_date = required(TRANS_DATE);
        let contact_type = required(CONTACT_TYPE);
        let candidate = required(CANDIDATE);
        let name = required(NAME);
        let amount = required(AMOUNT);
        let election_year = required(ELECTION_YEAR);
        ensure!(missing.is_empty(), MissingColumnsSnafu { missing, path });

        Ok(Columns {
            trans_date,
            contact_type,
            candidate,
            name,
            amount,
            election_year,
            zip_code: find(ZIP_CODE),
        })
    }

    /// Assembles a record from a row. Cells missing at the end of short rows
    /// are read as blank.
    pub fn record<F>(&self, lineno: usize, cell: F) -> ParsedRecord
    where
        F: Fn(usize) -> Option<String>,
    {
        let get = |idx: usize| cell(idx).unwrap_or_default();
        ParsedRecord {
            lineno,
            trans_date: get(self.trans_date),
            contact_type: get(self.contact_type),
            candidate: get(self.candidate),
            name: get(self.name),
            amount: get(self.amount),
            election_year: get(self.election_year),
            zip_code: self.zip_code.map(|idx| get(idx)),
        }
    }
}

fn plausible(d: NaiveDate) -> Option<NaiveDate> {
    // "%Y" happily reads two-digit years as the first century.
    if d.year() >= 1000 {
        Some(d)
    } else {
        None
    }
}

/// Reads a date in any of the formats found in the filings.
///
/// Blank cells are not an error and give `Ok(None)`.
pub fn parse_date(s: &str) -> Result<Option<NaiveDate>, String> {
    let t = s.trim();
    if t.is_empty() {
        return Ok(None);
    }
    for fmt in DATE_FORMATS.iter() {
        if let Some(d) = NaiveDate::parse_from_str(t, fmt).ok().and_then(plausible) {
            return Ok(Some(d));
        }
    }
    for fmt in DATETIME_FORMATS.iter() {
        if let Some(d) = NaiveDateTime::parse_from_str(t, fmt)
            .ok()
            .map(|dt| dt.date())
            .and_then(plausible)
        {
            return Ok(Some(d));
        }
    }
    Err("not a recognized date".to_string())
}

pub fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Converts the serial number Excel uses for dates.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Day 60 is the nonexistent 1900-02-29, later days are shifted by it.
    if !serial.is_finite() || serial < 61.0 || serial >= 2_958_466.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Reads an amount such as `1,250.00`, `$40` or `(12.50)` (negative).
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let t = s.trim();
    let (negative, body) = if t.len() >= 2 && t.starts_with('(') && t.ends_with(')') {
        (true, &t[1..t.len() - 1])
    } else {
        (false, t)
    };
    let cleaned: String = body
        .chars()
        .filter(|c| *c != ',' && *c != '$' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = cleaned.parse::<Decimal>().ok()?;
    Some(if negative { -value } else { value })
}

/// Reads an election year. Spreadsheet tools write years as `2024.0` when the
/// column has blanks, which is accepted.
pub fn parse_election_year(s: &str) -> Result<Option<ElectionYear>, String> {
    let t = s.trim();
    if t.is_empty() {
        return Ok(None);
    }
    if let Ok(y) = t.parse::<ElectionYear>() {
        return Ok(Some(y));
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e6 => Ok(Some(f as ElectionYear)),
        _ => Err("not a year".to_string()),
    }
}

fn zip_code_regex() -> &'static Regex {
    static ZIP: OnceLock<Regex> = OnceLock::new();
    ZIP.get_or_init(|| Regex::new(r"\b\d{5}\b").expect("valid zip code pattern"))
}

/// The first standalone group of five digits, if any.
pub fn extract_zip_code(text: &str) -> Option<String> {
    zip_code_regex().find(text).map(|m| m.as_str().to_string())
}
