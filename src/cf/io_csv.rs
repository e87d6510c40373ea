// Primitives for reading CSV files.

use std::fs::File;

use csv::StringRecord;
use log::debug;
use snafu::prelude::*;

use crate::cf::io_common::{simplify_file_name, Columns};
use crate::cf::*;

/// Reads all the transactions of a CSV export. The first line is the header.
pub fn read_csv_records(path: &str) -> LoadResult<Vec<ParsedRecord>> {
    let mut records = get_records(path)?;

    let header: StringRecord = match records.next() {
        Some(line_r) => line_r.context(CsvLineParseSnafu { path, lineno: 1_usize })?,
        None => StringRecord::new(),
    };
    let header_cells: Vec<&str> = header.iter().collect();
    let columns = Columns::from_header(&header_cells, path)?;

    let mut res: Vec<ParsedRecord> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is on the first line.
        let default_lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {
            path,
            lineno: default_lineno,
        })?;
        let lineno = line
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(default_lineno);
        if line.iter().all(|s| s.trim().is_empty()) {
            debug!("read_csv_records: lineno {}: skipping blank row", lineno);
            continue;
        }
        let pr = columns.record(lineno, |i| line.get(i).map(|s| s.to_string()));
        res.push(pr);
    }
    debug!(
        "read_csv_records: {}: {} records",
        simplify_file_name(path),
        res.len()
    );
    Ok(res)
}

fn get_records(path: &str) -> LoadResult<csv::StringRecordsIntoIter<File>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    Ok(rdr.into_records())
}
