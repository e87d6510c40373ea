// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use crate::cf::io_common::{excel_serial_to_date, format_date, simplify_file_name, Columns};
use crate::cf::*;

/// Reads all the transactions of a worksheet. The first row is the header.
///
/// Without a worksheet name, the first worksheet of the workbook is used.
pub fn read_excel_records(
    path: &str,
    worksheet_name: Option<&str>,
) -> LoadResult<Vec<ParsedRecord>> {
    let wrange = get_range(path, worksheet_name)?;
    // Rows are numbered as in the spreadsheet.
    let first_row = wrange.start().map(|(r, _)| r as usize + 1).unwrap_or(1);

    let mut rows = wrange.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| cell_to_string(c, false)).collect(),
        None => Vec::new(),
    };
    debug!("read_excel_records: header: {:?}", header);
    let columns = Columns::from_header(&header, path)?;

    let mut res: Vec<ParsedRecord> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = first_row + idx + 1;
        if row.iter().all(|c| cell_to_string(c, false).trim().is_empty()) {
            continue;
        }
        let pr = columns.record(lineno, |i| {
            row.get(i)
                .map(|c| cell_to_string(c, i == columns.trans_date))
        });
        res.push(pr);
    }
    debug!(
        "read_excel_records: {}: {} records",
        simplify_file_name(path),
        res.len()
    );
    Ok(res)
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> LoadResult<Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    Ok(wrange)
}

/// The text of a cell. Numbers in the date column are Excel serial dates.
fn cell_to_string(cell: &DataType, is_date: bool) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Float(f) | DataType::DateTime(f) if is_date => excel_serial_to_date(*f)
            .map(format_date)
            .unwrap_or_else(|| f.to_string()),
        DataType::Int(i) if is_date => excel_serial_to_date(*i as f64)
            .map(format_date)
            .unwrap_or_else(|| i.to_string()),
        DataType::Float(f) | DataType::DateTime(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
