// Writes the table of transactions back to CSV or Excel.

use log::info;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Workbook, XlsxError};
use snafu::prelude::*;

use campaign_finance::{Table, Transaction};

use crate::cf::io_common::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ExportError {
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error flushing CSV file {path}"))]
    CsvFlush {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing Excel file {path}"))]
    ExcelWrite { source: XlsxError, path: String },
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(name: &str) -> Option<ExportFormat> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "xlsx" | "excel" => Some(ExportFormat::Xlsx),
            _ => None,
        }
    }

    /// Excel for `.xlsx` files, CSV otherwise.
    pub fn from_path(path: &str) -> ExportFormat {
        if path.to_lowercase().ends_with(".xlsx") {
            ExportFormat::Xlsx
        } else {
            ExportFormat::Csv
        }
    }
}

/// The columns of an export, in order. The loaders read them back.
pub const EXPORT_COLUMNS: [&str; 7] = [
    TRANS_DATE,
    CONTACT_TYPE,
    CANDIDATE,
    NAME,
    AMOUNT,
    ELECTION_YEAR,
    ZIP_CODE,
];

pub fn export_table(table: &Table, path: &str, format: ExportFormat) -> Result<(), ExportError> {
    info!(
        "export_table: writing {} transactions to {:?} as {:?}",
        table.len(),
        path,
        format
    );
    match format {
        ExportFormat::Csv => export_csv(table.transactions(), path),
        ExportFormat::Xlsx => export_xlsx(table.transactions(), path),
    }
}

fn text_cells(tx: &Transaction) -> [String; 7] {
    [
        tx.date.map(format_date).unwrap_or_default(),
        tx.contact_type.as_str().to_string(),
        tx.candidate.clone(),
        tx.donor_name.clone(),
        tx.amount.0.to_string(),
        tx.election_year.map(|y| y.to_string()).unwrap_or_default(),
        tx.zip_code.clone().unwrap_or_default(),
    ]
}

fn export_csv(txs: &[Transaction], path: &str) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path).context(CsvWriteSnafu { path })?;
    wtr.write_record(EXPORT_COLUMNS)
        .context(CsvWriteSnafu { path })?;
    for tx in txs.iter() {
        wtr.write_record(text_cells(tx))
            .context(CsvWriteSnafu { path })?;
    }
    wtr.flush().context(CsvFlushSnafu { path })?;
    Ok(())
}

/// The amount as a number cell, unless a float cannot hold it exactly. Such
/// amounts are written as text so that they load back unchanged.
fn exact_f64(amount: Decimal) -> Option<f64> {
    let f = amount.to_f64()?;
    match f.to_string().parse::<Decimal>() {
        Ok(back) if back == amount => Some(f),
        _ => None,
    }
}

fn export_xlsx(txs: &[Transaction], path: &str) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (col, name) in EXPORT_COLUMNS.iter().enumerate() {
        worksheet
            .write_string(0, col as u16, *name)
            .context(ExcelWriteSnafu { path })?;
    }
    for (idx, tx) in txs.iter().enumerate() {
        let row = (idx + 1) as u32;
        let cells = text_cells(tx);
        // Amounts and years are numbers, empty cells stay empty.
        for (col, cell) in cells.iter().enumerate() {
            if cell.is_empty() {
                continue;
            }
            let col_name = EXPORT_COLUMNS[col];
            let number = if col_name == AMOUNT {
                exact_f64(tx.amount.0)
            } else if col_name == ELECTION_YEAR {
                tx.election_year.map(|y| y as f64)
            } else {
                None
            };
            let written = match number {
                Some(n) => worksheet.write_number(row, col as u16, n),
                None => worksheet.write_string(row, col as u16, cell),
            };
            written.context(ExcelWriteSnafu { path })?;
        }
    }
    workbook.save(path).context(ExcelWriteSnafu { path })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cf::load;
    use std::io::Write;

    fn sample_table(dir: &tempfile::TempDir) -> Table {
        let path = dir.path().join("in.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            b"TransDate:,Contact Type:,Cand/Committee:,Name:,Amount:,Election Year\n\
              01/02/2023,Contributor,A,Jane Doe 78209,\"1,250.50\",2023\n\
              ,Expenditure,A,\"Shop, Inc\",-12.25,\n\
              01/04/2023,Loan,B,Bank,500,2025\n",
        )
        .unwrap();
        load(&path.display().to_string()).unwrap()
    }

    #[test]
    fn formats() {
        assert_eq!(ExportFormat::parse(" XLSX "), Some(ExportFormat::Xlsx));
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("pdf"), None);
        assert_eq!(ExportFormat::from_path("out.xlsx"), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::from_path("out.txt"), ExportFormat::Csv);
    }

    #[test]
    fn csv_export_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let table = sample_table(&dir);
        let out = dir.path().join("out.csv").display().to_string();
        export_table(&table, &out, ExportFormat::Csv).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.starts_with(
            "TransDate,Contact Type,Cand/Committee,Name,Amount,Election Year,ZipCode\n"
        ));
        let reloaded = load(&out).unwrap();
        assert_eq!(reloaded.transactions(), table.transactions());
    }

    #[test]
    fn xlsx_export_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let table = sample_table(&dir);
        let out = dir.path().join("out.xlsx").display().to_string();
        export_table(&table, &out, ExportFormat::Xlsx).unwrap();

        let reloaded = load(&out).unwrap();
        assert_eq!(reloaded.transactions(), table.transactions());
    }

    #[test]
    fn xlsx_export_keeps_long_amounts_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            b"TransDate,Contact Type,Cand/Committee,Name,Amount,Election Year\n\
              01/02/2023,Contributor,A,Jane,12345678901234567.89,2023\n\
              01/02/2023,Contributor,A,John,0.10,2023\n",
        )
        .unwrap();
        let table = load(&path.display().to_string()).unwrap();
        assert_eq!(exact_f64(table.transactions()[0].amount.0), None);
        assert_eq!(exact_f64(table.transactions()[1].amount.0), Some(0.1));

        let out = dir.path().join("long.xlsx").display().to_string();
        export_table(&table, &out, ExportFormat::Xlsx).unwrap();
        let reloaded = load(&out).unwrap();
        assert_eq!(reloaded.transactions(), table.transactions());
    }
}
