use log::{debug, info, warn};

use campaign_finance::builder::TableBuilder;
use campaign_finance::*;
use snafu::{prelude::*, Snafu};

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::cf::config_reader::*;
use crate::cf::export::{export_table, ExportError, ExportFormat};
use crate::cf::io_common::*;

pub mod config_reader;
pub mod export;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;

/// Errors while reading the configuration and the transactions.
/// All of them are fatal: nothing is computed from a partial table.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LoadError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook {path} has no worksheet named {name:?}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Missing required columns {missing:?} in {path}"))]
    MissingColumns { missing: Vec<String>, path: String },
    #[snafu(display("Line {lineno} of {path}: could not read the amount {value:?}"))]
    InvalidAmount {
        lineno: usize,
        path: String,
        value: String,
    },
    #[snafu(display("Line {lineno} of {path}: {source}"))]
    InvalidTransaction {
        source: TableError,
        lineno: usize,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Unknown data source provider {provider:?} (expected csv or xlsx)"))]
    UnknownProvider { provider: String },
    #[snafu(display("Could not read the cutoff date {value:?}"))]
    InvalidCutoff { value: String },
    #[snafu(display("No parent directory for {path}"))]
    MissingParentDir { path: String },
}

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Snafu)]
pub enum CfError {
    #[snafu(display("{source}"))]
    Load { source: LoadError },
    #[snafu(display("{source}"))]
    Export { source: ExportError },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error formatting the summary"))]
    FormattingJson { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type CfResult<T> = Result<T, CfError>;

/// A transaction, as parsed by the readers.
/// This is before reading the dates, amounts and years.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ParsedRecord {
    /// The line in the source file, starting at 1 with the header.
    pub lineno: usize,
    pub trans_date: String,
    pub contact_type: String,
    pub candidate: String,
    pub name: String,
    pub amount: String,
    pub election_year: String,
    /// Only present when the source has a zip code column.
    pub zip_code: Option<String>,
}

/// The table and all the cells that could not be read while building it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: Table,
    pub warnings: Vec<ParseWarning>,
}

/// The filters applied to all the views.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ViewFilters {
    pub election_year: Option<ElectionYear>,
    pub candidates: Vec<String>,
    /// The top donors table only takes a single candidate.
    pub donor_candidate: Option<String>,
}

/// Loads a single file, guessing its type from the extension.
pub fn load(path: &str) -> LoadResult<Table> {
    let source = DataSource::from_path(path, None, None);
    load_sources(Path::new(""), &[source]).map(|lt| lt.table)
}

/// Reads all the sources in order and assembles them into a single table.
pub fn load_sources(root: &Path, sources: &[DataSource]) -> LoadResult<LoadedTable> {
    let mut builder = TableBuilder::new();
    let mut warnings: Vec<ParseWarning> = Vec::new();
    for source in sources.iter() {
        let p: PathBuf = root.join(&source.file_path);
        let p2 = p.as_path().display().to_string();
        info!("Attempting to read transactions file {:?}", p2);
        let parsed = read_records(&p2, source)?;
        let cutoff = source.trans_date_cutoff()?;
        let kept = validate_records(&parsed, &p2, cutoff, &mut builder, &mut warnings)?;
        info!(
            "load_sources: {}: {} rows read, {} kept",
            simplify_file_name(&p2),
            parsed.len(),
            kept
        );
    }
    if !warnings.is_empty() {
        warn!(
            "load_sources: {} cells could not be read and were left empty",
            warnings.len()
        );
    }
    Ok(LoadedTable {
        table: builder.build(),
        warnings,
    })
}

fn read_records(path: &str, source: &DataSource) -> LoadResult<Vec<ParsedRecord>> {
    match source.provider.as_str() {
        "csv" => io_csv::read_csv_records(path),
        "xlsx" | "excel" => {
            io_excel::read_excel_records(path, source.excel_worksheet_name.as_deref())
        }
        x => UnknownProviderSnafu { provider: x }.fail(),
    }
}

fn validate_records(
    parsed: &[ParsedRecord],
    path: &str,
    cutoff: Option<NaiveDate>,
    builder: &mut TableBuilder,
    warnings: &mut Vec<ParseWarning>,
) -> LoadResult<usize> {
    let mut kept: usize = 0;
    for pr in parsed.iter() {
        let lineno = pr.lineno;
        let mut warn_cell = |column: &str, value: &str, reason: String| {
            let w = ParseWarning {
                lineno,
                column: column.to_string(),
                value: value.to_string(),
                reason,
            };
            warn!("validate_records: {}: {}", simplify_file_name(path), w);
            warnings.push(w);
        };

        let date = match parse_date(&pr.trans_date) {
            Ok(d) => d,
            Err(reason) => {
                warn_cell(TRANS_DATE, &pr.trans_date, reason);
                None
            }
        };
        if let Some(cutoff_date) = cutoff {
            if !date.map_or(false, |d| d >= cutoff_date) {
                debug!(
                    "validate_records: line {}: dropped, date {:?} before {}",
                    lineno, date, cutoff_date
                );
                continue;
            }
        }

        let election_year = match parse_election_year(&pr.election_year) {
            Ok(y) => y,
            Err(reason) => {
                warn_cell(ELECTION_YEAR, &pr.election_year, reason);
                None
            }
        };

        let amount = parse_amount(&pr.amount).context(InvalidAmountSnafu {
            lineno,
            path,
            value: pr.amount.clone(),
        })?;

        // A zip code column is authoritative, even when blank.
        let zip_code = match &pr.zip_code {
            Some(z) if z.trim().is_empty() => None,
            Some(z) => Some(z.trim().to_string()),
            None => extract_zip_code(&pr.name),
        };

        let tx = Transaction {
            date,
            contact_type: ContactType::parse(&pr.contact_type),
            candidate: pr.candidate.clone(),
            donor_name: pr.name.clone(),
            amount: Amount(amount),
            election_year,
            zip_code,
        };
        builder
            .add_transaction(tx)
            .context(InvalidTransactionSnafu { lineno, path })?;
        kept += 1;
    }
    Ok(kept)
}

fn amount_js(a: Amount) -> JSValue {
    json!(a.to_string())
}

fn date_js(d: Option<NaiveDate>) -> JSValue {
    match d {
        Some(x) => json!(format_date(x)),
        None => JSValue::Null,
    }
}

fn series_to_json(series: &BTreeMap<String, Vec<SeriesPoint>>) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    for (candidate, points) in series.iter() {
        let l: Vec<JSValue> = points
            .iter()
            .map(|p| {
                json!({
                    "date": format_date(p.date),
                    "amount": amount_js(p.amount),
                    "cumulative": amount_js(p.cumulative_amount)
                })
            })
            .collect();
        res.insert(candidate.clone(), JSValue::Array(l));
    }
    JSValue::Object(res)
}

/// Runs all the views with the given filters and assembles them into a single document.
pub fn build_summary_js(title: &str, filters: &ViewFilters, loaded: &LoadedTable) -> JSValue {
    let table = &loaded.table;
    let selected: HashSet<String> = filters.candidates.iter().cloned().collect();
    let candidates = Some(&selected);
    let year = filters.election_year;

    let grouped: Vec<JSValue> = grouped_totals(table, year, candidates)
        .iter()
        .map(|r| {
            json!({
                "candidate": r.candidate,
                "contributions": amount_js(r.total_contributions),
                "expenditures": amount_js(r.total_expenditures)
            })
        })
        .collect();

    let contributions =
        cumulative_series(table, SeriesKind::Contributions, year, candidates);
    let expenditures = cumulative_series(table, SeriesKind::Expenditures, year, candidates);

    let donors: Vec<JSValue> = top_donors(table, year, filters.donor_candidate.as_deref())
        .iter()
        .map(|r| {
            json!({
                "donor": r.donor_name,
                "total": amount_js(r.total_amount),
                "count": r.donation_count,
                "topCandidate": r.top_candidate
            })
        })
        .collect();

    let averages: Vec<JSValue> = average_donations(table, year, candidates)
        .iter()
        .map(|r| {
            json!({
                "candidate": r.candidate,
                "average": amount_js(r.average_amount),
                "count": r.donation_count,
                "topDonor": r.top_donor
            })
        })
        .collect();

    let mut sorted_candidates = filters.candidates.clone();
    sorted_candidates.sort();

    json!({
        "config": {
            "title": title,
            "electionYear": year,
            "candidates": sorted_candidates,
            "donorCandidate": filters.donor_candidate,
            "rows": table.len(),
            "warnings": loaded.warnings.len(),
            "electionYears": table.election_years(),
            "lastTransactionDate": date_js(table.last_transaction_date())
        },
        "groupedTotals": grouped,
        "contributionSeries": series_to_json(&contributions),
        "expenditureSeries": series_to_json(&expenditures),
        "topDonors": donors,
        "averageDonations": averages
    })
}

fn write_summary(pretty_js: &str, out: Option<&str>) -> CfResult<()> {
    match out {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, pretty_js).context(WritingSummarySnafu { path })?;
        }
    }
    Ok(())
}

fn resolve(root: &Path, path: &str) -> String {
    root.join(path).display().to_string()
}

/// Everything a run needs once the command line and the configuration file
/// have been merged and the sources loaded.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub loaded: LoadedTable,
    pub filters: ViewFilters,
    pub settings: OutputSettings,
    /// The directory the output paths of the configuration are relative to.
    pub root: PathBuf,
}

/// Merges the command line with the configuration file and loads the data.
/// Options given on the command line take precedence.
pub fn prepare_dashboard(args: &Args) -> CfResult<Dashboard> {
    let (config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path).context(LoadSnafu {})?;
            let root = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {
                    path: config_path.clone(),
                })
                .context(LoadSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => (DashboardConfig::default(), PathBuf::new()),
    };
    debug!("prepare_dashboard: config: {:?}", config);

    // The input on the command line replaces the sources of the configuration.
    let (sources, sources_root): (Vec<DataSource>, PathBuf) = match &args.input {
        Some(input) => (
            vec![DataSource::from_path(
                input,
                args.input_type.as_deref(),
                args.excel_worksheet_name.as_deref(),
            )],
            PathBuf::new(),
        ),
        None => (config.data_sources.clone(), root.clone()),
    };
    if sources.is_empty() {
        whatever!("No data source: provide --input or a configuration file with dataSources");
    }

    let loaded = load_sources(&sources_root, &sources).context(LoadSnafu {})?;
    info!(
        "prepare_dashboard: {} transactions loaded, {} warnings",
        loaded.table.len(),
        loaded.warnings.len()
    );

    let config_filters = config.filters.clone().unwrap_or_default();
    let filters = ViewFilters {
        election_year: args.year.or(config_filters.election_year),
        candidates: args
            .candidate
            .clone()
            .or(config_filters.candidates)
            .unwrap_or_default(),
        donor_candidate: args
            .donor_candidate
            .clone()
            .or(config_filters.donor_candidate),
    };
    info!("prepare_dashboard: filters: {:?}", filters);

    let settings = config.output_settings.clone().unwrap_or_default();
    Ok(Dashboard {
        loaded,
        filters,
        settings,
        root,
    })
}

pub fn run_dashboard(args: &Args) -> CfResult<()> {
    let Dashboard {
        loaded,
        filters,
        settings,
        root,
    } = prepare_dashboard(args)?;
    let title = settings
        .title
        .clone()
        .unwrap_or_else(|| "Campaign Finance Data".to_string());

    let result_js = build_summary_js(&title, &filters, &loaded);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(FormattingJsonSnafu {})?;

    let out: Option<String> = match &args.out {
        Some(o) => Some(o.clone()),
        None => settings.output_path.as_deref().map(|p| resolve(&root, p)),
    };
    write_summary(&pretty_js_stats, out.as_deref())?;

    let export_path: Option<String> = match &args.export {
        Some(p) => Some(p.clone()),
        None => settings.export_path.as_deref().map(|p| resolve(&root, p)),
    };
    if let Some(export_path) = export_path {
        let format_name = args
            .export_format
            .clone()
            .or_else(|| settings.export_format.clone());
        let format = match format_name {
            Some(name) => match ExportFormat::parse(&name) {
                Some(f) => f,
                None => whatever!("Unknown export format {:?} (expected csv or xlsx)", name),
            },
            None => ExportFormat::from_path(&export_path),
        };
        export_table(&loaded.table, &export_path, format).context(ExportSnafu {})?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p).context(LoadSnafu {})?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(FormattingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
fn test_wrapper(test_name: &str) {
    let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");
    info!("Running test {}", test_name);
    let args = Args {
        config: Some(format!(
            "{}/{}/{}_config.json",
            test_dir, test_name, test_name
        )),
        reference: Some(format!(
            "{}/{}/{}_expected_summary.json",
            test_dir, test_name, test_name
        )),
        ..Args::default()
    };
    if let Err(e) = run_dashboard(&args) {
        panic!("test {} failed: {}", test_name, e);
    }
}
