use crate::cf::*;

use std::fs;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    pub title: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "exportPath")]
    pub export_path: Option<String>,
    #[serde(rename = "exportFormat")]
    pub export_format: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "transDateOnOrAfter")]
    pub trans_date_on_or_after: Option<String>,
}

impl DataSource {
    /// A source for a single file. Without an explicit provider, files ending
    /// in `.xlsx` are read as Excel workbooks and everything else as CSV.
    pub fn from_path(
        path: &str,
        provider: Option<&str>,
        excel_worksheet_name: Option<&str>,
    ) -> DataSource {
        let provider = match provider {
            Some(p) => p.to_lowercase(),
            None if path.to_lowercase().ends_with(".xlsx") => "xlsx".to_string(),
            None => "csv".to_string(),
        };
        DataSource {
            provider,
            file_path: path.to_string(),
            excel_worksheet_name: excel_worksheet_name.map(|s| s.to_string()),
            trans_date_on_or_after: None,
        }
    }

    pub fn trans_date_cutoff(&self) -> LoadResult<Option<NaiveDate>> {
        match &self.trans_date_on_or_after {
            None => Ok(None),
            Some(s) => match parse_date(s) {
                Ok(Some(d)) => Ok(Some(d)),
                _ => InvalidCutoffSnafu { value: s.clone() }.fail(),
            },
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filters {
    #[serde(rename = "electionYear")]
    pub election_year: Option<ElectionYear>,
    pub candidates: Option<Vec<String>>,
    #[serde(rename = "donorCandidate")]
    pub donor_candidate: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    #[serde(rename = "dataSources", default)]
    pub data_sources: Vec<DataSource>,
    pub filters: Option<Filters>,
}

pub fn read_config(path: &str) -> LoadResult<DashboardConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DashboardConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> LoadResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}
