use clap::Parser;

/// This is a campaign finance dashboard program.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the data sources, the filters and the outputs.
    /// For more information about the file format, read the manual of the campaign_finance crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) If specified, the transactions are read from this file. Setting this option overrides
    /// the data sources that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or xlsx, default guessed from the file extension) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (integer) Only look at the transactions reported for this election year.
    /// The donor rankings are empty without an election year.
    #[clap(short, long, value_parser)]
    pub year: Option<i32>,

    /// (repeatable) Only look at these candidates or committees.
    #[clap(long, value_parser)]
    pub candidate: Option<Vec<String>>,

    /// (single name) Restricts the top donors table to the donations made to this candidate.
    #[clap(long, value_parser)]
    pub donor_candidate: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of all the views will be written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected summary in JSON format. If provided, cfdash will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) If specified, the full table of transactions is written to this location.
    #[clap(long, value_parser)]
    pub export: Option<String>,

    /// (csv or xlsx, default guessed from the file extension) The format of the export.
    #[clap(long, value_parser)]
    pub export_format: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
