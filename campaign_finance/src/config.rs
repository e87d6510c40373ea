// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::ops::AddAssign;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// The year of the election a transaction is reported against.
///
/// This is not the calendar year of the transaction: a contribution made in
/// December 2024 is typically reported for the 2025 election.
pub type ElectionYear = i32;

/// The role of the other party in a transaction.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum ContactType {
    /// Money received by the candidate or committee.
    Contributor,
    /// Money spent by the candidate or committee.
    Expenditure,
    /// Any other label found in the filings (loans, pledges, in-kind, ...).
    /// These rows are kept in the table but do not feed any view.
    Other(String),
}

impl ContactType {
    /// Reads the label used in the filings. Matching ignores case and
    /// surrounding whitespace.
    pub fn parse(label: &str) -> ContactType {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case("contributor") {
            ContactType::Contributor
        } else if trimmed.eq_ignore_ascii_case("expenditure") {
            ContactType::Expenditure
        } else {
            ContactType::Other(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContactType::Contributor => "Contributor",
            ContactType::Expenditure => "Expenditure",
            ContactType::Other(s) => s.as_str(),
        }
    }
}

/// A currency value. Arithmetic is exact.
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash, Default)]
pub struct Amount(pub Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// The mean of `total` over `count` items. Returns zero for an empty group.
    pub fn mean(total: Amount, count: u64) -> Amount {
        if count == 0 {
            Amount::ZERO
        } else {
            Amount(total.0 / Decimal::from(count))
        }
    }

    /// The value rounded to cents, with exactly two decimal places.
    pub fn to_cents(self) -> Decimal {
        let mut d = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        d.rescale(2);
        d
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_cents())
    }
}

/// One row of a campaign finance report.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Transaction {
    /// The date of the transaction. Missing when the filing carried no
    /// readable date.
    pub date: Option<NaiveDate>,
    pub contact_type: ContactType,
    /// The candidate or committee filing the report.
    pub candidate: String,
    /// The other party: the donor for contributions, the payee for
    /// expenditures.
    pub donor_name: String,
    pub amount: Amount,
    pub election_year: Option<ElectionYear>,
    pub zip_code: Option<String>,
}

/// A cell that could not be read but did not prevent loading the row.
/// The corresponding field is left empty.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParseWarning {
    pub lineno: usize,
    pub column: String,
    pub value: String,
    pub reason: String,
}

impl Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: column {:?}: could not read {:?}: {}",
            self.lineno, self.column, self.value, self.reason
        )
    }
}

// ******** Output data structures *********

/// Which side of the ledger a time series follows.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SeriesKind {
    Contributions,
    Expenditures,
}

impl SeriesKind {
    pub(crate) fn contact_type(&self) -> ContactType {
        match self {
            SeriesKind::Contributions => ContactType::Contributor,
            SeriesKind::Expenditures => ContactType::Expenditure,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct GroupedTotalRow {
    pub candidate: String,
    pub total_contributions: Amount,
    pub total_expenditures: Amount,
}

/// One day of a cumulative series.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    /// The sum of all the transactions of that day.
    pub amount: Amount,
    /// The running total up to and including that day.
    pub cumulative_amount: Amount,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TopDonorRow {
    pub donor_name: String,
    pub total_amount: Amount,
    pub donation_count: u64,
    /// The candidate this donor gave the most to.
    pub top_candidate: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AverageDonationRow {
    pub candidate: String,
    pub average_amount: Amount,
    pub donation_count: u64,
    /// The donor who gave this candidate the most.
    pub top_donor: String,
}

/// Errors that prevent a transaction from entering a table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TableError {
    /// The candidate field of the transaction at this position is blank.
    EmptyCandidate(usize),
}

impl Error for TableError {}

impl Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::EmptyCandidate(idx) => {
                write!(f, "transaction {} has no candidate or committee", idx)
            }
        }
    }
}
