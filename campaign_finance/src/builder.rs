pub use crate::config::*;
use crate::Table;

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;

/// A builder for assembling a table of transactions.
///
/// The builder is the only way to construct a [Table]: it checks every
/// transaction on the way in, so that the views can assume a valid table.
///
/// ```
/// use campaign_finance::builder::TableBuilder;
/// use rust_decimal::Decimal;
/// # use campaign_finance::TableError;
///
/// let mut builder = TableBuilder::new();
/// builder.add_contribution("Anna", "Bob Smith", Decimal::new(10000, 2), Some(2025))?;
/// builder.add_expenditure("Anna", "Print Shop", Decimal::new(2500, 2), Some(2025))?;
///
/// let table = builder.build();
/// assert_eq!(table.len(), 2);
///
/// # Ok::<(), TableError>(())
/// ```
#[derive(Debug, Default)]
pub struct TableBuilder {
    pub(crate) _transactions: Vec<Transaction>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder {
            _transactions: Vec::new(),
        }
    }

    /// Adds a transaction to the table.
    ///
    /// The candidate and donor names are trimmed. A blank candidate is rejected.
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<(), TableError> {
        let candidate = tx.candidate.trim();
        if candidate.is_empty() {
            return Err(TableError::EmptyCandidate(self._transactions.len()));
        }
        let normalized = Transaction {
            candidate: candidate.to_string(),
            donor_name: tx.donor_name.trim().to_string(),
            ..tx
        };
        self._transactions.push(normalized);
        Ok(())
    }

    /// Adds an undated contribution.
    ///
    /// The most common case when assembling a table by hand.
    pub fn add_contribution(
        &mut self,
        candidate: &str,
        donor: &str,
        amount: Decimal,
        election_year: Option<ElectionYear>,
    ) -> Result<(), TableError> {
        self.add_dated(
            None,
            ContactType::Contributor,
            candidate,
            donor,
            amount,
            election_year,
        )
    }

    /// Adds an undated expenditure.
    pub fn add_expenditure(
        &mut self,
        candidate: &str,
        payee: &str,
        amount: Decimal,
        election_year: Option<ElectionYear>,
    ) -> Result<(), TableError> {
        self.add_dated(
            None,
            ContactType::Expenditure,
            candidate,
            payee,
            amount,
            election_year,
        )
    }

    pub fn add_dated(
        &mut self,
        date: Option<NaiveDate>,
        contact_type: ContactType,
        candidate: &str,
        donor: &str,
        amount: Decimal,
        election_year: Option<ElectionYear>,
    ) -> Result<(), TableError> {
        self.add_transaction(Transaction {
            date,
            contact_type,
            candidate: candidate.to_string(),
            donor_name: donor.to_string(),
            amount: Amount(amount),
            election_year,
            zip_code: None,
        })
    }

    /// Freezes the transactions into a table. The table cannot be modified
    /// afterwards.
    pub fn build(self) -> Table {
        info!("build: table with {} transactions", self._transactions.len());
        Table {
            transactions: self._transactions,
        }
    }
}
