/*!
Aggregation and ranking views over campaign finance transactions.

The entry point is a [Table], assembled once with a [builder::TableBuilder]
and then shared read-only. Every view is a pure function of the table and of
the filters passed to it:

* [grouped_totals] contributions and expenditures per candidate
* [cumulative_series] running totals over time per candidate
* [top_donors] donors ranked by their total contributions
* [average_donations] candidates ranked by their average donation

None of the views can fail. Filters that select nothing produce an empty result.

See the [manual] for the exact semantics of each view.
*/

mod config;
use log::debug;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::Hash,
};

use chrono::NaiveDate;

pub mod builder;
pub mod manual;

pub use crate::config::*;

/// An immutable collection of transactions.
///
/// Built with [builder::TableBuilder]. The transactions keep the order in
/// which they were added, which is the order used to break ties in the
/// rankings.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub(crate) transactions: Vec<Transaction>,
}

impl Table {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// All the election years mentioned in the table, in increasing order.
    pub fn election_years(&self) -> Vec<ElectionYear> {
        let years: BTreeSet<ElectionYear> = self
            .transactions
            .iter()
            .filter_map(|tx| tx.election_year)
            .collect();
        years.into_iter().collect()
    }

    /// All the candidates and committees, in alphabetical order.
    pub fn candidates(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .transactions
            .iter()
            .map(|tx| tx.candidate.as_str())
            .collect();
        names.into_iter().map(|s| s.to_string()).collect()
    }

    /// The most recent transaction date, if any transaction is dated.
    pub fn last_transaction_date(&self) -> Option<NaiveDate> {
        self.transactions.iter().filter_map(|tx| tx.date).max()
    }
}

// **** Private structures ****

/// Sums amounts per key. Keys are kept in the order they were first seen.
struct OrderedTally<K> {
    index: HashMap<K, usize>,
    entries: Vec<(K, Amount, u64)>,
}

impl<K: Eq + Hash + Clone> OrderedTally<K> {
    fn new() -> OrderedTally<K> {
        OrderedTally {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: K, amount: Amount) {
        if let Some(idx) = self.index.get(&key) {
            let e = &mut self.entries[*idx];
            e.1 += amount;
            e.2 += 1;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, amount, 1));
        }
    }

    fn into_entries(self) -> Vec<(K, Amount, u64)> {
        self.entries
    }
}

/// For every group, the key that received the largest summed amount.
///
/// Amounts are first summed per (group, key) pair. When two keys of the same
/// group have the same sum, the pair that appears first in `rows` wins.
/// The result only depends on the order of `rows`, never on hashing.
fn top_by_group<'a, I>(rows: I) -> HashMap<&'a str, &'a str>
where
    I: Iterator<Item = (&'a str, &'a str, Amount)>,
{
    let mut tally: OrderedTally<(&'a str, &'a str)> = OrderedTally::new();
    for (group, key, amount) in rows {
        tally.add((group, key), amount);
    }
    let mut best: HashMap<&'a str, (&'a str, Amount)> = HashMap::new();
    for ((group, key), total, _) in tally.into_entries() {
        match best.get_mut(group) {
            Some(current) if total > current.1 => {
                *current = (key, total);
            }
            Some(_) => {}
            None => {
                best.insert(group, (key, total));
            }
        }
    }
    best.into_iter().map(|(g, (k, _))| (g, k)).collect()
}

// An empty selection in the candidate filter selects everyone.
fn candidate_selected(tx: &Transaction, candidates: Option<&HashSet<String>>) -> bool {
    match candidates {
        Some(names) if !names.is_empty() => names.contains(&tx.candidate),
        _ => true,
    }
}

fn year_selected(tx: &Transaction, election_year: Option<ElectionYear>) -> bool {
    match election_year {
        Some(y) => tx.election_year == Some(y),
        None => true,
    }
}

/// Total contributions and expenditures for each candidate.
///
/// Arguments:
/// * `table` the transactions
/// * `election_year` if provided, only the transactions reported for this election
/// * `candidates` if provided and not empty, only these candidates
///
/// Every candidate with at least one contribution or expenditure after
/// filtering gets a row. The side with no transaction is zero. Rows are sorted
/// by candidate name.
pub fn grouped_totals(
    table: &Table,
    election_year: Option<ElectionYear>,
    candidates: Option<&HashSet<String>>,
) -> Vec<GroupedTotalRow> {
    // (contributions, expenditures)
    let mut totals: BTreeMap<&str, (Amount, Amount)> = BTreeMap::new();
    for tx in table.transactions.iter() {
        if !(year_selected(tx, election_year) && candidate_selected(tx, candidates)) {
            continue;
        }
        match tx.contact_type {
            ContactType::Contributor => {
                let e = totals
                    .entry(tx.candidate.as_str())
                    .or_insert((Amount::ZERO, Amount::ZERO));
                e.0 += tx.amount;
            }
            ContactType::Expenditure => {
                let e = totals
                    .entry(tx.candidate.as_str())
                    .or_insert((Amount::ZERO, Amount::ZERO));
                e.1 += tx.amount;
            }
            ContactType::Other(_) => {}
        }
    }
    debug!(
        "grouped_totals: year: {:?} candidates: {:?} -> {} rows",
        election_year,
        candidates,
        totals.len()
    );
    totals
        .into_iter()
        .map(|(name, (contrib, expend))| GroupedTotalRow {
            candidate: name.to_string(),
            total_contributions: contrib,
            total_expenditures: expend,
        })
        .collect()
}

/// Running totals over time, one series per candidate.
///
/// Arguments:
/// * `table` the transactions
/// * `kind` follow the contributions or the expenditures
/// * `election_year` if provided, only the transactions reported for this election
/// * `candidates` if provided and not empty, only these candidates
///
/// Transactions of the same day are summed into a single point. Undated
/// transactions cannot be placed in time and are left out.
pub fn cumulative_series(
    table: &Table,
    kind: SeriesKind,
    election_year: Option<ElectionYear>,
    candidates: Option<&HashSet<String>>,
) -> BTreeMap<String, Vec<SeriesPoint>> {
    let contact_type = kind.contact_type();
    let mut daily: BTreeMap<&str, BTreeMap<NaiveDate, Amount>> = BTreeMap::new();
    let mut undated: usize = 0;
    for tx in table.transactions.iter() {
        if tx.contact_type != contact_type
            || !year_selected(tx, election_year)
            || !candidate_selected(tx, candidates)
        {
            continue;
        }
        if let Some(date) = tx.date {
            let day = daily
                .entry(tx.candidate.as_str())
                .or_default()
                .entry(date)
                .or_insert(Amount::ZERO);
            *day += tx.amount;
        } else {
            undated += 1;
        }
    }
    if undated > 0 {
        debug!(
            "cumulative_series: {:?}: skipped {} undated transactions",
            kind, undated
        );
    }

    let mut res: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();
    for (candidate, days) in daily {
        let mut running = Amount::ZERO;
        let points: Vec<SeriesPoint> = days
            .into_iter()
            .map(|(date, amount)| {
                running += amount;
                SeriesPoint {
                    date,
                    amount,
                    cumulative_amount: running,
                }
            })
            .collect();
        res.insert(candidate.to_string(), points);
    }
    res
}

fn contributions_for<'a>(
    table: &'a Table,
    election_year: ElectionYear,
) -> impl Iterator<Item = &'a Transaction> + 'a {
    table.transactions.iter().filter(move |tx| {
        tx.contact_type == ContactType::Contributor && tx.election_year == Some(election_year)
    })
}

/// Donors ranked by the total of their contributions.
///
/// Arguments:
/// * `table` the transactions
/// * `election_year` the election to look at. This view always looks at a
///   single election: without a year, the result is empty.
/// * `candidate` if provided, only the contributions to this candidate.
///   Unlike [average_donations], this filter takes a single candidate.
///
/// The top candidate of a donor is the one that received the most from them.
/// Ties go to the candidate that appears first in the table for that donor.
/// Donors with the same total keep their order of first appearance.
/// Contributions without a donor name are skipped.
pub fn top_donors(
    table: &Table,
    election_year: Option<ElectionYear>,
    candidate: Option<&str>,
) -> Vec<TopDonorRow> {
    let year = match election_year {
        Some(y) => y,
        None => {
            debug!("top_donors: no election year, nothing to rank");
            return Vec::new();
        }
    };
    let candidate = candidate.filter(|c| !c.is_empty());
    let rows: Vec<&Transaction> = contributions_for(table, year)
        .filter(|tx| candidate.map_or(true, |c| tx.candidate == c))
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    // Contributions without a donor name are not attributed to anyone.
    let named = || rows.iter().filter(|tx| !tx.donor_name.is_empty());
    let mut totals: OrderedTally<&str> = OrderedTally::new();
    for tx in named() {
        totals.add(tx.donor_name.as_str(), tx.amount);
    }
    let top_candidates =
        top_by_group(named().map(|tx| (tx.donor_name.as_str(), tx.candidate.as_str(), tx.amount)));

    let mut res: Vec<TopDonorRow> = totals
        .into_entries()
        .into_iter()
        .filter_map(|(donor, total, count)| {
            top_candidates.get(donor).map(|top| TopDonorRow {
                donor_name: donor.to_string(),
                total_amount: total,
                donation_count: count,
                top_candidate: top.to_string(),
            })
        })
        .collect();
    // Stable: equal totals keep their order of appearance.
    res.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));
    debug!(
        "top_donors: year: {} candidate: {:?} -> {} donors",
        year,
        candidate,
        res.len()
    );
    res
}

/// Candidates ranked by their average donation.
///
/// Arguments:
/// * `table` the transactions
/// * `election_year` the election to look at. Without a year, the result is empty.
/// * `candidates` if provided and not empty, only these candidates. Unlike
///   [top_donors], this filter accepts several candidates.
///
/// The top donor of a candidate is the donor who gave them the most. Ties go
/// to the donor that appears first in the table for that candidate. A
/// candidate whose contributions all lack a donor name has no top donor and
/// is left out.
pub fn average_donations(
    table: &Table,
    election_year: Option<ElectionYear>,
    candidates: Option<&HashSet<String>>,
) -> Vec<AverageDonationRow> {
    let year = match election_year {
        Some(y) => y,
        None => {
            debug!("average_donations: no election year, nothing to rank");
            return Vec::new();
        }
    };
    let rows: Vec<&Transaction> = contributions_for(table, year)
        .filter(|tx| candidate_selected(tx, candidates))
        .collect();
    if rows.is_empty() {
        return Vec::new();
    }

    let mut totals: OrderedTally<&str> = OrderedTally::new();
    for tx in rows.iter() {
        totals.add(tx.candidate.as_str(), tx.amount);
    }
    // Unnamed donors count in the average but cannot be the top donor.
    let top_donors = top_by_group(
        rows.iter()
            .filter(|tx| !tx.donor_name.is_empty())
            .map(|tx| (tx.candidate.as_str(), tx.donor_name.as_str(), tx.amount)),
    );

    let mut res: Vec<AverageDonationRow> = totals
        .into_entries()
        .into_iter()
        .filter_map(|(candidate, total, count)| {
            top_donors.get(candidate).map(|top| AverageDonationRow {
                candidate: candidate.to_string(),
                average_amount: Amount::mean(total, count),
                donation_count: count,
                top_donor: top.to_string(),
            })
        })
        .collect();
    res.sort_by(|a, b| b.average_amount.cmp(&a.average_amount));
    debug!(
        "average_donations: year: {} -> {} candidates",
        year,
        res.len()
    );
    res
}

#[cfg(test)]
mod tests {
    use super::builder::TableBuilder;
    use super::*;
    use rust_decimal::Decimal;

    fn d(units: i64) -> Decimal {
        Decimal::new(units, 0)
    }

    fn day(y: i32, m: u32, dd: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, dd)
    }

    fn names(xs: &[&str]) -> HashSet<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn scenario_table() -> Table {
        let mut b = TableBuilder::new();
        b.add_dated(day(2023, 1, 1), ContactType::Contributor, "A", "X", d(100), Some(2023))
            .unwrap();
        b.add_dated(day(2023, 1, 2), ContactType::Contributor, "A", "Y", d(50), Some(2023))
            .unwrap();
        b.add_dated(day(2023, 1, 3), ContactType::Expenditure, "A", "Shop", d(30), Some(2023))
            .unwrap();
        b.build()
    }

    #[test]
    fn grouped_totals_scenario() {
        let table = scenario_table();
        let rows = grouped_totals(&table, None, None);
        assert_eq!(
            rows,
            vec![GroupedTotalRow {
                candidate: "A".to_string(),
                total_contributions: Amount(d(150)),
                total_expenditures: Amount(d(30)),
            }]
        );
    }

    #[test]
    fn grouped_totals_fills_missing_side_with_zero() {
        let mut b = TableBuilder::new();
        b.add_contribution("A", "X", d(10), Some(2024)).unwrap();
        b.add_expenditure("B", "Shop", d(7), Some(2024)).unwrap();
        b.add_dated(None, ContactType::Other("Loan".to_string()), "C", "Bank", d(1000), Some(2024))
            .unwrap();
        let table = b.build();
        let rows = grouped_totals(&table, Some(2024), None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].candidate, "A");
        assert_eq!(rows[0].total_expenditures, Amount::ZERO);
        assert_eq!(rows[1].candidate, "B");
        assert_eq!(rows[1].total_contributions, Amount::ZERO);
        assert_eq!(rows[1].total_expenditures, Amount(d(7)));
    }

    #[test]
    fn grouped_totals_filters() {
        let mut b = TableBuilder::new();
        b.add_contribution("A", "X", d(10), Some(2023)).unwrap();
        b.add_contribution("A", "X", d(20), Some(2025)).unwrap();
        b.add_contribution("B", "X", d(5), Some(2025)).unwrap();
        let table = b.build();

        let rows = grouped_totals(&table, Some(2025), Some(&names(&["A"])));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_contributions, Amount(d(20)));

        // An empty selection selects everyone.
        let rows = grouped_totals(&table, Some(2025), Some(&HashSet::new()));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn cumulative_series_scenario() {
        let table = scenario_table();
        let series = cumulative_series(&table, SeriesKind::Contributions, None, None);
        let a = series.get("A").unwrap();
        let points: Vec<(NaiveDate, Amount)> =
            a.iter().map(|p| (p.date, p.cumulative_amount)).collect();
        assert_eq!(
            points,
            vec![
                (day(2023, 1, 1).unwrap(), Amount(d(100))),
                (day(2023, 1, 2).unwrap(), Amount(d(150))),
            ]
        );

        let expenses = cumulative_series(&table, SeriesKind::Expenditures, None, None);
        assert_eq!(expenses.get("A").unwrap().len(), 1);
        assert_eq!(expenses.get("A").unwrap()[0].cumulative_amount, Amount(d(30)));
    }

    #[test]
    fn cumulative_series_merges_same_day_and_skips_undated() {
        let mut b = TableBuilder::new();
        // Out of order on purpose.
        b.add_dated(day(2024, 3, 5), ContactType::Contributor, "A", "X", d(5), Some(2025))
            .unwrap();
        b.add_dated(day(2024, 3, 1), ContactType::Contributor, "A", "Y", d(10), Some(2025))
            .unwrap();
        b.add_dated(day(2024, 3, 5), ContactType::Contributor, "A", "Z", d(20), Some(2025))
            .unwrap();
        b.add_dated(None, ContactType::Contributor, "A", "W", d(1000), Some(2025))
            .unwrap();
        let table = b.build();

        let series = cumulative_series(&table, SeriesKind::Contributions, Some(2025), None);
        let a = series.get("A").unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].date, day(2024, 3, 1).unwrap());
        assert_eq!(a[1].amount, Amount(d(25)));
        // The last point is the sum of all the dated transactions.
        assert_eq!(a[1].cumulative_amount, Amount(d(35)));
        assert!(a.windows(2).all(|w| w[0].cumulative_amount <= w[1].cumulative_amount));

        // The undated transaction still counts in the totals.
        let totals = grouped_totals(&table, Some(2025), None);
        assert_eq!(totals[0].total_contributions, Amount(d(1035)));
    }

    #[test]
    fn top_donors_scenario() {
        let mut b = TableBuilder::new();
        b.add_contribution("A", "X", d(100), Some(2024)).unwrap();
        b.add_contribution("B", "X", d(50), Some(2024)).unwrap();
        let table = b.build();
        let rows = top_donors(&table, Some(2024), None);
        assert_eq!(
            rows,
            vec![TopDonorRow {
                donor_name: "X".to_string(),
                total_amount: Amount(d(150)),
                donation_count: 2,
                top_candidate: "A".to_string(),
            }]
        );
    }

    #[test]
    fn top_donors_tie_goes_to_first_seen_candidate() {
        let mut b = TableBuilder::new();
        b.add_contribution("Zed", "X", d(10), Some(2024)).unwrap();
        b.add_contribution("Amy", "X", d(10), Some(2024)).unwrap();
        b.add_contribution("Amy", "Y", d(30), Some(2024)).unwrap();
        let table = b.build();
        let rows = top_donors(&table, Some(2024), None);
        assert_eq!(rows[0].donor_name, "Y");
        assert_eq!(rows[1].donor_name, "X");
        assert_eq!(rows[1].top_candidate, "Zed");
        assert_eq!(rows[1].donation_count, 2);
    }

    #[test]
    fn top_donors_single_candidate_filter() {
        let mut b = TableBuilder::new();
        b.add_contribution("A", "X", d(100), Some(2024)).unwrap();
        b.add_contribution("B", "X", d(50), Some(2024)).unwrap();
        b.add_contribution("B", "Y", d(60), Some(2024)).unwrap();
        let table = b.build();
        let rows = top_donors(&table, Some(2024), Some("B"));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].donor_name, "Y");
        assert_eq!(rows[1].total_amount, Amount(d(50)));
        assert_eq!(rows[1].top_candidate, "B");
    }

    #[test]
    fn unnamed_donors_are_not_ranked() {
        let mut b = TableBuilder::new();
        b.add_contribution("A", "", d(500), Some(2024)).unwrap();
        b.add_contribution("A", "Bob", d(10), Some(2024)).unwrap();
        b.add_contribution("C", "  ", d(40), Some(2024)).unwrap();
        let table = b.build();

        let donors = top_donors(&table, Some(2024), None);
        assert_eq!(donors.len(), 1);
        assert_eq!(donors[0].donor_name, "Bob");
        assert_eq!(donors[0].total_amount, Amount(d(10)));

        let avg = average_donations(&table, Some(2024), None);
        assert_eq!(avg.len(), 1);
        assert_eq!(avg[0].candidate, "A");
        assert_eq!(avg[0].top_donor, "Bob");
        assert_eq!(avg[0].donation_count, 2);
        assert_eq!(avg[0].average_amount, Amount(d(255)));
    }

    #[test]
    fn rankings_need_an_election_year() {
        let table = scenario_table();
        assert!(top_donors(&table, None, None).is_empty());
        assert!(average_donations(&table, None, None).is_empty());
    }

    #[test]
    fn average_donations_ranking() {
        let mut b = TableBuilder::new();
        b.add_contribution("A", "X", d(100), Some(2024)).unwrap();
        b.add_contribution("A", "Y", d(50), Some(2024)).unwrap();
        b.add_contribution("A", "Y", d(50), Some(2024)).unwrap();
        b.add_contribution("B", "Z", d(300), Some(2024)).unwrap();
        b.add_expenditure("B", "Shop", d(9999), Some(2024)).unwrap();
        let table = b.build();
        let rows = average_donations(&table, Some(2024), None);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].candidate, "B");
        assert_eq!(rows[0].average_amount, Amount(d(300)));
        assert_eq!(rows[1].candidate, "A");
        assert_eq!(rows[1].donation_count, 3);
        assert_eq!(rows[1].average_amount.to_cents(), Decimal::new(6667, 2));
        // X and Y both gave 100; X appears first.
        assert_eq!(rows[1].top_donor, "X");

        let only_a = average_donations(&table, Some(2024), Some(&names(&["A"])));
        assert_eq!(only_a.len(), 1);
    }

    #[test]
    fn no_match_gives_empty_views() {
        let table = scenario_table();
        assert!(grouped_totals(&table, Some(1999), None).is_empty());
        assert!(cumulative_series(&table, SeriesKind::Contributions, Some(1999), None).is_empty());
        assert!(top_donors(&table, Some(1999), None).is_empty());
        assert!(average_donations(&table, Some(1999), None).is_empty());
        let empty = TableBuilder::new().build();
        assert!(grouped_totals(&empty, None, None).is_empty());
        assert!(average_donations(&empty, Some(2023), Some(&names(&["A"]))).is_empty());
    }

    #[test]
    fn rankings_are_sorted_and_repeatable() {
        let mut b = TableBuilder::new();
        for (i, donor) in ["P", "Q", "R", "S", "T", "U"].iter().enumerate() {
            let cand = if i % 2 == 0 { "A" } else { "B" };
            b.add_contribution(cand, donor, d((i as i64 % 3) * 10 + 5), Some(2025))
                .unwrap();
        }
        let table = b.build();
        let first = top_donors(&table, Some(2025), None);
        assert!(first
            .windows(2)
            .all(|w| w[0].total_amount >= w[1].total_amount));
        assert_eq!(first, top_donors(&table, Some(2025), None));

        let avg = average_donations(&table, Some(2025), None);
        assert!(avg
            .windows(2)
            .all(|w| w[0].average_amount >= w[1].average_amount));
        assert_eq!(avg, average_donations(&table, Some(2025), None));
    }

    #[test]
    fn table_metadata() {
        let table = scenario_table();
        assert_eq!(table.election_years(), vec![2023]);
        assert_eq!(table.candidates(), vec!["A".to_string()]);
        assert_eq!(table.last_transaction_date(), day(2023, 1, 3));
        assert!(TableBuilder::new().build().last_transaction_date().is_none());
    }
}
