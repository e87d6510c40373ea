/*!

This is the long-form manual for `campaign_finance` and `cfdash`.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values, as downloaded from the city campaign finance search page
* `xlsx` Excel workbooks with the same columns

Both formats need a header row with the following columns, in any order:

| Column           | Content                                           | Required value |
|------------------|---------------------------------------------------|----------------|
| `TransDate`      | date of the transaction                           | no             |
| `Contact Type`   | `Contributor`, `Expenditure` or any other label   | yes            |
| `Cand/Committee` | the candidate or committee filing the report      | yes            |
| `Name`           | the donor or the payee                            | no             |
| `Amount`         | the amount, for example `1,250.00` or `$40`       | yes            |
| `Election Year`  | the election the report is filed for              | no             |
| `ZipCode`        | optional column, 5-digit zip code                 | no             |

The headers of the city exports end with a colon (`TransDate:`, `Amount:`). The colon, the
surrounding whitespace and the case are ignored when matching columns.

Dates may be written `MM/DD/YYYY`, `MM/DD/YY` or in ISO format (with or without a time).
A date that cannot be read is left empty: the transaction still counts in the totals and rankings
but is left out of the time series. An amount that cannot be read stops the loading, since every
view depends on it.

When no `ZipCode` column is present, the zip code is taken from the first group of exactly five
digits in the `Name` column, which often carries the address of the donor.

## Views

All the views take the election year and the candidates as filters. A missing filter or an empty
list of candidates selects everything.

### Grouped totals

One row per candidate with the sum of the contributions and the sum of the expenditures. A
candidate with only contributions (or only expenditures) has a zero for the other side. Rows are
sorted by candidate name.

### Cumulative series

For each candidate, one point per day with the sum of the transactions of that day and the running
total since the first day. It is available for the contributions and for the expenditures.

### Top donors

One row per donor: total amount given, number of donations, and the candidate that received the
most from this donor. This view looks at one election: it is empty if no election year is given.
It can be restricted to a **single** candidate. Contributions without a donor name are not ranked,
and an unnamed donor is never the top donor of a candidate.

### Average donations

One row per candidate: average donation, number of donations, and the donor who gave the most to
this candidate. It is empty if no election year is given. Unlike the top donors, it can be
restricted to **several** candidates at once.

### Ties

When two candidates received the same amount from a donor (or two donors gave the same amount to a
candidate), the one that appears first in the input file wins. Rows of the rankings with the same
amount also keep the order of the input file. Running the same command on the same file always
gives the same output.

## Configuration file

The configuration is a JSON file:

```json
{
  "outputSettings": {
    "title": "COSA Campaign Finance Data",
    "outputPath": "summary.json",
    "exportPath": "cosa_cf.xlsx",
    "exportFormat": "xlsx"
  },
  "dataSources": [
    { "provider": "csv", "filePath": "campaign_finance20241031.csv" },
    { "provider": "xlsx", "filePath": "update.xlsx", "excelWorksheetName": "Sheet1",
      "transDateOnOrAfter": "2024-10-27" }
  ],
  "filters": { "electionYear": 2025, "candidates": ["Sukh Kaur"], "donorCandidate": "Sukh Kaur" }
}
```

All the sources are read in order and concatenated. `transDateOnOrAfter` only keeps the
transactions of a source dated on or after that day, which is useful to append a new download to an
older one without duplicating rows. Relative paths are resolved from the directory of the
configuration file. The command line options take precedence over the configuration file.

## Export

The full table can be written back to CSV or Excel with the canonical column names. Loading an
exported file gives back the same table.

*/
