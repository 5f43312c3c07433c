//! Economic time series from the St. Louis Fed (FRED) download endpoint.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::errors::RemoteDataError;
use crate::fetch::PageFetcher;
use crate::models::{Cell, DataTable};

const FRED_BASE_URL: &str = "http://research.stlouisfed.org/fred2/series/";

fn series_url(name: &str) -> String {
    format!("{}{}/downloaddata/{}.csv", FRED_BASE_URL, name, name)
}

/// Download one series as (date, value) observations within [start, end].
///
/// The first body row is the header and is skipped; `.` marks a missing
/// observation. An unknown series name produces an error page instead of
/// CSV, which surfaces as [`RemoteDataError::UnknownSeries`].
fn fetch_series(
    fetcher: &dyn PageFetcher,
    name: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(NaiveDate, Cell)>, RemoteDataError> {
    let body = fetcher.fetch(&series_url(name))?;
    let mut observations = Vec::new();

    for line in body.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (date_text, value_text) = match line.split_once(',') {
            Some(parts) => parts,
            None => (line, ""),
        };
        let date = match NaiveDate::parse_from_str(date_text.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) if body.contains("Error") => {
                return Err(RemoteDataError::UnknownSeries {
                    series: name.to_string(),
                });
            }
            Err(_) => {
                return Err(RemoteDataError::Parse {
                    message: format!("unparseable date in FRED series {}: {:?}", name, date_text),
                });
            }
        };
        if date < start || date > end {
            continue;
        }
        let value_text = value_text.trim();
        let value = if value_text == "." {
            Cell::Null
        } else {
            match value_text.parse::<f64>() {
                Ok(v) => Cell::Float(v),
                Err(_) => Cell::Text(value_text.to_string()),
            }
        };
        observations.push((date, value));
    }

    Ok(observations)
}

/// Fetch one or more FRED series over [start, end].
///
/// Several series are outer-joined on date: the result covers the union of
/// observation dates, with nulls where a series has no value.
pub fn get_data_fred(
    fetcher: &dyn PageFetcher,
    names: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<DataTable, RemoteDataError> {
    let mut joined: BTreeMap<NaiveDate, Vec<Cell>> = BTreeMap::new();

    for (position, name) in names.iter().enumerate() {
        for (date, value) in fetch_series(fetcher, name, start, end)? {
            joined
                .entry(date)
                .or_insert_with(|| vec![Cell::Null; names.len()])[position] = value;
        }
    }

    let columns = names.iter().map(|n| n.to_string()).collect();
    let mut table = DataTable::new("DATE", columns);
    for (date, values) in joined {
        table.push_row(Cell::Date(date), values);
    }
    Ok(table)
}
