//! Remote data providers.
//!
//! One module per source. Yahoo! carries the options-chain session plus the
//! quote, history and index-component fetchers; Google offers history only;
//! FRED and the Fama-French data library are CSV/zip time-series archives.

pub mod famafrench;
pub mod fred;
pub mod google;
pub mod yahoo;

use chrono::NaiveDate;
use csv::ReaderBuilder;

use crate::errors::RemoteDataError;
use crate::models::{HistoryTable, OhlcBar};

/// Parse a historical OHLC CSV body into an ascending-by-date table.
///
/// The header row names the columns; `Adj Close` is optional (Google does
/// not publish it). Sources deliver rows newest-first, so the parsed rows
/// are reversed into ascending order, and the most recent business day is
/// deduplicated when the source repeats it at the tail.
pub(crate) fn parse_history_csv(
    body: &str,
    date_formats: &[&str],
) -> Result<HistoryTable, RemoteDataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers = reader.headers().map_err(RemoteDataError::Csv)?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let required = |name: &str| {
        position(name).ok_or_else(|| RemoteDataError::Parse {
            message: format!("historical CSV is missing a {:?} column", name),
        })
    };

    let date_col = required("Date")?;
    let open_col = required("Open")?;
    let high_col = required("High")?;
    let low_col = required("Low")?;
    let close_col = required("Close")?;
    let volume_col = required("Volume")?;
    let adj_col = position("Adj Close");

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record.map_err(RemoteDataError::Csv)?;
        let field = |col: usize| record.get(col).unwrap_or("").trim();

        let date_text = field(date_col);
        let date = date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(date_text, fmt).ok())
            .ok_or_else(|| RemoteDataError::Parse {
                message: format!("unparseable date in historical CSV: {:?}", date_text),
            })?;

        let number = |col: usize| field(col).parse::<f64>().unwrap_or(f64::NAN);
        bars.push(OhlcBar {
            date,
            open: number(open_col),
            high: number(high_col),
            low: number(low_col),
            close: number(close_col),
            volume: number(volume_col),
            adj_close: adj_col.map(number),
            adj_ratio: None,
        });
    }

    if bars.len() > 1 && bars.first().map(|b| b.date) > bars.last().map(|b| b.date) {
        bars.reverse();
    }
    if bars.len() > 2 && bars[bars.len() - 1].date == bars[bars.len() - 2].date {
        bars.pop();
    }

    Ok(HistoryTable::new(bars))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reverses_to_ascending_and_dedups_tail() {
        let body = "Date,Open,High,Low,Close,Volume,Adj Close\n\
                    2014-01-06,10.2,10.6,10.0,10.4,900,10.4\n\
                    2014-01-06,10.2,10.6,10.0,10.4,900,10.4\n\
                    2014-01-03,10.1,10.5,9.9,10.2,800,10.2\n\
                    2014-01-02,10.0,10.4,9.8,10.1,700,10.1\n";
        let table = parse_history_csv(body, &["%Y-%m-%d"]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.bars[0].date,
            NaiveDate::from_ymd_opt(2014, 1, 2).unwrap()
        );
        assert_eq!(
            table.bars[2].date,
            NaiveDate::from_ymd_opt(2014, 1, 6).unwrap()
        );
    }

    #[test]
    fn test_parse_without_adj_close_column() {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    6-Jan-14,10.2,10.6,10.0,10.4,900\n\
                    3-Jan-14,10.1,10.5,9.9,10.2,800\n";
        let table = parse_history_csv(body, &["%d-%b-%y"]).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.bars[0].adj_close.is_none());
    }

    #[test]
    fn test_missing_column_is_a_parse_error() {
        let body = "Date,Open,High,Low,Volume\n2014-01-02,10.0,10.4,9.8,700\n";
        let err = parse_history_csv(body, &["%Y-%m-%d"]).unwrap_err();
        assert!(format!("{}", err).contains("\"Close\""));
    }

    #[test]
    fn test_unparseable_price_degrades_to_nan() {
        let body = "Date,Open,High,Low,Close,Volume,Adj Close\n\
                    2014-01-02,N/A,10.4,9.8,10.1,700,10.1\n";
        let table = parse_history_csv(body, &["%Y-%m-%d"]).unwrap();
        assert!(table.bars[0].open.is_nan());
        assert!((table.bars[0].close - 10.1).abs() < 1e-12);
    }
}
