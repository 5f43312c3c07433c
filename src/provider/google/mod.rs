//! Historical daily OHLC download from Google Finance.
//!
//! Google publishes history only; there is no quote endpoint, and the CSV
//! carries no adjusted close.

use std::time::Duration;

use chrono::NaiveDate;
use urlencoding::encode;

use crate::errors::RemoteDataError;
use crate::fetch::{fetch_with_retry, PageFetcher};
use crate::models::{DataTable, HistoryTable};

const HISTORY_BASE_URL: &str = "http://www.google.com/finance/historical?";

pub(crate) const SOURCE_NAME: &str = "Google";

/// Build the historical query. Dates travel as "%b %d, %Y" text and must be
/// urlencoded.
fn history_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    let start_text = start.format("%b %d, %Y").to_string();
    let end_text = end.format("%b %d, %Y").to_string();
    format!(
        "{}q={}&startdate={}&enddate={}&output=csv",
        HISTORY_BASE_URL,
        encode(symbol),
        encode(&start_text),
        encode(&end_text),
    )
}

/// Fetch daily OHLC bars for one symbol over [start, end], retrying
/// transient failures with a fixed pause between attempts.
pub fn get_history_google(
    fetcher: &dyn PageFetcher,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    retry_count: usize,
    pause: Duration,
) -> Result<HistoryTable, RemoteDataError> {
    let url = history_url(symbol, start, end);
    let body = fetch_with_retry(fetcher, &url, retry_count, pause, SOURCE_NAME)?;
    crate::provider::parse_history_csv(&body, &["%d-%b-%y"])
}

/// Google Finance has no snapshot quote endpoint.
pub fn get_quote_google(_symbols: &[&str]) -> Result<DataTable, RemoteDataError> {
    Err(RemoteDataError::NotSupported {
        operation: "quotes".to_string(),
        provider: "Google Finance".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    fn day(month: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, month, d).unwrap()
    }

    #[test]
    fn test_url_encodes_textual_dates() {
        let url = history_url("GOOG", day(1, 2), day(3, 31));
        assert_eq!(
            url,
            "http://www.google.com/finance/historical?q=GOOG\
             &startdate=Jan%2002%2C%202014&enddate=Mar%2031%2C%202014&output=csv"
        );
    }

    #[test]
    fn test_history_parses_google_dates_without_adj_close() {
        let url = history_url("GOOG", day(1, 2), day(1, 6));
        let body = "Date,Open,High,Low,Close,Volume\n\
                    6-Jan-14,554.4,557.3,553.7,555.5,3294200\n\
                    3-Jan-14,552.9,553.7,540.4,540.9,3001800\n\
                    2-Jan-14,555.7,556.8,549.3,553.1,3666400\n";
        let fetcher = StubFetcher::new().with_page(&url, body);

        let table = get_history_google(
            &fetcher,
            "GOOG",
            day(1, 2),
            day(1, 6),
            3,
            Duration::from_millis(0),
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.bars[0].date, day(1, 2));
        assert!(table.bars[0].adj_close.is_none());
    }

    #[test]
    fn test_quotes_are_not_supported() {
        let err = get_quote_google(&["GOOG"]).unwrap_err();
        assert_eq!(
            format!("{}", err),
            "Google Finance doesn't have this functionality: quotes"
        );
    }
}
