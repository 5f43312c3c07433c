//! Historical daily OHLC download from the Yahoo! chart endpoint.

use std::time::Duration;

use chrono::{Datelike, NaiveDate};

use crate::errors::RemoteDataError;
use crate::fetch::{fetch_with_retry, PageFetcher};
use crate::models::HistoryTable;
use crate::provider::parse_history_csv;

const HISTORY_BASE_URL: &str = "http://ichart.finance.yahoo.com/table.csv?";

pub(crate) const SOURCE_NAME: &str = "Yahoo!";

/// Build the chart query for one symbol. Months are zero-based in this
/// endpoint's query string.
fn history_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}s={}&a={}&b={}&c={}&d={}&e={}&f={}&g=d&ignore=.csv",
        HISTORY_BASE_URL,
        symbol,
        start.month() - 1,
        start.day(),
        start.year(),
        end.month() - 1,
        end.day(),
        end.year(),
    )
}

/// Fetch daily OHLC bars for one symbol over [start, end], retrying
/// transient failures with a fixed pause between attempts.
pub fn get_history_yahoo(
    fetcher: &dyn PageFetcher,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    retry_count: usize,
    pause: Duration,
) -> Result<HistoryTable, RemoteDataError> {
    let url = history_url(symbol, start, end);
    let body = fetch_with_retry(fetcher, &url, retry_count, pause, SOURCE_NAME)?;
    parse_history_csv(&body, &["%Y-%m-%d"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    fn day(month: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, month, d).unwrap()
    }

    #[test]
    fn test_url_uses_zero_based_months() {
        let url = history_url("AAPL", day(1, 2), day(3, 31));
        assert_eq!(
            url,
            "http://ichart.finance.yahoo.com/table.csv?\
             s=AAPL&a=0&b=2&c=2014&d=2&e=31&f=2014&g=d&ignore=.csv"
        );
    }

    #[test]
    fn test_history_parses_ascending() {
        let url = history_url("AAPL", day(1, 2), day(1, 6));
        let body = "Date,Open,High,Low,Close,Volume,Adj Close\n\
                    2014-01-06,556.0,557.3,553.7,555.5,56471000,76.2\n\
                    2014-01-03,552.9,553.7,540.4,540.9,98116900,74.2\n\
                    2014-01-02,555.7,556.8,549.3,553.1,58671200,75.9\n";
        let fetcher = StubFetcher::new().with_page(&url, body);

        let table = get_history_yahoo(
            &fetcher,
            "AAPL",
            day(1, 2),
            day(1, 6),
            3,
            Duration::from_millis(0),
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.bars[0].date, day(1, 2));
        assert_eq!(table.bars[0].adj_close, Some(75.9));
    }

    #[test]
    fn test_exhausted_retries_name_the_source() {
        let fetcher = StubFetcher::new();
        let err = get_history_yahoo(
            &fetcher,
            "AAPL",
            day(1, 2),
            day(1, 6),
            2,
            Duration::from_millis(0),
        )
        .unwrap_err();
        let text = format!("{}", err);
        assert!(text.contains("After 2 tries"));
        assert!(text.contains("Yahoo!"));
        assert_eq!(fetcher.call_count(), 2);
    }
}
