//! Index constituents from the Yahoo! download endpoint.
//!
//! The endpoint pages 50 constituents at a time through the `h` query
//! parameter; the walk advances by the number of tickers collected so far
//! and stops on the first page that contributes nothing new.

use std::collections::HashSet;

use tracing::debug;

use crate::errors::RemoteDataError;
use crate::fetch::PageFetcher;
use crate::models::{Cell, DataTable};

const COMPONENTS_BASE_URL: &str = "http://download.finance.yahoo.com/d/quotes.csv?";
const COMPONENTS_STATS: &str = "snx";

fn components_url(index_symbol: &str, page: usize) -> String {
    // The caret of index symbols ("^DJI") must survive the query string.
    let escaped = index_symbol.replace('^', "@%5E");
    format!(
        "{}s={}&f={}&e=.csv&h={}",
        COMPONENTS_BASE_URL, escaped, COMPONENTS_STATS, page
    )
}

/// Split one response body into (ticker, name, exchange) rows.
///
/// The endpoint wraps every field in double quotes and separates rows with
/// CRLF, so the body is stripped of its outer quotes and split on the
/// quoted delimiters rather than parsed as general CSV.
fn parse_component_lines(body: &str) -> Vec<[String; 3]> {
    let trimmed = body.trim().trim_matches('"');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split("\"\r\n\"")
        .filter_map(|line| {
            let fields: Vec<&str> = line.trim().split("\", \"").collect();
            if fields.len() == 3 {
                Some([
                    fields[0].to_string(),
                    fields[1].to_string(),
                    fields[2].to_string(),
                ])
            } else {
                None
            }
        })
        .collect()
}

/// Fetch the constituents of a Yahoo!-quoted index.
///
/// Returns a table indexed by ticker with `name` and `exchange` columns.
pub fn get_components_yahoo(
    fetcher: &dyn PageFetcher,
    index_symbol: &str,
) -> Result<DataTable, RemoteDataError> {
    let mut table = DataTable::new("ticker", vec!["name".to_string(), "exchange".to_string()]);
    let mut seen: HashSet<String> = HashSet::new();

    loop {
        let url = components_url(index_symbol, seen.len() + 1);
        let body = fetcher.fetch(&url)?;

        let mut added = 0;
        for [ticker, name, exchange] in parse_component_lines(&body) {
            if seen.insert(ticker.clone()) {
                table.push_row(
                    Cell::Text(ticker),
                    vec![Cell::Text(name), Cell::Text(exchange)],
                );
                added += 1;
            }
        }
        debug!(
            "component page for {} contributed {} new tickers",
            index_symbol, added
        );
        if added == 0 {
            break;
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubFetcher;

    fn page_body(tickers: &[(&str, &str, &str)]) -> String {
        let lines: Vec<String> = tickers
            .iter()
            .map(|(t, n, e)| format!("\"{}\", \"{}\", \"{}\"", t, n, e))
            .collect();
        lines.join("\r\n")
    }

    #[test]
    fn test_caret_is_escaped_in_url() {
        assert_eq!(
            components_url("^DJI", 1),
            "http://download.finance.yahoo.com/d/quotes.csv?s=@%5EDJI&f=snx&e=.csv&h=1"
        );
    }

    #[test]
    fn test_walk_stops_when_page_repeats_seen_tickers() {
        let first = page_body(&[
            ("MMM", "3M Company", "NYQ"),
            ("AXP", "American Express", "NYQ"),
        ]);
        // Second page repeats the same constituents, so the walk ends.
        let fetcher = StubFetcher::new()
            .with_page(&components_url("^DJI", 1), &first)
            .with_page(&components_url("^DJI", 3), &first);

        let table = get_components_yahoo(&fetcher, "^DJI").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(fetcher.call_count(), 2);
        assert!(table.contains_index(&Cell::Text("MMM".to_string())));
        assert_eq!(
            table.get(1, "name"),
            Some(&Cell::Text("American Express".to_string()))
        );
    }

    #[test]
    fn test_walk_accumulates_across_pages() {
        let first = page_body(&[("MMM", "3M Company", "NYQ")]);
        let second = page_body(&[("AXP", "American Express", "NYQ")]);
        let fetcher = StubFetcher::new()
            .with_page(&components_url("^DJI", 1), &first)
            .with_page(&components_url("^DJI", 2), &second)
            .with_page(&components_url("^DJI", 3), &second);

        let table = get_components_yahoo(&fetcher, "^DJI").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(fetcher.call_count(), 3);
    }
}
