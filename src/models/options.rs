//! Option chain rows and the indexed chain table.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::errors::RemoteDataError;

/// Side of an option contract.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Lowercase label as it appears in the output table ("call" / "put").
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

/// The underlying's last trade and the time it printed, as read off the
/// options page. Overwritten on every successful page fetch; degrades to
/// (NaN, None) when the page carries no live quote.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UnderlyingSnapshot {
    pub price: f64,
    pub quote_time: Option<NaiveDateTime>,
}

impl Default for UnderlyingSnapshot {
    fn default() -> Self {
        Self {
            price: f64::NAN,
            quote_time: None,
        }
    }
}

/// One post-processed row of a call or put table.
///
/// Uniquely keyed by (Strike, Expiry, Type, Symbol) within one parsed table.
/// Price fields degrade to NaN where the source shows "-" or "N/A".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptionRow {
    pub strike: f64,
    pub expiry: NaiveDate,
    pub option_type: OptionType,
    /// Provider-assigned option symbol, e.g. "AAPL140517C00100000".
    pub symbol: String,
    pub last: f64,
    pub chg: f64,
    pub bid: f64,
    pub ask: f64,
    pub vol: Option<i64>,
    pub open_int: Option<i64>,
    /// True when the decoded root differs from the underlying symbol,
    /// i.e. the deliverable is not the standard 100 shares.
    pub is_nonstandard: bool,
    /// Ticker of the underlying security.
    pub underlying: String,
    /// Underlying last trade at fetch time; NaN when the page had no quote.
    pub underlying_price: f64,
    /// Time of the underlying quote; None when the page had no quote.
    pub quote_time: Option<NaiveDateTime>,
}

impl OptionRow {
    /// Ordering over the index tuple (Strike, Expiry, Type, Symbol).
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.strike
            .total_cmp(&other.strike)
            .then_with(|| self.expiry.cmp(&other.expiry))
            .then_with(|| self.option_type.as_str().cmp(other.option_type.as_str()))
            .then_with(|| self.symbol.cmp(&other.symbol))
    }

    fn key_eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }

    /// True when every data field is missing, i.e. the row carries no quote
    /// at all. Such rows are dropped by the near-price window.
    pub fn is_all_empty(&self) -> bool {
        self.last.is_nan()
            && self.chg.is_nan()
            && self.bid.is_nan()
            && self.ask.is_nan()
            && self.vol.is_none()
            && self.open_int.is_none()
    }
}

/// A chain table: option rows sorted by their (Strike, Expiry, Type, Symbol)
/// index, unique in that tuple.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OptionTable {
    rows: Vec<OptionRow>,
}

impl OptionTable {
    /// Index the rows: sort by (Strike, Expiry, Type, Symbol) and reject
    /// duplicate index tuples.
    pub fn from_rows(mut rows: Vec<OptionRow>) -> Result<Self, RemoteDataError> {
        rows.sort_by(|a, b| a.key_cmp(b));
        if let Some(pair) = rows.windows(2).find(|w| w[0].key_eq(&w[1])) {
            return Err(RemoteDataError::Parse {
                message: format!(
                    "duplicate option row for strike {} symbol {}",
                    pair[0].strike, pair[0].symbol
                ),
            });
        }
        Ok(Self { rows })
    }

    /// Concatenate several tables and re-sort on the shared index.
    pub fn concat(tables: Vec<OptionTable>) -> Self {
        let mut rows: Vec<OptionRow> = tables.into_iter().flat_map(|t| t.rows).collect();
        rows.sort_by(|a, b| a.key_cmp(b));
        Self { rows }
    }

    pub fn rows(&self) -> &[OptionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Strikes in table order (ascending, since the table is indexed).
    pub fn strikes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.strike).collect()
    }

    /// Window the table to the rows nearest the underlying price.
    ///
    /// Finds the first row whose strike exceeds `underlying_price` and keeps
    /// `above_below` rows on each side of it, inclusive. A NaN price returns
    /// the table unchanged; a window that runs past either end is clamped
    /// silently, so the result may hold fewer than `2 * above_below + 1`
    /// rows. Rows that are entirely empty are dropped from the window.
    pub fn chop(&self, above_below: usize, underlying_price: f64) -> OptionTable {
        if underlying_price.is_nan() {
            return self.clone();
        }

        let pivot = match self
            .rows
            .iter()
            .position(|r| r.strike > underlying_price)
        {
            Some(i) => i,
            None => return self.clone(),
        };

        let start = pivot.saturating_sub(above_below);
        let end = (pivot + above_below + 1).min(self.rows.len());
        let rows = self.rows[start..end]
            .iter()
            .filter(|r| !r.is_all_empty())
            .cloned()
            .collect();
        Self { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(strike: f64, option_type: OptionType, symbol: &str) -> OptionRow {
        OptionRow {
            strike,
            expiry: NaiveDate::from_ymd_opt(2014, 5, 17).unwrap(),
            option_type,
            symbol: symbol.to_string(),
            last: 1.0,
            chg: 0.1,
            bid: 0.9,
            ask: 1.1,
            vol: Some(10),
            open_int: Some(100),
            is_nonstandard: false,
            underlying: "AAPL".to_string(),
            underlying_price: 42.0,
            quote_time: None,
        }
    }

    fn ascending_table() -> OptionTable {
        let rows = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]
            .iter()
            .map(|&s| row(s, OptionType::Call, &format!("AAPL140517C{:08}", s as i64)))
            .collect();
        OptionTable::from_rows(rows).unwrap()
    }

    #[test]
    fn test_chop_windows_around_first_strike_above_price() {
        let table = ascending_table();
        let chopped = table.chop(2, 42.0);
        assert_eq!(chopped.strikes(), vec![20.0, 30.0, 40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_chop_with_nan_price_returns_table_unchanged() {
        let table = ascending_table();
        let chopped = table.chop(2, f64::NAN);
        assert_eq!(chopped.strikes(), table.strikes());
    }

    #[test]
    fn test_chop_clamps_at_table_edges_without_error() {
        let table = ascending_table();
        // First strike above 5.0 is index 0; only the upper side fits.
        let chopped = table.chop(2, 5.0);
        assert_eq!(chopped.strikes(), vec![10.0, 20.0, 30.0]);

        // First strike above 65.0 is the last row.
        let chopped = table.chop(2, 65.0);
        assert_eq!(chopped.strikes(), vec![50.0, 60.0, 70.0]);
    }

    #[test]
    fn test_chop_drops_entirely_empty_rows() {
        let mut rows: Vec<OptionRow> = [10.0, 20.0, 30.0, 40.0, 50.0]
            .iter()
            .map(|&s| row(s, OptionType::Call, &format!("AAPL140517C{:08}", s as i64)))
            .collect();
        rows[2].last = f64::NAN;
        rows[2].chg = f64::NAN;
        rows[2].bid = f64::NAN;
        rows[2].ask = f64::NAN;
        rows[2].vol = None;
        rows[2].open_int = None;
        let table = OptionTable::from_rows(rows).unwrap();

        let chopped = table.chop(2, 22.0);
        assert_eq!(chopped.strikes(), vec![10.0, 20.0, 40.0, 50.0]);
    }

    #[test]
    fn test_from_rows_rejects_duplicate_index_tuples() {
        let rows = vec![
            row(10.0, OptionType::Call, "AAPL140517C00010000"),
            row(10.0, OptionType::Call, "AAPL140517C00010000"),
        ];
        let err = OptionTable::from_rows(rows).unwrap_err();
        assert!(format!("{}", err).contains("duplicate option row"));
    }

    #[test]
    fn test_from_rows_sorts_by_index() {
        let rows = vec![
            row(30.0, OptionType::Put, "AAPL140517P00030000"),
            row(10.0, OptionType::Call, "AAPL140517C00010000"),
            row(10.0, OptionType::Put, "AAPL140517P00010000"),
        ];
        let table = OptionTable::from_rows(rows).unwrap();
        assert_eq!(table.strikes(), vec![10.0, 10.0, 30.0]);
        // At equal strike/expiry, "call" sorts before "put".
        assert_eq!(table.rows()[0].option_type, OptionType::Call);
    }

    #[test]
    fn test_concat_resorts_on_shared_index() {
        let calls = OptionTable::from_rows(vec![
            row(20.0, OptionType::Call, "AAPL140517C00020000"),
            row(40.0, OptionType::Call, "AAPL140517C00040000"),
        ])
        .unwrap();
        let puts = OptionTable::from_rows(vec![
            row(30.0, OptionType::Put, "AAPL140517P00030000"),
        ])
        .unwrap();
        let both = OptionTable::concat(vec![calls, puts]);
        assert_eq!(both.strikes(), vec![20.0, 30.0, 40.0]);
    }
}
