//! Historical OHLC series and derived columns.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::table::{Cell, DataTable};

/// One daily OHLC row from a historical price download.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Dividend/split adjusted close; absent for sources that don't publish it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adj_close: Option<f64>,
    /// Adj Close / Close ratio, present after price adjustment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adj_ratio: Option<f64>,
}

/// A historical price series for one symbol, ascending by date.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryTable {
    pub bars: Vec<OhlcBar>,
    /// Cumulative return index per bar, present when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ret_index: Option<Vec<f64>>,
}

impl HistoryTable {
    pub fn new(bars: Vec<OhlcBar>) -> Self {
        Self {
            bars,
            ret_index: None,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Scale Open/High/Low/Close by the Adj Close / Close ratio.
    ///
    /// Adds `adj_ratio` to every bar and drops `adj_close`, mirroring the
    /// "adjust_price" option of the historical fetchers. Bars without an
    /// adjusted close are left unscaled with a NaN ratio.
    pub fn adjust_prices(&mut self) {
        for bar in &mut self.bars {
            let ratio = match bar.adj_close {
                Some(adj) => adj / bar.close,
                None => f64::NAN,
            };
            if ratio.is_finite() {
                bar.open *= ratio;
                bar.high *= ratio;
                bar.low *= ratio;
                bar.close *= ratio;
            }
            bar.adj_ratio = Some(ratio);
            bar.adj_close = None;
        }
    }

    /// Adjusted close per bar, falling back to close where absent.
    pub fn adj_close_series(&self) -> Vec<f64> {
        self.bars
            .iter()
            .map(|b| b.adj_close.unwrap_or(b.close))
            .collect()
    }

    /// Compute and attach the cumulative return index over the adjusted
    /// close series.
    pub fn attach_return_index(&mut self) {
        let prices: Vec<Option<f64>> = self.adj_close_series().into_iter().map(Some).collect();
        self.ret_index = Some(calc_return_index(&prices));
    }
}

/// Cumulative return index over an aligned price series.
///
/// `prices[i] = None` marks a date where the symbol has no quote (e.g. listed
/// after the start of the index). The result is the cumulative product of
/// `1 + pct_change`; the entry before the first valid return is set to 1 so
/// the index starts at par rather than NaN.
pub fn calc_return_index(prices: &[Option<f64>]) -> Vec<f64> {
    let n = prices.len();
    let mut out = vec![f64::NAN; n];
    let mut running = 1.0;

    for i in 1..n {
        if let (Some(prev), Some(cur)) = (prices[i - 1], prices[i]) {
            if prev != 0.0 && prev.is_finite() && cur.is_finite() {
                running *= cur / prev;
                out[i] = running;
            }
        }
    }

    if n > 1 && !out[1].is_nan() {
        out[0] = 1.0;
    } else if let Some(first_valid) = out.iter().position(|v| !v.is_nan()) {
        if first_valid > 0 {
            out[first_valid - 1] = 1.0;
        }
    }

    out
}

/// Historical series for several symbols, aligned on the union of dates.
///
/// Symbols that failed to download are present with no table, mirroring the
/// replace-with-NaN behavior of the bulk downloader.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryPanel {
    pub tables: BTreeMap<String, Option<HistoryTable>>,
}

impl HistoryPanel {
    /// Union of all dates across symbols, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self
            .tables
            .values()
            .flatten()
            .flat_map(|t| t.bars.iter().map(|b| b.date))
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Symbols that actually produced data.
    pub fn symbols(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|(_, t)| t.is_some())
            .map(|(s, _)| s.as_str())
            .collect()
    }

    /// Return index per symbol on the aligned date axis, one column per
    /// symbol that produced data.
    pub fn return_index(&self) -> DataTable {
        let dates = self.dates();
        let symbols: Vec<String> = self.symbols().iter().map(|s| s.to_string()).collect();
        let mut out = DataTable::new("Date", symbols.clone());

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(symbols.len());
        for sym in &symbols {
            let table = self.tables[sym].as_ref().expect("symbol has data");
            let by_date: BTreeMap<NaiveDate, f64> = table
                .bars
                .iter()
                .map(|b| (b.date, b.adj_close.unwrap_or(b.close)))
                .collect();
            let aligned: Vec<Option<f64>> =
                dates.iter().map(|d| by_date.get(d).copied()).collect();
            columns.push(calc_return_index(&aligned));
        }

        for (i, date) in dates.iter().enumerate() {
            let values = columns
                .iter()
                .map(|col| {
                    if col[i].is_nan() {
                        Cell::Null
                    } else {
                        Cell::Float(col[i])
                    }
                })
                .collect();
            out.push_row(Cell::Date(*date), values);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, close: f64, adj: f64) -> OhlcBar {
        OhlcBar {
            date,
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000.0,
            adj_close: Some(adj),
            adj_ratio: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2014, 1, d).unwrap()
    }

    #[test]
    fn test_adjust_prices_scales_by_adj_ratio_and_drops_adj_close() {
        let mut table = HistoryTable::new(vec![bar(day(2), 100.0, 50.0)]);
        table.adjust_prices();

        let b = &table.bars[0];
        assert_eq!(b.adj_ratio, Some(0.5));
        assert!((b.close - 50.0).abs() < 1e-12);
        assert!((b.open - 49.5).abs() < 1e-12);
        assert!((b.high - 50.5).abs() < 1e-12);
        assert!((b.low - 49.0).abs() < 1e-12);
        assert!(b.adj_close.is_none());
    }

    #[test]
    fn test_return_index_starts_at_par() {
        let prices = vec![Some(100.0), Some(110.0), Some(121.0)];
        let idx = calc_return_index(&prices);
        assert!((idx[0] - 1.0).abs() < 1e-12);
        assert!((idx[1] - 1.1).abs() < 1e-12);
        assert!((idx[2] - 1.21).abs() < 1e-12);
    }

    #[test]
    fn test_return_index_backfills_par_before_late_listing() {
        // Symbol lists on the third date of the axis.
        let prices = vec![None, None, Some(10.0), Some(12.0)];
        let idx = calc_return_index(&prices);
        assert!(idx[0].is_nan());
        assert!(idx[1].is_nan());
        // idx[3] is the first computable return; idx[2] backfills to 1.
        assert!((idx[2] - 1.0).abs() < 1e-12);
        assert!((idx[3] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_panel_return_index_aligns_on_date_union() {
        let mut panel = HistoryPanel::default();
        panel.tables.insert(
            "AAA".to_string(),
            Some(HistoryTable::new(vec![
                bar(day(2), 100.0, 100.0),
                bar(day(3), 110.0, 110.0),
            ])),
        );
        panel.tables.insert(
            "BBB".to_string(),
            Some(HistoryTable::new(vec![
                bar(day(3), 50.0, 50.0),
                bar(day(6), 55.0, 55.0),
            ])),
        );
        panel.tables.insert("CCC".to_string(), None);

        let ret = panel.return_index();
        assert_eq!(ret.columns, vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(ret.len(), 3); // union of Jan 2, 3, 6
        assert_eq!(ret.get(0, "AAA"), Some(&Cell::Float(1.0)));
        assert_eq!(ret.get(0, "BBB"), Some(&Cell::Null));
        assert_eq!(ret.get(1, "BBB"), Some(&Cell::Float(1.0)));
    }
}
