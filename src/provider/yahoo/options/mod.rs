//! Options chain acquisition, parsing and per-expiry caching.
//!
//! An [`Options`] value is a session scoped to one underlying symbol. It
//! fetches the provider's options-listing page for a requested expiry, lifts
//! the call and put tables out of the markup, post-processes every row into an
//! [`OptionRow`] and memoizes results per (month, year) so repeated requests
//! for the same expiry never re-fetch.
//!
//! Raw table sets are cached with no TTL for the lifetime of the session - a
//! known staleness risk accepted for this data. Create a fresh session when
//! freshness matters.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use remote_data::Options;
//!
//! let mut aapl = Options::new("aapl").unwrap();
//! let expiry = NaiveDate::from_ymd_opt(2014, 5, 1).unwrap();
//! let calls = aapl.get_call_data(None, None, Some(expiry)).unwrap();
//! let near = aapl.get_near_stock_price(3, true, false, None, None, Some(expiry)).unwrap();
//! let everything = aapl.get_all_data(true, true).unwrap();
//! ```

mod page;

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use scraper::Html;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::errors::{DataError, RemoteDataError, ValidationError};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::models::{Cell, OptionRow, OptionTable, OptionType, UnderlyingSnapshot};

pub use page::{RawCell, RawTable};
use page::{extract_expiry_months, extract_snapshot, extract_tables, parse_cell};

const OPTIONS_BASE_URL: &str = "http://finance.yahoo.com/q/op?s=";

/// Positional index of each chain table in the provider's page layout.
///
/// Single point of adaptation when the upstream layout shifts.
const TABLE_LOC: [(OptionType, usize); 2] = [(OptionType::Call, 9), (OptionType::Put, 13)];

fn table_position(side: OptionType) -> usize {
    TABLE_LOC
        .iter()
        .find(|(s, _)| *s == side)
        .map(|(_, pos)| *pos)
        .expect("every side has a table position")
}

/// Cache key for one expiry: structured (month, year) rather than a
/// synthesized name string.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ExpiryKey {
    pub month: u32,
    pub year: i32,
}

/// Look up `key` in `cache`, invoking `fetch` to fill it on a miss.
fn cache_or_fetch<K, V, F>(
    cache: &mut HashMap<K, V>,
    key: K,
    fetch: F,
) -> Result<&V, RemoteDataError>
where
    K: std::hash::Hash + Eq,
    F: FnOnce() -> Result<V, RemoteDataError>,
{
    match cache.entry(key) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => Ok(entry.insert(fetch()?)),
    }
}

/// A chain-fetching session for one underlying symbol.
///
/// Holds the per-expiry raw table cache, the underlying quote snapshot from
/// the most recent page fetch, the discovered expiry month list and the
/// processed tables. Not safe for sharing across threads without external
/// locking; the whole crate is single-threaded by design.
pub struct Options {
    symbol: String,
    fetcher: Box<dyn PageFetcher>,
    clock: Box<dyn Clock>,
    chain_cache: HashMap<ExpiryKey, Vec<RawTable>>,
    snapshot: UnderlyingSnapshot,
    months: Option<Vec<NaiveDate>>,
    processed: HashMap<(OptionType, ExpiryKey), OptionTable>,
    latest: HashMap<OptionType, OptionTable>,
}

impl Options {
    /// Create a session over the live provider.
    pub fn new(symbol: &str) -> Result<Self, RemoteDataError> {
        Ok(Self::with_parts(
            symbol,
            Box::new(HttpFetcher::new()?),
            Box::new(SystemClock),
        ))
    }

    /// Create a session with an explicit fetcher and reference clock.
    pub fn with_parts(symbol: &str, fetcher: Box<dyn PageFetcher>, clock: Box<dyn Clock>) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            fetcher,
            clock,
            chain_cache: HashMap::new(),
            snapshot: UnderlyingSnapshot::default(),
            months: None,
            processed: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Underlying quote from the most recent page fetch. NaN price and None
    /// time until a page has been fetched or when the page carried no quote.
    pub fn underlying_snapshot(&self) -> UnderlyingSnapshot {
        self.snapshot
    }

    /// The most recently fetched table for a side, if any.
    pub fn latest(&self, side: OptionType) -> Option<&OptionTable> {
        self.latest.get(&side)
    }

    /// Processed table for a side and expiry, if already fetched.
    pub fn table_for(&self, side: OptionType, month: u32, year: i32) -> Option<&OptionTable> {
        self.processed.get(&(side, ExpiryKey { month, year }))
    }

    /// Call and put data for one expiry, concatenated and re-indexed.
    ///
    /// With no arguments the current month is used; `expiry` overrides
    /// `month`/`year` when both are supplied.
    pub fn get_options_data(
        &mut self,
        month: Option<u32>,
        year: Option<i32>,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionTable, DataError> {
        let puts = self.get_option_data(month, year, expiry, OptionType::Put)?;
        let calls = self.get_option_data(month, year, expiry, OptionType::Call)?;
        Ok(OptionTable::concat(vec![puts, calls]))
    }

    /// Call data for one expiry.
    pub fn get_call_data(
        &mut self,
        month: Option<u32>,
        year: Option<i32>,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionTable, DataError> {
        self.get_option_data(month, year, expiry, OptionType::Call)
    }

    /// Put data for one expiry.
    pub fn get_put_data(
        &mut self,
        month: Option<u32>,
        year: Option<i32>,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionTable, DataError> {
        self.get_option_data(month, year, expiry, OptionType::Put)
    }

    /// Rows near the underlying price: `above_below` strikes on each side of
    /// the first strike exceeding it, for each selected side.
    pub fn get_near_stock_price(
        &mut self,
        above_below: usize,
        call: bool,
        put: bool,
        month: Option<u32>,
        year: Option<i32>,
        expiry: Option<NaiveDate>,
    ) -> Result<OptionTable, DataError> {
        let mut parts = Vec::new();
        for side in selected_sides(call, put) {
            let table = self.get_option_data(month, year, expiry, side)?;
            parts.push(self.chop_data(&table, above_below));
        }
        Ok(OptionTable::concat(parts))
    }

    /// Window a table around the session's current underlying price.
    pub fn chop_data(&self, table: &OptionTable, above_below: usize) -> OptionTable {
        table.chop(above_below, self.snapshot.price)
    }

    /// Every available expiry, both sides by default.
    ///
    /// Discovers the expiry month list once per session and walks it,
    /// reusing already-processed tables.
    pub fn get_all_data(&mut self, call: bool, put: bool) -> Result<OptionTable, DataError> {
        let months = self.expiry_months()?;
        let mut parts = Vec::new();
        for side in selected_sides(call, put) {
            for expiry in &months {
                let key = ExpiryKey {
                    month: expiry.month(),
                    year: expiry.year(),
                };
                let table = match self.processed.get(&(side, key)) {
                    Some(table) => table.clone(),
                    None => self.get_option_data(None, None, Some(*expiry), side)?,
                };
                parts.push(table);
            }
        }
        Ok(OptionTable::concat(parts))
    }

    /// Chain data from the current month out `months` months.
    #[deprecated(note = "use get_all_data instead")]
    pub fn get_forward_data(
        &mut self,
        months: u32,
        call: bool,
        put: bool,
        near: bool,
        above_below: usize,
    ) -> Result<OptionTable, DataError> {
        warn!("get_forward_data() is deprecated, use get_all_data()");

        let start_month = self.clock.current_month();
        let start_year = self.clock.current_year();
        let mut parts = Vec::new();
        for side in selected_sides(call, put) {
            for offset in 0..months {
                let total = start_month as i32 - 1 + offset as i32;
                let month = (total % 12) as u32 + 1;
                let year = start_year + total / 12;
                let key = ExpiryKey { month, year };
                let mut table = match self.processed.get(&(side, key)) {
                    Some(table) => table.clone(),
                    None => self.get_option_data(Some(month), Some(year), None, side)?,
                };
                if near {
                    table = self.chop_data(&table, above_below);
                }
                parts.push(table);
            }
        }
        Ok(OptionTable::concat(parts))
    }

    /// Available expiry months, discovered once per session from the
    /// summary page.
    pub fn expiry_months(&mut self) -> Result<Vec<NaiveDate>, RemoteDataError> {
        if let Some(months) = &self.months {
            return Ok(months.clone());
        }

        let url = format!("{}{}", OPTIONS_BASE_URL, self.symbol);
        let body = self.fetcher.fetch(&url)?;
        let doc = Html::parse_document(&body);
        let months = extract_expiry_months(&doc)?;
        debug!("{}: {} expiry months available", self.symbol, months.len());
        self.months = Some(months.clone());
        Ok(months)
    }

    fn get_option_data(
        &mut self,
        month: Option<u32>,
        year: Option<i32>,
        expiry: Option<NaiveDate>,
        side: OptionType,
    ) -> Result<OptionTable, DataError> {
        let (year, month, expiry) = self.resolve_expiry(month, year, expiry)?;
        let key = ExpiryKey { month, year };
        let required = table_position(side);

        let table = {
            let Self {
                symbol,
                fetcher,
                clock,
                chain_cache,
                snapshot,
                ..
            } = self;
            let symbol = symbol.as_str();
            let fetcher = fetcher.as_ref();
            let clock = clock.as_ref();
            let snapshot_slot = &mut *snapshot;
            let tables = cache_or_fetch(chain_cache, key, move || {
                let (tables, snap) = fetch_chain_page(fetcher, clock, symbol, expiry)?;
                *snapshot_slot = snap;
                Ok(tables)
            })?;

            let found = tables.len();
            let raw = tables
                .get(required)
                .ok_or(RemoteDataError::TableLocation { required, found })?;
            parse_chain_table(raw, side, symbol, *snapshot)?
        };

        self.processed.insert((side, key), table.clone());
        self.latest.insert(side, table.clone());
        Ok(table)
    }

    /// Validate the month/year/expiry argument triple.
    ///
    /// Exactly one of {explicit expiry} / {month and year} / {current-month
    /// default} applies; month or year alone without an expiry is an error.
    fn resolve_expiry(
        &self,
        month: Option<u32>,
        year: Option<i32>,
        expiry: Option<NaiveDate>,
    ) -> Result<(i32, u32, NaiveDate), ValidationError> {
        if let Some(expiry) = expiry {
            return Ok((expiry.year(), expiry.month(), expiry));
        }
        match (month, year) {
            (Some(month), Some(year)) => {
                warn!("month, year arguments are deprecated, use expiry instead");
                let expiry = NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or(ValidationError::InvalidMonth { month })?;
                Ok((year, month, expiry))
            }
            (None, None) => {
                let year = self.clock.current_year();
                let month = self.clock.current_month();
                let expiry = NaiveDate::from_ymd_opt(year, month, 1)
                    .ok_or(ValidationError::InvalidMonth { month })?;
                Ok((year, month, expiry))
            }
            _ => Err(ValidationError::InconsistentExpiryArgs),
        }
    }
}

fn selected_sides(call: bool, put: bool) -> Vec<OptionType> {
    let mut sides = Vec::new();
    if call {
        sides.push(OptionType::Call);
    }
    if put {
        sides.push(OptionType::Put);
    }
    sides
}

/// Fetch and lift the options page for one expiry.
///
/// The URL requests the default "current options" view for the current
/// calendar month and an explicit year-month view otherwise. A page with no
/// tables at all fails; a page with no live quote degrades the snapshot.
fn fetch_chain_page(
    fetcher: &dyn PageFetcher,
    clock: &dyn Clock,
    symbol: &str,
    expiry: NaiveDate,
) -> Result<(Vec<RawTable>, UnderlyingSnapshot), RemoteDataError> {
    let mut url = format!("{}{}", OPTIONS_BASE_URL, symbol);
    if expiry.month() == clock.current_month() && expiry.year() == clock.current_year() {
        url.push_str("+Options");
    } else {
        url.push_str(&format!("&m={}-{:02}", expiry.year(), expiry.month()));
    }

    let body = fetcher.fetch(&url)?;
    let doc = Html::parse_document(&body);
    let tables = extract_tables(&doc);
    if tables.is_empty() {
        return Err(RemoteDataError::NoTables { url });
    }
    let snapshot = extract_snapshot(&doc, clock);
    Ok((tables, snapshot))
}

/// Parse one lifted chain table into processed, indexed rows.
fn parse_chain_table(
    raw: &RawTable,
    side: OptionType,
    symbol: &str,
    snapshot: UnderlyingSnapshot,
) -> Result<OptionTable, RemoteDataError> {
    let columns = ChainColumns::locate(raw.header())?;
    let mut rows = Vec::with_capacity(raw.data_rows().len());
    for cells in raw.data_rows() {
        if cells.is_empty() {
            continue;
        }
        rows.push(columns.build_row(cells, side, symbol, snapshot)?);
    }
    OptionTable::from_rows(rows)
}

/// Column positions resolved from a chain table's header row.
struct ChainColumns {
    strike: usize,
    symbol: usize,
    last: Option<usize>,
    chg: Option<usize>,
    bid: Option<usize>,
    ask: Option<usize>,
    vol: Option<usize>,
    open_int: Option<usize>,
}

impl ChainColumns {
    fn locate(header: &[RawCell]) -> Result<Self, RemoteDataError> {
        let position = |name: &str| header.iter().position(|c| c.text == name);
        Ok(Self {
            strike: position("Strike").ok_or_else(|| missing_column("Strike"))?,
            symbol: position("Symbol").ok_or_else(|| missing_column("Symbol"))?,
            last: position("Last"),
            chg: position("Chg"),
            bid: position("Bid"),
            ask: position("Ask"),
            vol: position("Vol"),
            // The provider labels open interest "Open Int"; it is renamed
            // Open_Int in the output.
            open_int: position("Open Int").or_else(|| position("Open_Int")),
        })
    }

    fn build_row(
        &self,
        cells: &[RawCell],
        side: OptionType,
        underlying: &str,
        snapshot: UnderlyingSnapshot,
    ) -> Result<OptionRow, RemoteDataError> {
        let float_at = |pos: Option<usize>| {
            pos.and_then(|i| cells.get(i))
                .map(|c| parse_cell(c).as_f64().unwrap_or(f64::NAN))
                .unwrap_or(f64::NAN)
        };
        let int_at = |pos: Option<usize>| {
            pos.and_then(|i| cells.get(i)).and_then(|c| match parse_cell(c) {
                Cell::Int(v) => Some(v),
                Cell::Float(v) if v.is_finite() => Some(v as i64),
                _ => None,
            })
        };

        let strike = cells
            .get(self.strike)
            .map(parse_cell)
            .and_then(|c| c.as_f64())
            .filter(|v| v.is_finite())
            .ok_or_else(|| parse_error("unparseable strike"))?;
        let symbol = cells
            .get(self.symbol)
            .map(|c| c.text.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error("missing option symbol"))?;

        let (root, expiry) = decode_symbol(&symbol)?;
        let is_nonstandard = root.replace('-', "") != underlying.replace('-', "");

        Ok(OptionRow {
            strike,
            expiry,
            option_type: side,
            symbol,
            last: float_at(self.last),
            chg: float_at(self.chg),
            bid: float_at(self.bid),
            ask: float_at(self.ask),
            vol: int_at(self.vol),
            open_int: int_at(self.open_int),
            is_nonstandard,
            underlying: underlying.to_string(),
            underlying_price: snapshot.price,
            quote_time: snapshot.quote_time,
        })
    }
}

/// Decompose a provider option symbol into its root and expiry date.
///
/// "AAPL140517C00100000" strips the 9-character type+strike suffix to
/// "AAPL140517", whose trailing 6 characters are the yymmdd expiry and whose
/// remainder is the root.
fn decode_symbol(symbol: &str) -> Result<(&str, NaiveDate), RemoteDataError> {
    if symbol.len() < 16 || !symbol.is_ascii() {
        return Err(parse_error(&format!("malformed option symbol {:?}", symbol)));
    }
    let root_exp = &symbol[..symbol.len() - 9];
    let (root, date_code) = root_exp.split_at(root_exp.len() - 6);
    let expiry = NaiveDate::parse_from_str(date_code, "%y%m%d")
        .map_err(|_| parse_error(&format!("bad expiry code in symbol {:?}", symbol)))?;
    Ok((root, expiry))
}

fn parse_error(message: &str) -> RemoteDataError {
    RemoteDataError::Parse {
        message: message.to_string(),
    }
}

fn missing_column(name: &str) -> RemoteDataError {
    parse_error(&format!("header column {:?} not found", name))
}
