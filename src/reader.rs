//! Top-level dispatch over the supported data sources.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::warn;

use crate::clock::Clock;
use crate::errors::{RemoteDataError, Result, ValidationError};
use crate::fetch::PageFetcher;
use crate::models::{DataTable, HistoryPanel, HistoryTable};
use crate::provider::{famafrench, fred, google, yahoo};

/// Fill in the default date range: 2010-01-01 through the clock's today.
pub fn sanitize_dates(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    clock: &dyn Clock,
) -> (NaiveDate, NaiveDate) {
    let start = start.unwrap_or_else(|| {
        NaiveDate::from_ymd_opt(2010, 1, 1).expect("2010-01-01 is a valid date")
    });
    let end = end.unwrap_or_else(|| clock.today());
    (start, end)
}

/// Knobs for the historical fetchers.
#[derive(Clone, Debug)]
pub struct HistoryOptions {
    /// Attempts per symbol before giving up.
    pub retry_count: usize,
    /// Sleep before each attempt.
    pub pause: Duration,
    /// Scale O/H/L/C by the Adj Close ratio.
    pub adjust_price: bool,
    /// Attach a cumulative return index.
    pub ret_index: bool,
    /// Symbols per download batch.
    pub chunksize: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            retry_count: 3,
            pause: Duration::from_millis(1),
            adjust_price: false,
            ret_index: false,
            chunksize: 25,
        }
    }
}

/// A remote source the top-level reader can dispatch to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataSource {
    Yahoo,
    Google,
    Fred,
    FamaFrench,
}

impl DataSource {
    /// Human name used in download errors.
    pub fn source_name(&self) -> &'static str {
        match self {
            DataSource::Yahoo => "Yahoo!",
            DataSource::Google => "Google",
            DataSource::Fred => "FRED",
            DataSource::FamaFrench => "Fama/French",
        }
    }
}

impl FromStr for DataSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, ValidationError> {
        match s.to_ascii_lowercase().as_str() {
            "yahoo" => Ok(DataSource::Yahoo),
            "google" => Ok(DataSource::Google),
            "fred" => Ok(DataSource::Fred),
            "famafrench" | "ff" => Ok(DataSource::FamaFrench),
            _ => Err(ValidationError::UnknownSource(s.to_string())),
        }
    }
}

fn fetch_one(
    fetcher: &dyn PageFetcher,
    source: DataSource,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    options: &HistoryOptions,
) -> std::result::Result<HistoryTable, RemoteDataError> {
    let mut table = match source {
        DataSource::Yahoo => yahoo::get_history_yahoo(
            fetcher,
            symbol,
            start,
            end,
            options.retry_count,
            options.pause,
        )?,
        DataSource::Google => google::get_history_google(
            fetcher,
            symbol,
            start,
            end,
            options.retry_count,
            options.pause,
        )?,
        other => {
            return Err(RemoteDataError::NotSupported {
                operation: "daily history".to_string(),
                provider: other.source_name().to_string(),
            })
        }
    };
    if options.ret_index {
        table.attach_return_index();
    }
    if options.adjust_price {
        table.adjust_prices();
    }
    Ok(table)
}

/// Fetch history for one symbol, applying the adjust/return-index options.
pub fn get_data_yahoo(
    fetcher: &dyn PageFetcher,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    clock: &dyn Clock,
    options: &HistoryOptions,
) -> Result<HistoryTable> {
    let (start, end) = sanitize_dates(start, end, clock);
    Ok(fetch_one(fetcher, DataSource::Yahoo, symbol, start, end, options)?)
}

/// Fetch history for one symbol from Google Finance.
pub fn get_data_google(
    fetcher: &dyn PageFetcher,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    clock: &dyn Clock,
    options: &HistoryOptions,
) -> Result<HistoryTable> {
    let (start, end) = sanitize_dates(start, end, clock);
    Ok(fetch_one(fetcher, DataSource::Google, symbol, start, end, options)?)
}

/// Download history for many symbols in chunks.
///
/// A symbol that keeps failing is logged and recorded with no table rather
/// than aborting the batch; the download only fails outright when every
/// symbol failed.
pub fn download_history(
    fetcher: &dyn PageFetcher,
    source: DataSource,
    symbols: &[&str],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    clock: &dyn Clock,
    options: &HistoryOptions,
) -> Result<HistoryPanel> {
    let (start, end) = sanitize_dates(start, end, clock);
    let mut tables: BTreeMap<String, Option<HistoryTable>> = BTreeMap::new();

    for chunk in symbols.chunks(options.chunksize.max(1)) {
        for symbol in chunk {
            match fetch_one(fetcher, source, symbol, start, end, options) {
                Ok(table) => {
                    tables.insert(symbol.to_string(), Some(table));
                }
                Err(e) => {
                    warn!("Failed to read symbol {:?}, replacing with NaN: {}", symbol, e);
                    tables.insert(symbol.to_string(), None);
                }
            }
        }
    }

    if tables.values().all(|t| t.is_none()) {
        return Err(RemoteDataError::NoData {
            source_name: source.source_name().to_string(),
        }
        .into());
    }
    Ok(HistoryPanel { tables })
}

/// Output of the top-level reader; shape depends on the source.
#[derive(Clone, Debug)]
pub enum ReaderOutput {
    /// Daily OHLC history (yahoo, google).
    History(HistoryTable),
    /// Date-indexed series table (fred).
    Table(DataTable),
    /// Position-keyed datasets (famafrench).
    Datasets(BTreeMap<usize, DataTable>),
}

/// Fetch data from a named source.
///
/// `name` is a ticker for yahoo/google, a series name for fred and an
/// archive name for famafrench (which ignores the date range).
pub fn data_reader(
    fetcher: &dyn PageFetcher,
    clock: &dyn Clock,
    name: &str,
    source: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    options: &HistoryOptions,
) -> Result<ReaderOutput> {
    let source = DataSource::from_str(source)?;
    match source {
        DataSource::Yahoo => Ok(ReaderOutput::History(get_data_yahoo(
            fetcher, name, start, end, clock, options,
        )?)),
        DataSource::Google => Ok(ReaderOutput::History(get_data_google(
            fetcher, name, start, end, clock, options,
        )?)),
        DataSource::Fred => {
            let (start, end) = sanitize_dates(start, end, clock);
            Ok(ReaderOutput::Table(fred::get_data_fred(
                fetcher,
                &[name],
                start,
                end,
            )?))
        }
        DataSource::FamaFrench => Ok(ReaderOutput::Datasets(
            famafrench::get_data_famafrench(fetcher, name)?,
        )),
    }
}
