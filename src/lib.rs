//! Remote data access for tabular financial time series.
//!
//! Pulls quotes, daily OHLC history, options chains, index constituents,
//! FRED series and Fama-French research datasets from their public web
//! endpoints and normalizes them into common table shapes. All I/O is
//! sequential and blocking; nothing here schedules, persists or streams.
//!
//! The usual entry points are [`data_reader`] for source-dispatched
//! history and series, and [`Options`] for an options-chain session that
//! caches fetched pages per expiry.

pub mod clock;
pub mod errors;
pub mod fetch;
pub mod models;
pub mod provider;
pub mod reader;

pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{DataError, RemoteDataError, Result, ValidationError};
pub use fetch::{HttpFetcher, PageFetcher};
pub use models::{
    calc_return_index, Cell, DataTable, HistoryPanel, HistoryTable, OhlcBar, OptionRow,
    OptionTable, OptionType, UnderlyingSnapshot,
};
pub use provider::famafrench::get_data_famafrench;
pub use provider::fred::get_data_fred;
pub use provider::google::{get_history_google, get_quote_google};
pub use provider::yahoo::{
    get_components_yahoo, get_history_yahoo, get_quote_yahoo, ExpiryKey, Options,
};
pub use reader::{
    data_reader, download_history, get_data_google, get_data_yahoo, sanitize_dates, DataSource,
    HistoryOptions, ReaderOutput,
};
