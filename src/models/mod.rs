//! Normalized data models shared by all providers.

mod history;
mod options;
mod table;

pub use history::{calc_return_index, HistoryPanel, HistoryTable, OhlcBar};
pub use options::{OptionRow, OptionTable, OptionType, UnderlyingSnapshot};
pub use table::{Cell, DataTable};
