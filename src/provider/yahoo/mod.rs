//! Yahoo! Finance: options chains, delayed quotes, daily history and index
//! constituents.

mod components;
mod history;
mod options;
mod quotes;

pub use components::get_components_yahoo;
pub use history::get_history_yahoo;
pub use options::{ExpiryKey, Options};
pub use quotes::get_quote_yahoo;
