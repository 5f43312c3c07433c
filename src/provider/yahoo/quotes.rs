//! Delayed quote snapshot from the Yahoo! CSV quote endpoint.

use crate::errors::RemoteDataError;
use crate::fetch::PageFetcher;
use crate::models::{Cell, DataTable};

const QUOTE_BASE_URL: &str = "http://finance.yahoo.com/d/quotes.csv?";

/// Column name and Yahoo! field code, in request order. The symbol comes
/// first and becomes the table index.
const QUOTE_FIELDS: [(&str, &str); 6] = [
    ("symbol", "s"),
    ("last", "l1"),
    ("change_pct", "p2"),
    ("PE", "r"),
    ("time", "t1"),
    ("short_ratio", "s7"),
];

/// Type a single CSV field from the quote endpoint.
///
/// A trailing `%"` marks a quoted percentage, parsed as a plain float
/// (8.20% stays 8.2). A leading `"` marks a string literal. Anything else
/// is a float, degrading to null where the source prints N/A or garbage.
fn parse_quote_field(field: &str) -> Cell {
    if field.ends_with("%\"") {
        let stripped = field.trim_matches(|c| c == '"' || c == '%');
        return match stripped.parse::<f64>() {
            Ok(v) => Cell::Float(v),
            Err(_) => Cell::Null,
        };
    }
    if field.starts_with('"') {
        return Cell::Text(field.trim_matches('"').to_string());
    }
    match field.parse::<f64>() {
        Ok(v) => Cell::Float(v),
        Err(_) => Cell::Null,
    }
}

/// Fetch a snapshot quote table for one or more symbols.
///
/// One CSV line per symbol; the table is indexed by symbol with the
/// remaining fields as columns.
pub fn get_quote_yahoo(
    fetcher: &dyn PageFetcher,
    symbols: &[&str],
) -> Result<DataTable, RemoteDataError> {
    let sym_list = symbols.join("+");
    let codes: String = QUOTE_FIELDS.iter().map(|(_, code)| *code).collect();
    let url = format!("{}s={}&f={}", QUOTE_BASE_URL, sym_list, codes);

    let body = fetcher.fetch(&url)?;
    let columns: Vec<String> = QUOTE_FIELDS[1..]
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    let mut table = DataTable::new("symbol", columns);

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<Cell> = line.split(',').map(parse_quote_field).collect();
        if fields.len() != QUOTE_FIELDS.len() {
            return Err(RemoteDataError::Parse {
                message: format!(
                    "quote line has {} fields, expected {}: {:?}",
                    fields.len(),
                    QUOTE_FIELDS.len(),
                    line
                ),
            });
        }
        let mut fields = fields.into_iter();
        let index = fields.next().expect("field count checked above");
        table.push_row(index, fields.collect());
    }

    Ok(table)
}
