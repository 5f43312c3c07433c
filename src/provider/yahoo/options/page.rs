//! Extraction of raw tables, the underlying quote snapshot and the expiry
//! month list from a fetched options page.
//!
//! Everything here is deliberately dumb about meaning: it lifts the page's
//! markup into owned [`RawTable`]s and strings. Interpretation of cells and
//! rows lives with the chain parser. Brittle by design - the selectors and
//! class names mirror the provider's current layout.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::clock::Clock;
use crate::errors::RemoteDataError;
use crate::models::{Cell, UnderlyingSnapshot};

lazy_static! {
    static ref TABLE: Selector = Selector::parse("table").unwrap();
    static ref ROW: Selector = Selector::parse("tr").unwrap();
    static ref HEADER_CELL: Selector = Selector::parse("th").unwrap();
    static ref DATA_CELL: Selector = Selector::parse("td").unwrap();
    static ref RTQ_TICKER: Selector = Selector::parse(".time_rtq_ticker").unwrap();
    static ref RTQ: Selector = Selector::parse(".time_rtq").unwrap();
    static ref SUMMARY_TAB: Selector = Selector::parse("#yfncsumtab").unwrap();
    static ref LINK: Selector = Selector::parse("a").unwrap();
    static ref STRONG: Selector = Selector::parse("strong").unwrap();
}

/// Marker class the provider styles onto negative change cells.
const NEGATIVE_CLASS: &str = "neg_arrow";

/// One lifted cell: its text content and whether it carried the negative
/// style marker (on itself or any descendant).
#[derive(Clone, Debug, PartialEq)]
pub struct RawCell {
    pub text: String,
    pub negative: bool,
}

/// One lifted table. The first row holds the headers.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    /// Header texts from the first row.
    pub fn header(&self) -> &[RawCell] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<RawCell>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text carried directly by an element's own text nodes, excluding
/// descendants.
fn direct_text(el: ElementRef) -> String {
    el.children()
        .filter_map(|n| n.value().as_text().map(|t| t.to_string()))
        .collect::<String>()
        .trim()
        .to_string()
}

fn first_child_element(el: ElementRef) -> Option<ElementRef> {
    el.children().filter_map(ElementRef::wrap).next()
}

fn has_negative_marker(el: ElementRef) -> bool {
    std::iter::once(el)
        .chain(el.descendants().filter_map(ElementRef::wrap))
        .any(|e| {
            e.value()
                .attr("class")
                .map(|c| c.contains(NEGATIVE_CLASS))
                .unwrap_or(false)
        })
}

fn lift_cell(el: ElementRef) -> RawCell {
    RawCell {
        text: element_text(el),
        negative: has_negative_marker(el),
    }
}

/// Lift every table on the page into owned form.
pub fn extract_tables(doc: &Html) -> Vec<RawTable> {
    doc.select(&TABLE)
        .map(|table| {
            let rows = table
                .select(&ROW)
                .map(|tr| {
                    // Header rows use th, data rows td; a tr carries one kind.
                    let cells: Vec<RawCell> = tr.select(&HEADER_CELL).map(lift_cell).collect();
                    if cells.is_empty() {
                        tr.select(&DATA_CELL).map(lift_cell).collect()
                    } else {
                        cells
                    }
                })
                .collect();
            RawTable { rows }
        })
        .collect()
}

/// Interpret a lifted cell.
///
/// A cell flagged negative parses as a float and is negated (unparsable text
/// becomes null). A quoted string is taken literally. Otherwise a numeric
/// parse is attempted with `,` as the thousands separator, degrading to null
/// for "N/A", "-" and empty cells; non-numeric text stays text so typed
/// column extraction can decide what to do with it.
pub fn parse_cell(raw: &RawCell) -> Cell {
    if raw.negative {
        return match raw.text.replace(',', "").trim().parse::<f64>() {
            Ok(v) => Cell::Float(-v),
            Err(_) => Cell::Null,
        };
    }

    let text = raw.text.trim();
    if text.is_empty() || text == "N/A" || text == "-" {
        return Cell::Null;
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Cell::Text(text[1..text.len() - 1].to_string());
    }

    let cleaned = text.replace(',', "");
    if let Ok(v) = cleaned.parse::<i64>() {
        Cell::Int(v)
    } else if let Ok(v) = cleaned.parse::<f64>() {
        Cell::Float(v)
    } else {
        Cell::Text(text.to_string())
    }
}

/// Read the underlying price and quote time off the page.
///
/// Soft-failure path: when the live quote elements are missing (layout change,
/// no live quote available) the snapshot degrades to (NaN, None) instead of
/// failing the whole request. Kept deliberately - downstream assembly
/// proceeds with partial data.
pub fn extract_snapshot(doc: &Html, clock: &dyn Clock) -> UnderlyingSnapshot {
    let price = doc
        .select(&RTQ_TICKER)
        .next()
        .and_then(|el| element_text(el).replace(',', "").parse::<f64>().ok());

    let quote_time = doc.select(&RTQ).next().and_then(|el| {
        let child = first_child_element(el)?;
        let own = direct_text(child);
        if !own.is_empty() {
            // "Sep 12, 4:00pm EDT" - the source omits the year.
            parse_quote_time_with_date(&own, clock.current_year())
        } else {
            // Markets-closed variant nests the time one level deeper and
            // drops the date entirely.
            let nested = first_child_element(child)?;
            parse_quote_time_time_only(&element_text(nested), clock.today())
        }
    });

    if price.is_none() {
        debug!("options page carries no live underlying quote");
    }

    UnderlyingSnapshot {
        price: price.unwrap_or(f64::NAN),
        quote_time,
    }
}

/// Parse "Mon Day, HH:MM am/pm TZ", substituting the given year.
fn parse_quote_time_with_date(text: &str, year: i32) -> Option<NaiveDateTime> {
    let (date_part, time_part) = text.split_once(',')?;
    let time_token = time_part.split_whitespace().next()?;
    let normalized = format!(
        "{} {}, {}",
        year,
        date_part.trim(),
        time_token.to_uppercase()
    );
    NaiveDateTime::parse_from_str(&normalized, "%Y %b %d, %I:%M%p").ok()
}

/// Parse "HH:MM am/pm TZ", substituting the given date.
fn parse_quote_time_time_only(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let time_token = text.split_whitespace().next()?;
    let time = NaiveTime::parse_from_str(&time_token.to_uppercase(), "%I:%M%p").ok()?;
    Some(today.and_time(time))
}

/// Discover the available expiry months from the summary page.
///
/// Collects every options-page-with-month navigation link into a (year,
/// month) pair and prepends the page's displayed current-month label.
pub fn extract_expiry_months(doc: &Html) -> Result<Vec<NaiveDate>, RemoteDataError> {
    let container = doc
        .select(&SUMMARY_TAB)
        .next()
        .ok_or(RemoteDataError::ExpiryMonthsUnavailable)?;

    let mut months: Vec<NaiveDate> = container
        .select(&LINK)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if !href.contains("/q/op?s=") || !href.contains("&m=") {
                return None;
            }
            let token = href.rsplit('=').next()?;
            let (year, month) = token.split_once('-')?;
            NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
        })
        .collect();

    // The displayed expiry ("May 14") has no nav link of its own.
    if let Some(label) = container.select(&STRONG).next() {
        let text = element_text(label);
        if let Ok(current) = NaiveDate::parse_from_str(&format!("01 {}", text), "%d %b %y") {
            months.insert(0, current);
        }
    }

    Ok(months)
}
