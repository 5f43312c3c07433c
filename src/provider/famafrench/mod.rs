//! Datasets from Kenneth French's data library.
//!
//! Each download is a zip archive holding one whitespace-delimited text file
//! that concatenates several datasets, separated by blank lines. Datasets are
//! located structurally: the median column count identifies the data block
//! and the last shorter row above it is the header.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use crate::errors::RemoteDataError;
use crate::fetch::PageFetcher;
use crate::models::{Cell, DataTable};

const FAMAFRENCH_BASE_URL: &str = "http://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp";

fn dataset_url(name: &str) -> String {
    format!("{}/{}.zip", FAMAFRENCH_BASE_URL, name)
}

fn median(mut values: Vec<usize>) -> f64 {
    values.sort_unstable();
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2] as f64
    } else {
        (values[n / 2 - 1] + values[n / 2]) as f64 / 2.0
    }
}

/// Parse one blank-line-delimited block into a table, or None when the
/// block is too short to be a dataset (descriptive text, footnotes).
fn parse_dataset(rows: &[Vec<&str>]) -> Result<Option<DataTable>, RemoteDataError> {
    if rows.len() <= 10 {
        return Ok(None);
    }

    let counts: Vec<usize> = rows.iter().map(|r| r.len()).collect();
    let ncol = median(counts.clone());
    let header_index = counts
        .iter()
        .rposition(|&c| c as f64 == ncol - 1.0)
        .ok_or_else(|| RemoteDataError::Parse {
            message: "dataset block has no header row".to_string(),
        })?;

    // Header labels repeat across columns; an enumeration prefix keeps
    // them unique.
    let columns: Vec<String> = rows[header_index]
        .iter()
        .enumerate()
        .map(|(j, label)| format!("{} {}", j + 1, label))
        .collect();

    let mut table = DataTable::new("", columns);
    for row in &rows[header_index + 1..] {
        let index: i64 = row[0].parse().map_err(|_| RemoteDataError::Parse {
            message: format!("unparseable dataset index: {:?}", row[0]),
        })?;
        let values = row[1..]
            .iter()
            .map(|v| {
                v.parse::<f64>()
                    .map(Cell::Float)
                    .map_err(|_| RemoteDataError::Parse {
                        message: format!("unparseable dataset value: {:?}", v),
                    })
            })
            .collect::<Result<Vec<Cell>, RemoteDataError>>()?;
        table.push_row(Cell::Int(index), values);
    }
    Ok(Some(table))
}

/// Fetch and split a Fama-French archive into its datasets, keyed by their
/// position in the file. Blocks of descriptive text keep their position but
/// produce no entry.
pub fn get_data_famafrench(
    fetcher: &dyn PageFetcher,
    name: &str,
) -> Result<BTreeMap<usize, DataTable>, RemoteDataError> {
    let raw = fetcher.fetch_bytes(&dataset_url(name))?;
    let mut archive = ZipArchive::new(Cursor::new(raw))?;
    let mut text = String::new();
    archive.by_index(0)?.read_to_string(&mut text).map_err(|e| {
        RemoteDataError::Parse {
            message: format!("archive entry is not text: {}", e),
        }
    })?;

    let lines: Vec<&str> = text.lines().collect();
    let edges: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim().is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut datasets = BTreeMap::new();
    for (i, window) in edges.windows(2).enumerate() {
        let rows: Vec<Vec<&str>> = lines[window[0] + 1..window[1]]
            .iter()
            .map(|line| line.split_whitespace().collect())
            .collect();
        if let Some(table) = parse_dataset(&rows)? {
            debug!("dataset {} of {} has {} rows", i, name, table.len());
            datasets.insert(i, table);
        }
    }
    Ok(datasets)
}
