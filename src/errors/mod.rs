//! Error types for the remote data crate.
//!
//! Two caller-visible kinds of failure exist:
//! - [`RemoteDataError`]: the remote side misbehaved (unreachable page, layout
//!   change, unparseable payload). Always surfaced, never silently retried
//!   outside the explicit retry loop of the historical fetchers.
//! - [`ValidationError`]: the caller's arguments are inconsistent. Surfaced
//!   before any network call is attempted.
//!
//! [`DataError`] unifies the two for operations that can produce either.

use thiserror::Error;

/// Type alias for Result using the crate-wide [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised when a remote source cannot be fetched or understood.
#[derive(Error, Debug)]
pub enum RemoteDataError {
    /// A network error occurred while talking to the provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The fetched document was empty or had no parseable root.
    #[error("Parsed URL {url} has no root element")]
    NoRootElement {
        /// The URL that produced the empty document
        url: String,
    },

    /// The page parsed but contained no tables at all.
    #[error("No tables found in page {url}")]
    NoTables {
        /// The URL of the offending page
        url: String,
    },

    /// The page has fewer tables than the fixed position we scrape.
    /// Upstream layout change until proven otherwise.
    #[error("Table location {required} invalid, {found} tables found")]
    TableLocation {
        /// Positional index the scrape requires
        required: usize,
        /// Number of tables actually present
        found: usize,
    },

    /// A cell, row or header could not be interpreted.
    #[error("Cannot retrieve table data: {message}")]
    Parse {
        /// Description of what failed to parse
        message: String,
    },

    /// The expiry-month navigation container is missing from the summary page.
    #[error("Expiry months not available")]
    ExpiryMonthsUnavailable,

    /// The retry loop ran out of attempts.
    #[error("After {retries} tries, {source_name} did not return a 200 for url {url}")]
    RetriesExhausted {
        /// Number of attempts made
        retries: usize,
        /// Human name of the source ("Yahoo!", "Google")
        source_name: String,
        /// The URL that kept failing
        url: String,
    },

    /// The series name is not known to the provider.
    #[error("Failed to get the data. Check that {series:?} is a valid FRED series")]
    UnknownSeries {
        /// The offending series name
        series: String,
    },

    /// Every requested symbol failed to download.
    #[error("No data fetched using {source_name}")]
    NoData {
        /// Human name of the source
        source_name: String,
    },

    /// The provider does not offer this operation.
    #[error("{provider} doesn't have this functionality: {operation}")]
    NotSupported {
        /// Operation that was requested
        operation: String,
        /// Provider that cannot perform it
        provider: String,
    },

    /// A zip archive could not be opened or read.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// A CSV payload could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl RemoteDataError {
    /// Whether a retry loop may swallow this error and try again.
    ///
    /// Only connectivity-class failures are recoverable; a page that parsed
    /// but looked wrong will look wrong next time too.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::NoRootElement { .. })
    }
}

/// Errors raised for inconsistent caller arguments. No network call is made.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// One of month/year was given without the other and without an expiry.
    #[error(
        "You must specify either (`year` and `month`) or `expiry` \
         or none of these options for the current month."
    )]
    InconsistentExpiryArgs,

    /// The month argument is outside 1-12.
    #[error("Invalid calendar month: {month}")]
    InvalidMonth {
        /// The offending month value
        month: u32,
    },

    /// The data source string is not one we dispatch to.
    #[error("Unknown data source: {0:?}")]
    UnknownSource(String),
}

/// Root error type for the crate.
#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Remote(#[from] RemoteDataError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_location_display_names_both_counts() {
        let error = RemoteDataError::TableLocation {
            required: 13,
            found: 4,
        };
        assert_eq!(
            format!("{}", error),
            "Table location 13 invalid, 4 tables found"
        );
    }

    #[test]
    fn test_retries_exhausted_display() {
        let error = RemoteDataError::RetriesExhausted {
            retries: 3,
            source_name: "Yahoo!".to_string(),
            url: "http://example.com/table.csv".to_string(),
        };
        let text = format!("{}", error);
        assert!(text.contains("After 3 tries"));
        assert!(text.contains("Yahoo!"));
        assert!(text.contains("http://example.com/table.csv"));
    }

    #[test]
    fn test_network_errors_are_recoverable() {
        let error = RemoteDataError::NoRootElement {
            url: "http://example.com".to_string(),
        };
        assert!(error.is_recoverable());

        let error = RemoteDataError::Parse {
            message: "bad cell".to_string(),
        };
        assert!(!error.is_recoverable());

        let error = RemoteDataError::TableLocation {
            required: 9,
            found: 0,
        };
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_data_error_is_transparent() {
        let error: DataError = ValidationError::InconsistentExpiryArgs.into();
        assert!(format!("{}", error).starts_with("You must specify"));

        let error: DataError = RemoteDataError::ExpiryMonthsUnavailable.into();
        assert_eq!(format!("{}", error), "Expiry months not available");
    }
}
