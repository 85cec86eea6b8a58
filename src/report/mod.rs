//! Report parsing and date-indexed storage
//!
//! The platform exports statistics as tab-separated text with a quoted name
//! line, a header line, data rows and a `Total rows: N` trailer.
//! [`parser::TabularReportParser`] turns that text into typed records;
//! [`store::DateIndexedReportStore`] owns the query and aggregation surface.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod parser;
pub mod store;

pub use parser::{ParsedReport, TabularReportParser};
pub use store::{
    AggregateQuery, AggregateResult, DateBucket, DateIndexedReportStore, IndexEntry, KeyFilter,
};

/// Report-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Declared row count or report identity does not match the data
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Merged report periods are not day-after contiguous
    #[error("period error: store ends {store_end}, merged report begins {merge_begin}")]
    Period {
        /// Last date covered by the store.
        store_end: NaiveDate,
        /// First date of the report being merged.
        merge_begin: NaiveDate,
    },

    /// Malformed report header, period or row
    #[error("parse error: {0}")]
    Parse(String),

    /// A field or filter value had an unexpected type
    #[error("type mismatch for {field}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Field or filter name.
        field: String,
        /// Expected type name.
        expected: &'static str,
        /// Observed type name.
        actual: String,
    },

    /// A referenced field is absent from the report
    #[error("field not found: {0}")]
    FieldNotFound(String),

    /// No value satisfied the lookup
    #[error("value not found: {0}")]
    ValueNotFound(String),
}

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Name and covered period of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Report name from the export header.
    pub report_name: String,
    /// First date covered (inclusive).
    pub period_begin: NaiveDate,
    /// Last date covered (inclusive).
    pub period_end: NaiveDate,
}

impl std::fmt::Display for ReportMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "report {} covering {} - {}",
            self.report_name, self.period_begin, self.period_end
        )
    }
}
