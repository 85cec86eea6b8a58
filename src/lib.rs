//! # Advertising Report Client Library
//!
//! A resilient client framework for a paginated, rate-limited, eventually
//! consistent advertising-platform API, plus a date-indexed store for the
//! platform's tabular report exports.
//!
//! ## Features
//!
//! - **Bounded Retry**: Exponential backoff around a single API call, with
//!   transient-failure classification and clamped policy parameters
//! - **Pagination**: Offset-driven page accumulation with a safety cap
//! - **Chunking**: Bounded-size identifier batches with shape-aware merging
//!   of per-chunk results (lists, key maps, mutation responses)
//! - **Result Caching**: Disk-backed memoization keyed by client prefix and
//!   date, tolerant of missing or corrupt entries
//! - **Report Store**: Tab-separated report parsing with integrity checks,
//!   date-bucketed storage, contiguous-period merging and range aggregation
//!
//! ## Quick Start
//!
//! ```
//! use ad_report_client::report::parser::TabularReportParser;
//! use ad_report_client::report::store::DateIndexedReportStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let text = "\"Campaigns\" (2024-01-01 - 2024-01-02)\n\
//!             Date\tCampaignId\tImpressions\n\
//!             2024-01-01\t1\t10\n\
//!             2024-01-02\t1\t20\n\
//!             Total rows: 2";
//!
//! let parsed = TabularReportParser::parse(text)?;
//! let store = DateIndexedReportStore::from_report(parsed)?;
//! assert_eq!(store.iter().count(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Architecture
//!
//! The library is organized around two module trees plus configuration:
//!
//! - [`client`] - Composable call layers: retry, pagination, chunking, caching
//! - [`report`] - Report parsing and the date-indexed query surface
//! - [`config`] - Explicit client configuration (no global state)
//!
//! Layers compose outer-to-inner around one "perform one API call" primitive:
//! cache → chunker → paginator → retrier → call. Each layer takes and returns
//! the same async call signature, so any subset can be stacked.

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Composable API-call layers (retry, pagination, chunking, caching)
pub mod client;

/// Client configuration
pub mod config;

/// Report parsing and date-indexed storage
pub mod report;

pub use client::{ApiClient, ClientError};
pub use config::ClientConfig;
pub use report::ReportError;

/// A single typed field value inside a report record.
///
/// Integer fields carry the platform's `"--"` placeholder as an explicit
/// [`FieldValue::Undefined`] variant; ratio fields containing a dash come
/// through as [`FieldValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Integer value (identifiers and counters)
    Int(i64),
    /// Floating-point value (average positions, traffic volume)
    Float(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Unparsed text value
    Text(String),
    /// The `"--"` placeholder in an otherwise integer-typed field
    Undefined,
    /// A dashed ratio field with no usable value
    Null,
}

impl FieldValue {
    /// Return the integer payload, if this value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Return the float payload, if this value is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Return the date payload, if this value is a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Return the text payload, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Discriminant name, used in type-mismatch diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Date(_) => "date",
            FieldValue::Text(_) => "text",
            FieldValue::Undefined => "undefined",
            FieldValue::Null => "null",
        }
    }
}

/// One parsed report row: a mapping from field name to typed value,
/// preserving field insertion order (the export's column order).
///
/// Records are produced by the parser and owned by the store; once stored
/// they are never mutated (the store strips the `Date` and group-key fields
/// on ingest and reattaches them on read).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record(IndexMap<String, FieldValue>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Insert a field value, replacing any previous value for the field.
    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.0.insert(field.into(), value);
    }

    /// Look up a field value.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Remove a field, returning its value. Remaining fields keep their
    /// relative order.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.shift_remove(field)
    }

    /// Whether the record carries the given field.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(field, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
