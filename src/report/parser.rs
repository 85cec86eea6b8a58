//! Tab-separated report parsing
//!
//! Wire format, one report per body:
//!
//! ```text
//! "<name>" (YYYY-MM-DD - YYYY-MM-DD)
//! Field1\tField2\t...
//! value\tvalue\t...
//! Total rows: <N>
//! ```
//!
//! The trailer is located from the end (anything after it is discarded) and
//! its declared row count must match the number of data lines, otherwise the
//! export is considered truncated and rejected.

use chrono::NaiveDate;
use tracing::error;

use super::{ReportError, ReportMetadata, ReportResult};
use crate::{FieldValue, Record};

/// Fields coerced to integers; the platform writes `"--"` where a value is
/// not applicable, which becomes [`FieldValue::Undefined`].
const INT_FIELDS: [&str; 6] = [
    "CampaignId",
    "AdGroupId",
    "CriteriaId",
    "Impressions",
    "Clicks",
    "Cost",
];

/// Ratio/position fields coerced to floats; any dashed value becomes
/// [`FieldValue::Null`].
const FLOAT_FIELDS: [&str; 3] = [
    "AvgImpressionPosition",
    "AvgClickPosition",
    "AvgTrafficVolume",
];

/// Trailer prefix closing every export.
const TRAILER_PREFIX: &str = "Total rows:";

/// A parsed report: typed records plus name/period metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    /// Typed data rows in export order.
    pub records: Vec<Record>,
    /// Report name and covered period.
    pub metadata: ReportMetadata,
}

impl ParsedReport {
    /// Find the first record whose `field` equals `value`.
    ///
    /// The probe value must match the field's type as observed on the first
    /// record, mirroring the platform client's strict lookup.
    ///
    /// # Errors
    /// [`ReportError::FieldNotFound`] if the field is absent,
    /// [`ReportError::TypeMismatch`] if the probe type differs,
    /// [`ReportError::ValueNotFound`] if no row matches.
    pub fn find_record(&self, field: &str, value: &FieldValue) -> ReportResult<&Record> {
        let Some(first) = self.records.first() else {
            return Err(ReportError::ValueNotFound(format!(
                "report {} has no rows",
                self.metadata.report_name
            )));
        };
        let Some(observed) = first.get(field) else {
            return Err(ReportError::FieldNotFound(field.to_string()));
        };
        if std::mem::discriminant(observed) != std::mem::discriminant(value) {
            return Err(ReportError::TypeMismatch {
                field: field.to_string(),
                expected: observed.type_name(),
                actual: value.type_name().to_string(),
            });
        }
        self.records
            .iter()
            .find(|rec| rec.get(field) == Some(value))
            .ok_or_else(|| ReportError::ValueNotFound(format!("{field}={value:?}")))
    }
}

/// Stateless parser for the platform's tab-separated report exports.
pub struct TabularReportParser;

impl TabularReportParser {
    /// Parse a raw report body into typed records and metadata.
    ///
    /// # Errors
    /// [`ReportError::Parse`] on a missing trailer, malformed name/period
    /// line or unparsable declared-numeric value;
    /// [`ReportError::Integrity`] when the declared row count disagrees with
    /// the data lines present.
    pub fn parse(text: &str) -> ReportResult<ParsedReport> {
        let mut lines: Vec<&str> = text.split('\n').collect();

        // Locate the trailer from the end, discarding anything after it.
        let declared_rows = loop {
            let Some(line) = lines.pop() else {
                return Err(ReportError::Parse("missing 'Total rows' trailer".into()));
            };
            if let Some(count) = parse_trailer(line) {
                break count;
            }
        };

        if lines.len() < 2 {
            return Err(ReportError::Parse(
                "report shorter than name and header lines".into(),
            ));
        }

        let metadata = parse_title_line(lines[0])?;
        let fields: Vec<&str> = lines[1].split('\t').collect();
        let data_lines = &lines[2..];

        if data_lines.len() != declared_rows {
            error!(
                declared = declared_rows,
                present = data_lines.len(),
                report = %metadata.report_name,
                "report row count does not match its trailer"
            );
            return Err(ReportError::Integrity(format!(
                "trailer declares {declared_rows} rows, found {}",
                data_lines.len()
            )));
        }

        let mut records = Vec::with_capacity(data_lines.len());
        for line in data_lines {
            records.push(parse_row(&fields, line)?);
        }

        Ok(ParsedReport { records, metadata })
    }
}

/// Parse the `Total rows: <N>` trailer, if this line is one.
fn parse_trailer(line: &str) -> Option<usize> {
    let idx = line.find(TRAILER_PREFIX)?;
    line[idx + TRAILER_PREFIX.len()..].trim().parse().ok()
}

/// Parse the quoted-name-plus-period title line.
fn parse_title_line(line: &str) -> ReportResult<ReportMetadata> {
    // Name: first whitespace-separated token with quotes stripped.
    let report_name = line
        .replace('"', "")
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();
    if report_name.is_empty() {
        return Err(ReportError::Parse("empty report name line".into()));
    }

    let open = line
        .find('(')
        .ok_or_else(|| ReportError::Parse(format!("no period in title line: {line}")))?;
    let close = line[open..]
        .find(')')
        .map(|i| open + i)
        .ok_or_else(|| ReportError::Parse(format!("unterminated period in title line: {line}")))?;
    let period = &line[open + 1..close];

    let (begin, end) = period
        .split_once(" - ")
        .ok_or_else(|| ReportError::Parse(format!("malformed period: {period}")))?;
    let period_begin = parse_date(begin.trim())?;
    let period_end = parse_date(end.trim())?;
    if period_end < period_begin {
        return Err(ReportError::Parse(format!(
            "period ends {period_end} before it begins {period_begin}"
        )));
    }

    Ok(ReportMetadata {
        report_name,
        period_begin,
        period_end,
    })
}

fn parse_date(s: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| ReportError::Parse(format!("bad date {s}: {e}")))
}

/// Coerce one tab-separated data line against the header fields.
///
/// Extra values beyond the header are dropped and missing trailing values
/// leave their fields absent, matching the zip semantics of the platform
/// client.
fn parse_row(fields: &[&str], line: &str) -> ReportResult<Record> {
    let mut record = Record::new();
    for (field, raw) in fields.iter().zip(line.split('\t')) {
        record.insert(*field, coerce_value(field, raw)?);
    }
    Ok(record)
}

fn coerce_value(field: &str, raw: &str) -> ReportResult<FieldValue> {
    // Empty cells stay as empty text; coercion only applies to present values.
    if raw.is_empty() {
        return Ok(FieldValue::Text(String::new()));
    }
    if INT_FIELDS.contains(&field) {
        if raw == "--" {
            return Ok(FieldValue::Undefined);
        }
        return raw
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|e| ReportError::Parse(format!("{field} value {raw:?}: {e}")));
    }
    if FLOAT_FIELDS.contains(&field) {
        if raw.contains('-') {
            return Ok(FieldValue::Null);
        }
        return raw
            .parse::<f64>()
            .map(FieldValue::Float)
            .map_err(|e| ReportError::Parse(format!("{field} value {raw:?}: {e}")));
    }
    if field == "Date" {
        return parse_date(raw).map(FieldValue::Date);
    }
    Ok(FieldValue::Text(raw.to_string()))
}
