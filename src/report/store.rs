//! Date-bucketed report storage, merging and aggregation
//!
//! Parsed records are grouped into one bucket per calendar date, keyed
//! inside each bucket by campaign identifier. The store owns its records:
//! the `Date` and `CampaignId` fields are stripped on ingest and reattached
//! on read, so each record is stored exactly once.
//!
//! Successive report periods merge only when they are day-after contiguous
//! and carry the same report name, keeping the bucket sequence gap-free.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, error};

use super::parser::ParsedReport;
use super::{ReportError, ReportMetadata, ReportResult};
use crate::{FieldValue, Record};

/// Field carrying each record's calendar date.
const DATE_FIELD: &str = "Date";
/// Field carrying each record's group key.
const GROUP_FIELD: &str = "CampaignId";

/// One calendar date's records, grouped by campaign identifier in insertion
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct DateBucket {
    date: NaiveDate,
    groups: Vec<(i64, Vec<Record>)>,
}

impl DateBucket {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            groups: Vec::new(),
        }
    }

    /// The bucket's calendar date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Groups in insertion order with their records in row order.
    pub fn groups(&self) -> impl Iterator<Item = (i64, &[Record])> {
        self.groups.iter().map(|(id, recs)| (*id, recs.as_slice()))
    }

    fn push(&mut self, group: i64, record: Record) {
        match self.groups.iter_mut().find(|(id, _)| *id == group) {
            Some((_, records)) => records.push(record),
            None => self.groups.push((group, vec![record])),
        }
    }
}

/// One distinct identifier tuple in the on-demand index.
///
/// `Undefined` identifiers index as `None`; the criteria text is stored with
/// its negative-keyword annotation stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Campaign (group) identifier.
    pub campaign_id: i64,
    /// Ad-group identifier, when defined.
    pub adgroup_id: Option<i64>,
    /// Ad-group display name.
    pub adgroup_name: String,
    /// Targeting-criteria identifier, when defined.
    pub criteria_id: Option<i64>,
    /// Normalized criteria text.
    pub criteria: String,
}

/// Identifier filter accepting an integer or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyFilter {
    /// Already-typed identifier.
    Id(i64),
    /// Identifier as text, coerced when the query resolves.
    Text(String),
}

impl KeyFilter {
    fn resolve(&self, field: &'static str) -> ReportResult<i64> {
        match self {
            KeyFilter::Id(v) => Ok(*v),
            KeyFilter::Text(s) => s.trim().parse().map_err(|_| ReportError::TypeMismatch {
                field: field.to_string(),
                expected: "int",
                actual: format!("text {s:?}"),
            }),
        }
    }
}

impl From<i64> for KeyFilter {
    fn from(v: i64) -> Self {
        KeyFilter::Id(v)
    }
}

impl From<&str> for KeyFilter {
    fn from(s: &str) -> Self {
        KeyFilter::Text(s.to_string())
    }
}

/// Parameters of a range/key aggregation.
///
/// Unset dates default to the store's bounds; an unset or zero identifier
/// filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateQuery {
    /// First date summed (inclusive).
    pub from_date: Option<NaiveDate>,
    /// Last date summed (inclusive).
    pub to_date: Option<NaiveDate>,
    /// Campaign filter.
    pub campaign_id: Option<KeyFilter>,
    /// Ad-group filter.
    pub adgroup_id: Option<KeyFilter>,
    /// Criteria filter.
    pub criteria_id: Option<KeyFilter>,
}

impl AggregateQuery {
    /// Sum everything the store holds.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict the range start.
    pub fn from(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    /// Restrict the range end.
    pub fn to(mut self, date: NaiveDate) -> Self {
        self.to_date = Some(date);
        self
    }

    /// Filter by campaign.
    pub fn campaign(mut self, filter: impl Into<KeyFilter>) -> Self {
        self.campaign_id = Some(filter.into());
        self
    }

    /// Filter by ad group.
    pub fn adgroup(mut self, filter: impl Into<KeyFilter>) -> Self {
        self.adgroup_id = Some(filter.into());
        self
    }

    /// Filter by criteria.
    pub fn criteria(mut self, filter: impl Into<KeyFilter>) -> Self {
        self.criteria_id = Some(filter.into());
        self
    }
}

/// Aggregation sums together with the resolved range and filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// First date summed (inclusive).
    pub from_date: NaiveDate,
    /// Last date summed (inclusive).
    pub to_date: NaiveDate,
    /// Resolved campaign filter (0 = all).
    pub campaign_id: i64,
    /// Resolved ad-group filter (0 = all).
    pub adgroup_id: i64,
    /// Resolved criteria filter (0 = all).
    pub criteria_id: i64,
    /// Summed impressions.
    pub impressions: i64,
    /// Summed clicks.
    pub clicks: i64,
    /// Summed cost.
    pub cost: i64,
}

/// Ordered date-bucketed report store with merge, index and aggregation
/// support.
///
/// Not thread-safe; a caller sharing a store across concurrent mutators must
/// synchronize externally.
#[derive(Debug, Clone, PartialEq)]
pub struct DateIndexedReportStore {
    buckets: Vec<DateBucket>,
    index: HashSet<IndexEntry>,
    metadata: ReportMetadata,
}

impl DateIndexedReportStore {
    /// Build a store from a parsed report.
    pub fn from_report(report: ParsedReport) -> ReportResult<Self> {
        let mut store = Self {
            buckets: Vec::new(),
            index: HashSet::new(),
            metadata: report.metadata,
        };
        store.ingest(report.records)?;
        Ok(store)
    }

    /// Report name and period covered.
    pub fn metadata(&self) -> &ReportMetadata {
        &self.metadata
    }

    /// Number of distinct dates stored.
    pub fn num_dates(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the store holds any buckets.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// The bucket for one calendar date, if present.
    pub fn get_by_date(&self, date: NaiveDate) -> Option<&DateBucket> {
        self.buckets
            .binary_search_by_key(&date, DateBucket::date)
            .ok()
            .map(|i| &self.buckets[i])
    }

    /// The identifier index built by [`Self::build_index`].
    pub fn index(&self) -> &HashSet<IndexEntry> {
        &self.index
    }

    /// Sort records by date and fold them into the bucket sequence.
    ///
    /// The sort is stable, so rows sharing a date and group keep their
    /// original order. Each record's `Date` and `CampaignId` fields move
    /// into the bucket structure. Empty input is a no-op.
    ///
    /// # Errors
    /// [`ReportError::FieldNotFound`] when a record lacks either field,
    /// [`ReportError::TypeMismatch`] when they carry unexpected types.
    pub fn ingest(&mut self, records: Vec<Record>) -> ReportResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut keyed = Vec::with_capacity(records.len());
        for mut record in records {
            let date = take_date(&mut record)?;
            let group = take_group(&mut record)?;
            keyed.push((date, group, record));
        }
        keyed.sort_by_key(|(date, _, _)| *date);

        for (date, group, record) in keyed {
            let bucket = match self
                .buckets
                .binary_search_by_key(&date, DateBucket::date)
            {
                Ok(i) => &mut self.buckets[i],
                Err(i) => {
                    self.buckets.insert(i, DateBucket::new(date));
                    &mut self.buckets[i]
                }
            };
            bucket.push(group, record);
        }

        debug!(buckets = self.buckets.len(), "records ingested");
        Ok(())
    }

    /// Lazily iterate all records in date order, reattaching the `Date` and
    /// `CampaignId` fields. Restartable: each call yields a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.buckets.iter().flat_map(|bucket| {
            bucket.groups.iter().flat_map(move |(group, records)| {
                records.iter().map(move |record| {
                    let mut out = record.clone();
                    out.insert(DATE_FIELD, FieldValue::Date(bucket.date));
                    out.insert(GROUP_FIELD, FieldValue::Int(*group));
                    out
                })
            })
        })
    }

    /// Rebuild the distinct identifier index across every bucket.
    ///
    /// Idempotent; any previous index is replaced. Criteria text is
    /// normalized by stripping the trailing negative-keyword annotation
    /// (everything from the leftmost whitespace-then-dash onward).
    ///
    /// # Errors
    /// [`ReportError::FieldNotFound`] / [`ReportError::TypeMismatch`] when a
    /// record lacks the indexed fields or carries unexpected types.
    pub fn build_index(&mut self) -> ReportResult<()> {
        let mut index = HashSet::new();
        for bucket in &self.buckets {
            for (campaign_id, records) in &bucket.groups {
                for record in records {
                    index.insert(IndexEntry {
                        campaign_id: *campaign_id,
                        adgroup_id: optional_id(record, "AdGroupId")?,
                        adgroup_name: required_text(record, "AdGroupName")?,
                        criteria_id: optional_id(record, "CriteriaId")?,
                        criteria: normalize_criteria(&required_text(record, "Criteria")?),
                    });
                }
            }
        }
        debug!(entries = index.len(), "identifier index rebuilt");
        self.index = index;
        Ok(())
    }

    /// Move the period start to `date`, discarding every bucket strictly
    /// before it. Irreversible.
    pub fn set_begin_date(&mut self, date: NaiveDate) {
        self.metadata.period_begin = date;
        self.buckets.retain(|bucket| bucket.date >= date);
    }

    /// Merge the next report period into this store.
    ///
    /// The merged report must carry the same name and begin exactly one day
    /// after the stored period ends; on success the period extends and the
    /// records are ingested.
    ///
    /// # Errors
    /// [`ReportError::Integrity`] on a name mismatch,
    /// [`ReportError::Period`] when the periods are not day-after
    /// contiguous.
    pub fn merge(&mut self, other: ParsedReport) -> ReportResult<()> {
        if other.metadata.report_name != self.metadata.report_name {
            error!(
                store = %self.metadata.report_name,
                merged = %other.metadata.report_name,
                "refusing to merge a different report"
            );
            return Err(ReportError::Integrity(format!(
                "cannot merge report {} into {}",
                other.metadata.report_name, self.metadata.report_name
            )));
        }

        let expected_begin = self
            .metadata
            .period_end
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ReportError::Integrity("period end overflows the calendar".into()))?;
        if other.metadata.period_begin != expected_begin {
            error!(
                store_end = %self.metadata.period_end,
                merge_begin = %other.metadata.period_begin,
                "merged report period is not contiguous"
            );
            return Err(ReportError::Period {
                store_end: self.metadata.period_end,
                merge_begin: other.metadata.period_begin,
            });
        }

        self.ingest(other.records)?;
        self.metadata.period_end = other.metadata.period_end;
        Ok(())
    }

    /// Sum impressions, clicks and cost over a date range and identifier
    /// filters.
    ///
    /// Unset dates default to the stored minimum/maximum; a resolved filter
    /// value of 0 matches everything. Filtered fields are only read when
    /// their filter is active, so partial reports aggregate cleanly as long
    /// as the stat fields are present.
    ///
    /// # Errors
    /// [`ReportError::ValueNotFound`] when bounds are defaulted on an empty
    /// store, [`ReportError::TypeMismatch`] on a non-coercible filter or a
    /// non-integer stat field, [`ReportError::FieldNotFound`] when a summed
    /// or actively-filtered field is absent.
    pub fn aggregate(&self, query: AggregateQuery) -> ReportResult<AggregateResult> {
        let from_date = match query.from_date {
            Some(d) => d,
            None => self.first_date()?,
        };
        let to_date = match query.to_date {
            Some(d) => d,
            None => self.last_date()?,
        };
        let campaign_id = resolve_filter(&query.campaign_id, "CampaignId")?;
        let adgroup_id = resolve_filter(&query.adgroup_id, "AdGroupId")?;
        let criteria_id = resolve_filter(&query.criteria_id, "CriteriaId")?;

        let mut result = AggregateResult {
            from_date,
            to_date,
            campaign_id,
            adgroup_id,
            criteria_id,
            impressions: 0,
            clicks: 0,
            cost: 0,
        };

        for bucket in &self.buckets {
            if bucket.date < from_date || bucket.date > to_date {
                continue;
            }
            for (group, records) in &bucket.groups {
                if campaign_id != 0 && campaign_id != *group {
                    continue;
                }
                for record in records {
                    if !matches_filter(record, "AdGroupId", adgroup_id)?
                        || !matches_filter(record, "CriteriaId", criteria_id)?
                    {
                        continue;
                    }
                    result.impressions += required_int(record, "Impressions")?;
                    result.clicks += required_int(record, "Clicks")?;
                    result.cost += required_int(record, "Cost")?;
                }
            }
        }

        Ok(result)
    }

    fn first_date(&self) -> ReportResult<NaiveDate> {
        self.buckets
            .first()
            .map(DateBucket::date)
            .ok_or_else(|| ReportError::ValueNotFound("store holds no dates".into()))
    }

    fn last_date(&self) -> ReportResult<NaiveDate> {
        self.buckets
            .last()
            .map(DateBucket::date)
            .ok_or_else(|| ReportError::ValueNotFound("store holds no dates".into()))
    }
}

fn take_date(record: &mut Record) -> ReportResult<NaiveDate> {
    match record.remove(DATE_FIELD) {
        Some(FieldValue::Date(d)) => Ok(d),
        Some(other) => Err(ReportError::TypeMismatch {
            field: DATE_FIELD.to_string(),
            expected: "date",
            actual: other.type_name().to_string(),
        }),
        None => Err(ReportError::FieldNotFound(DATE_FIELD.to_string())),
    }
}

fn take_group(record: &mut Record) -> ReportResult<i64> {
    match record.remove(GROUP_FIELD) {
        Some(FieldValue::Int(id)) => Ok(id),
        Some(other) => Err(ReportError::TypeMismatch {
            field: GROUP_FIELD.to_string(),
            expected: "int",
            actual: other.type_name().to_string(),
        }),
        None => Err(ReportError::FieldNotFound(GROUP_FIELD.to_string())),
    }
}

fn resolve_filter(filter: &Option<KeyFilter>, field: &'static str) -> ReportResult<i64> {
    match filter {
        Some(f) => f.resolve(field),
        None => Ok(0),
    }
}

/// A zero filter matches every record; a non-zero filter matches an equal
/// integer field and nothing else (`Undefined` never matches).
fn matches_filter(record: &Record, field: &str, filter: i64) -> ReportResult<bool> {
    if filter == 0 {
        return Ok(true);
    }
    match record.get(field) {
        Some(value) => Ok(value.as_int() == Some(filter)),
        None => Err(ReportError::FieldNotFound(field.to_string())),
    }
}

fn required_int(record: &Record, field: &str) -> ReportResult<i64> {
    match record.get(field) {
        Some(FieldValue::Int(v)) => Ok(*v),
        Some(other) => Err(ReportError::TypeMismatch {
            field: field.to_string(),
            expected: "int",
            actual: other.type_name().to_string(),
        }),
        None => Err(ReportError::FieldNotFound(field.to_string())),
    }
}

fn optional_id(record: &Record, field: &str) -> ReportResult<Option<i64>> {
    match record.get(field) {
        Some(FieldValue::Int(v)) => Ok(Some(*v)),
        Some(FieldValue::Undefined) => Ok(None),
        Some(other) => Err(ReportError::TypeMismatch {
            field: field.to_string(),
            expected: "int",
            actual: other.type_name().to_string(),
        }),
        None => Err(ReportError::FieldNotFound(field.to_string())),
    }
}

fn required_text(record: &Record, field: &str) -> ReportResult<String> {
    match record.get(field) {
        Some(FieldValue::Text(s)) => Ok(s.clone()),
        Some(other) => Err(ReportError::TypeMismatch {
            field: field.to_string(),
            expected: "text",
            actual: other.type_name().to_string(),
        }),
        None => Err(ReportError::FieldNotFound(field.to_string())),
    }
}

/// Strip the negative-keyword annotation: everything from the leftmost
/// whitespace immediately followed by a dash, to the end of the text.
fn normalize_criteria(text: &str) -> String {
    let bytes = text.char_indices().collect::<Vec<_>>();
    for window in bytes.windows(2) {
        let ((i, a), (_, b)) = (window[0], window[1]);
        if a.is_whitespace() && b == '-' {
            return text[..i].to_string();
        }
    }
    text.to_string()
}
