//! Cursor-based pagination types.
//!
//! Remote collections (validation jobs, credit daily usage) are served in
//! segments: a page of items plus an opaque cursor. When a segment is
//! truncated, the cursor fetches the next one; consuming every segment
//! yields the collection exactly once, in server order.

use chrono::NaiveDate;
use serde::Deserialize;

/// Pagination metadata attached to every segment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSegmentMeta {
    /// Opaque server-issued pagination token. Present whenever
    /// `is_truncated` is true.
    pub cursor: Option<String>,
    /// True when more segments follow this one.
    #[serde(default)]
    pub is_truncated: bool,
}

/// One page of a cursor-paginated collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSegment<T> {
    #[serde(default)]
    pub meta: ListSegmentMeta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Traversal direction of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingDirection {
    #[default]
    Forward,
    Backward,
}

impl ListingDirection {
    /// Name of the query parameter that carries the cursor for this
    /// direction.
    pub fn cursor_param(&self) -> &'static str {
        match self {
            ListingDirection::Forward => "cursor",
            ListingDirection::Backward => "cursor:prev",
        }
    }
}

/// Date predicate serialized as one or two query fragments against a named
/// field (`field=...`, `field:since=...`, `field:until=...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// Exact date match.
    On(NaiveDate),
    /// Lower bound, inclusive.
    Since(NaiveDate),
    /// Upper bound, inclusive.
    Until(NaiveDate),
    /// Closed range.
    Between { since: NaiveDate, until: NaiveDate },
}

impl DateFilter {
    /// Serialize this predicate against `field` as ISO-8601 query fragments.
    pub fn query_fragments(&self, field: &str) -> Vec<(String, String)> {
        let iso = |date: &NaiveDate| date.format("%Y-%m-%d").to_string();
        match self {
            DateFilter::On(date) => vec![(field.to_string(), iso(date))],
            DateFilter::Since(date) => vec![(format!("{field}:since"), iso(date))],
            DateFilter::Until(date) => vec![(format!("{field}:until"), iso(date))],
            DateFilter::Between { since, until } => vec![
                (format!("{field}:since"), iso(since)),
                (format!("{field}:until"), iso(until)),
            ],
        }
    }
}

/// Filters and paging options for the job listing.
#[derive(Debug, Clone, Default)]
pub struct ValidationListingOptions {
    /// Filter on the job submission date.
    pub created_on: Option<DateFilter>,
    /// Page size hint forwarded to the service.
    pub limit: Option<u32>,
    pub direction: ListingDirection,
}

impl ValidationListingOptions {
    /// Query fragments for the first (cursor-less) request.
    pub fn query_fragments(&self) -> Vec<(String, String)> {
        self.created_on.map(|filter| filter.query_fragments("createdOn")).unwrap_or_default()
    }
}

/// Filters and paging options for the credits daily-usage listing.
#[derive(Debug, Clone, Default)]
pub struct DailyUsageListingOptions {
    /// Filter on the usage date.
    pub date: Option<DateFilter>,
    pub limit: Option<u32>,
    pub direction: ListingDirection,
}

impl DailyUsageListingOptions {
    /// Query fragments for the first (cursor-less) request.
    pub fn query_fragments(&self) -> Vec<(String, String)> {
        self.date.map(|filter| filter.query_fragments("date")).unwrap_or_default()
    }
}
