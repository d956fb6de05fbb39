//! Search API queries

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt;

use super::http::{FetchError, HttpClient};
use super::paginator::PageSource;
use crate::config::{FilterValue, SearchConfig, SearchFilter};
use crate::credentials::Credentials;
use crate::window::WindowError;

/// Inclusive publication date range of a search run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::ReversedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| WindowError::InvalidBound(s.to_string()))
        };
        Self::new(parse(start)?, parse(end)?)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_to_{}", self.start, self.end)
    }
}

/// Build the query body for one page
pub fn build_query(
    filters: &[SearchFilter],
    date_field: &str,
    sort_field: &str,
    range: &DateRange,
    from: u64,
    size: u64,
) -> Value {
    let mut must: Vec<Value> = filters
        .iter()
        .map(|filter| match &filter.value {
            FilterValue::Terms(values) => json!({ "terms": { &filter.field: values } }),
            FilterValue::Match(value) => json!({ "match": { &filter.field: value } }),
        })
        .collect();

    must.push(json!({
        "range": {
            date_field: {
                "gte": range.start.to_string(),
                "lte": range.end.to_string(),
            }
        }
    }));

    json!({
        "query": { "bool": { "must": must } },
        "sort": [{ sort_field: "asc" }],
        "from": from,
        "size": size,
    })
}

/// One page of search results, kept verbatim alongside the counters the cursor needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    /// Total matching results reported by the API
    pub total: u64,
    /// Results contained in this page
    pub results: u64,
    pub raw: String,
}

#[derive(Deserialize)]
struct PageCounters {
    total: u64,
    results: u64,
}

impl SearchPage {
    pub fn parse(url: &str, raw: String) -> Result<Self, FetchError> {
        let counters: PageCounters =
            serde_json::from_str(&raw).map_err(|e| FetchError::MalformedBody {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            total: counters.total,
            results: counters.results,
            raw,
        })
    }
}

/// Search API client scoped to one date range
pub struct SearchClient<'a> {
    http: &'a HttpClient,
    config: &'a SearchConfig,
    credentials: Credentials,
    range: DateRange,
}

impl<'a> SearchClient<'a> {
    pub fn new(
        http: &'a HttpClient,
        config: &'a SearchConfig,
        credentials: Credentials,
        range: DateRange,
    ) -> Self {
        Self {
            http,
            config,
            credentials,
            range,
        }
    }

    pub fn query(&self, offset: u64) -> Value {
        build_query(
            &self.config.filters,
            &self.config.date_field,
            &self.config.sort_field,
            &self.range,
            offset,
            self.config.page_size,
        )
    }
}

#[async_trait]
impl<'a> PageSource for SearchClient<'a> {
    async fn fetch_page(&self, offset: u64) -> Result<SearchPage, FetchError> {
        let headers = [self.credentials.header()];
        let body = self
            .http
            .post_json(&self.config.url, &self.query(offset), &headers)
            .await?;
        SearchPage::parse(&self.config.url, body)
    }
}
