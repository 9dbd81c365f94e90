//! Query-related data models.
//!
//! This module defines types for read requests and their tabular results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Row bound applied when a caller does not ask for an unbounded read.
pub const DEFAULT_ROW_LIMIT: u32 = 1000;

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// A parameter value for parameterized queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryParam {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    String(String),
}

/// Row filter applied to a dataset read. Several filters narrow the rows together.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordFilter {
    /// Only rows where the boolean column is true
    IsTrue(String),
    /// Rows where the column equals the bound value
    Equals(String, String),
    /// Rows whose column value is one of the bound values
    In(String, Vec<String>),
    /// Rows whose column value is one of the listed integers
    InIntegers(String, Vec<i64>),
    /// Rows strictly between the bounds; a missing bound is open
    Range {
        column: String,
        above: Option<f64>,
        below: Option<f64>,
    },
    /// Rows dated strictly between the bounds; a missing bound is open
    DateRange {
        column: String,
        after: Option<NaiveDate>,
        before: Option<NaiveDate>,
    },
}

impl RecordFilter {
    /// Column the filter tests.
    pub fn column(&self) -> &str {
        match self {
            Self::IsTrue(column)
            | Self::Equals(column, _)
            | Self::In(column, _)
            | Self::InIntegers(column, _)
            | Self::Range { column, .. }
            | Self::DateRange { column, .. } => column,
        }
    }
}

/// Request to read columns from a dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectRequest {
    /// Empty selects every column
    pub columns: Vec<String>,
    pub filters: Vec<RecordFilter>,
    /// `None` reads every matching row
    pub limit: Option<u32>,
}

impl SelectRequest {
    /// Read the given columns with the default row bound.
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            filters: Vec::new(),
            limit: Some(DEFAULT_ROW_LIMIT),
        }
    }

    /// Read every column of every row.
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = RecordFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in output order
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    pub row_count: usize,
    /// True when the row bound was hit and more rows may exist
    pub limit_reached: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<serde_json::Map<String, JsonValue>>,
        limit: Option<u32>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            limit_reached: limit.is_some_and(|l| l > 0 && row_count >= l as usize),
            execution_time_ms,
        }
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column in row order.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a JsonValue> {
        self.rows
            .iter()
            .map(move |row| row.get(column).unwrap_or(&JsonValue::Null))
    }
}
