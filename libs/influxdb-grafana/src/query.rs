//! InfluxDB query texts and response model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CheckError, Result};

/// Column holding the value in `SELECT value` / `SELECT last(value)` rows;
/// column 0 is the timestamp.
pub const VALUE_COLUMN: usize = 1;

/// Default look-back window of last-value checks.
pub const LAST_VALUE_WINDOW: &str = "3m";

/// Default start of recent series queries.
pub const RECENT_SERIES_SINCE: &str = "now() - 1h";

/// Query that selects the most recent value of `metric` inside `window`,
/// optionally narrowed by a `WHERE` condition on tags.
pub fn last_value_query(metric: &str, window: &str, filter: Option<&str>) -> String {
    let mut query = format!("SELECT last(value) FROM {metric} WHERE time > now() - {window}");
    if let Some(filter) = filter {
        query.push_str(" AND ");
        query.push_str(filter);
    }
    query
}

/// Query that selects every value of `metric` since `since`.
pub fn series_query(metric: &str, since: &str) -> String {
    format!("select value from {metric} where time >= {since}")
}

/// Body of a `/query` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<StatementResult>,
}

/// Result of one statement. Empty (`{}`) when nothing matched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_id: Option<u64>,
    #[serde(default)]
    pub series: Vec<Series>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl QueryResponse {
    /// Parse a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| CheckError::MalformedResponse(format!("invalid query response: {e}")))
    }

    /// First statement result, failing if the statement reported an error.
    fn first_result(&self) -> Result<Option<&StatementResult>> {
        match self.results.first() {
            Some(StatementResult {
                error: Some(error), ..
            }) => Err(CheckError::MalformedResponse(format!(
                "query failed: {error}"
            ))),
            first => Ok(first),
        }
    }

    /// Rows of `results[0].series[0]`; `None` when the result holds no series.
    pub fn first_series_rows(&self) -> Result<Option<&[Vec<Value>]>> {
        let rows = self
            .first_result()?
            .and_then(|result| result.series.first())
            .map(|series| series.values.as_slice());
        Ok(rows)
    }

    /// Value cell of the first row, `None` when there is no row.
    pub fn last_value(&self) -> Result<Option<&Value>> {
        let Some(row) = self.first_series_rows()?.and_then(|rows| rows.first()) else {
            return Ok(None);
        };
        row.get(VALUE_COLUMN).map(Some).ok_or_else(|| {
            CheckError::MalformedResponse(format!("row has no value column: {row:?}"))
        })
    }
}

/// A timestamped metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub time: DateTime<Utc>,
    pub value: Value,
}

impl SeriesPoint {
    /// Build a point from a `[time, value]` row.
    pub fn from_row(row: &[Value]) -> Result<Self> {
        let time = row
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| CheckError::MalformedResponse(format!("row has no time: {row:?}")))?;
        let time = DateTime::parse_from_rfc3339(time)
            .map_err(|e| CheckError::MalformedResponse(format!("invalid time {time:?}: {e}")))?
            .with_timezone(&Utc);
        let value = row.get(VALUE_COLUMN).cloned().unwrap_or(Value::Null);

        Ok(Self { time, value })
    }
}

/// Compare a metric value with its expectation. Numbers compare by value so
/// that `0` matches `0.0`.
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected.as_f64(), actual.as_f64()) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => expected == actual,
    }
}
