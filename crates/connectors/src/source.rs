use crate::error::SourceError;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use model::records::row::SourceRow;
use serde::Serialize;
use std::fmt;

/// Rows of one query result, in the order the source produced them.
pub type RowStream = Box<dyn Iterator<Item = Result<SourceRow, SourceError>> + Send>;

/// A time-series engine able to answer a grouped aggregation query.
#[async_trait]
pub trait MeasurementSource: Send {
    /// Runs the query once and hands back its result rows.
    async fn query(&mut self, query: &AggregateQuery) -> Result<RowStream, SourceError>;

    /// Releases the underlying connection. Called once, on every exit path.
    async fn close(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

/// One end of the query time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RangeBound {
    /// Duration relative to now, e.g. `-24h` or `-1d12h`.
    Relative(String),
    Absolute(DateTime<Utc>),
    Now,
}

const DURATION_UNITS: [&str; 11] = ["ns", "us", "µs", "ms", "mo", "s", "m", "h", "d", "w", "y"];

impl RangeBound {
    pub fn parse(input: &str) -> Result<Self, SourceError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(SourceError::InvalidQuery("empty range bound".into()));
        }
        if input == "now()" || input.eq_ignore_ascii_case("now") {
            return Ok(RangeBound::Now);
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
            return Ok(RangeBound::Absolute(ts.with_timezone(&Utc)));
        }
        if is_duration_literal(input) {
            return Ok(RangeBound::Relative(input.to_string()));
        }

        Err(SourceError::InvalidQuery(format!(
            "range bound '{input}' is neither a duration nor an RFC 3339 timestamp"
        )))
    }

    fn to_flux(&self) -> String {
        match self {
            RangeBound::Relative(duration) => duration.clone(),
            RangeBound::Absolute(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            RangeBound::Now => "now()".to_string(),
        }
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_flux())
    }
}

/// `-?(<digits><unit>)+`, the Flux duration literal grammar.
fn is_duration_literal(input: &str) -> bool {
    let mut rest = input.strip_prefix('-').unwrap_or(input);
    if rest.is_empty() {
        return false;
    }

    while !rest.is_empty() {
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];

        match DURATION_UNITS.iter().find(|unit| rest.starts_with(*unit)) {
            Some(unit) => rest = &rest[unit.len()..],
            None => return false,
        }
    }
    true
}

/// Grouped `sum()` over one measurement field within a time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateQuery {
    pub bucket: String,
    pub measurement: String,
    pub field: String,
    pub start: RangeBound,
    pub stop: Option<RangeBound>,
    pub group_keys: Vec<String>,
    pub yield_name: String,
}

impl AggregateQuery {
    /// Renders the query as a Flux script.
    pub fn to_flux(&self) -> String {
        let range = match &self.stop {
            Some(stop) => format!("start: {}, stop: {}", self.start, stop),
            None => format!("start: {}", self.start),
        };
        let columns = self
            .group_keys
            .iter()
            .map(|key| flux_string(key))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "from(bucket: {bucket})\n  |> range({range})\n  |> filter(fn: (r) => r._measurement == {measurement})\n  |> filter(fn: (r) => r._field == {field})\n  |> group(columns: [{columns}])\n  |> sum()\n  |> yield(name: {yield_name})",
            bucket = flux_string(&self.bucket),
            measurement = flux_string(&self.measurement),
            field = flux_string(&self.field),
            yield_name = flux_string(&self.yield_name),
        )
    }
}

/// Quotes `value` as a Flux string literal.
fn flux_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            // Only `${` opens an interpolation.
            '$' if chars.peek() == Some(&'{') => quoted.push_str("\\$"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}
