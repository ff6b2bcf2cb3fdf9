use async_trait::async_trait;
use connectors::{
    error::SourceError,
    source::{AggregateQuery, MeasurementSource, RangeBound, RowStream},
};
use model::{
    core::{dimension::DimensionKeys, value::Value},
    records::row::SourceRow,
};

/// Serves a fixed result set, standing in for InfluxDB.
pub struct VecSource {
    rows: Option<Vec<SourceRow>>,
}

impl VecSource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self { rows: Some(rows) }
    }
}

#[async_trait]
impl MeasurementSource for VecSource {
    async fn query(&mut self, _query: &AggregateQuery) -> Result<RowStream, SourceError> {
        let rows = self
            .rows
            .take()
            .ok_or_else(|| SourceError::Query("result set already consumed".into()))?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

/// A grouped row keyed by `user-{n}` with the given measure.
pub fn row(n: usize, measure: f64) -> SourceRow {
    [
        ("company", Value::String("acme".into())),
        ("project", Value::String("apollo".into())),
        ("cohort", Value::String("2024-q1".into())),
        ("user", Value::String(format!("user-{n}"))),
        ("stage", Value::String("deploy".into())),
        ("java", Value::String("21".into())),
        ("_value", Value::Float(measure)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn rows(count: usize) -> Vec<SourceRow> {
    (0..count).map(|n| row(n, n as f64)).collect()
}

pub fn query() -> AggregateQuery {
    AggregateQuery {
        bucket: "metrics".into(),
        measurement: "events".into(),
        field: "value".into(),
        start: RangeBound::Relative("-24h".into()),
        stop: None,
        group_keys: DimensionKeys::default().group_keys(),
        yield_name: "aggregated_by_dimensions".into(),
    }
}
