//! In-memory source and destination used by the pipeline tests.

use async_trait::async_trait;
use connectors::{
    destination::{TupleDestination, WriteReceipt},
    error::{DestinationError, SourceError},
    source::{AggregateQuery, MeasurementSource, RangeBound, RowStream},
};
use model::{
    core::{dimension::DimensionKeys, value::Value},
    records::{row::SourceRow, tuple::DestinationTuple},
};
use std::{
    collections::{HashMap, HashSet},
    ops::Range,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio_util::sync::CancellationToken;

pub fn tuple(n: usize) -> DestinationTuple {
    DestinationTuple {
        company: "acme".into(),
        project: "apollo".into(),
        cohort: "q1".into(),
        user: format!("user-{n}"),
        stage: "build".into(),
        version_tag: "17".into(),
        value: n as f64,
    }
}

pub fn tuples(range: Range<usize>) -> Vec<DestinationTuple> {
    range.map(tuple).collect()
}

/// A well-formed row whose key is unique per `n`.
pub fn source_row(n: usize, measure: Value) -> SourceRow {
    [
        ("result", Value::String("_result".into())),
        ("table", Value::Int(0)),
        ("company", Value::String("acme".into())),
        ("project", Value::String("apollo".into())),
        ("cohort", Value::String("q1".into())),
        ("user", Value::String(format!("user-{n}"))),
        ("stage", Value::String("build".into())),
        ("java", Value::String("17".into())),
        ("_value", measure),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// A row the mapper rejects: its user dimension is not text.
pub fn unreadable_row(n: usize) -> SourceRow {
    let mut row = source_row(n, Value::Float(1.0));
    if let Some(field) = row.field_values.iter_mut().find(|f| f.name == "user") {
        field.value = Some(Value::Bytes(vec![0xc3, 0x28]));
    }
    row
}

pub fn source_rows(count: usize) -> Vec<SourceRow> {
    (0..count)
        .map(|n| source_row(n, Value::Float(n as f64 + 0.5)))
        .collect()
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

pub struct MockSource {
    rows: Option<Vec<Result<SourceRow, SourceError>>>,
    fail_query: bool,
    closes: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new(rows: Vec<SourceRow>) -> Self {
        Self::with_results(rows.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<SourceRow, SourceError>>) -> Self {
        Self {
            rows: Some(results),
            fail_query: false,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail_query: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }
}

#[async_trait]
impl MeasurementSource for MockSource {
    async fn query(&mut self, _query: &AggregateQuery) -> Result<RowStream, SourceError> {
        if self.fail_query {
            return Err(SourceError::Status {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        let rows = self
            .rows
            .take()
            .ok_or_else(|| SourceError::Query("result set already consumed".into()))?;
        Ok(Box::new(rows.into_iter()))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    /// A constraint or data error; the batch is lost.
    Reject,
    /// Lock contention; worth retrying.
    Contended,
}

#[derive(Default)]
struct TableState {
    keys: HashSet<Vec<String>>,
    rows: Vec<DestinationTuple>,
    batch_sizes: Vec<usize>,
    calls: usize,
    closes: usize,
    failures: HashMap<usize, Failure>,
    lost_after: Option<usize>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

/// A table with a unique key over the six dimensions. Clones share state,
/// so a test keeps one handle while the pipeline owns another.
#[derive(Clone, Default)]
pub struct MockDestination {
    state: Arc<Mutex<TableState>>,
}

impl MockDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `call`-th write (1-based) fails and applies nothing.
    pub fn fail_call(self, call: usize, failure: Failure) -> Self {
        self.state.lock().unwrap().failures.insert(call, failure);
        self
    }

    /// Every write after the first `calls` finds the connection gone.
    pub fn lost_after(self, calls: usize) -> Self {
        self.state.lock().unwrap().lost_after = Some(calls);
        self
    }

    /// Cancels `token` while serving the `call`-th write.
    pub fn cancel_on(self, call: usize, token: CancellationToken) -> Self {
        self.state.lock().unwrap().cancel_on_call = Some((call, token));
        self
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn row_count(&self) -> usize {
        self.state.lock().unwrap().rows.len()
    }

    pub fn rows(&self) -> Vec<DestinationTuple> {
        self.state.lock().unwrap().rows.clone()
    }

    /// Sizes of the batches that committed, in commit order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }
}

#[async_trait]
impl TupleDestination for MockDestination {
    async fn write_batch(
        &mut self,
        tuples: &[DestinationTuple],
    ) -> Result<WriteReceipt, DestinationError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        let call = state.calls;

        if let Some((at, token)) = &state.cancel_on_call
            && *at == call
        {
            token.cancel();
        }
        if state.lost_after.is_some_and(|n| call > n) {
            return Err(DestinationError::Unavailable("connection reset by peer".into()));
        }
        if let Some(failure) = state.failures.remove(&call) {
            return Err(match failure {
                Failure::Reject => DestinationError::Rejected("value out of range".into()),
                Failure::Contended => DestinationError::Contended("deadlock detected".into()),
            });
        }

        let mut receipt = WriteReceipt::default();
        for tuple in tuples {
            let key = tuple.key().iter().map(|k| k.to_string()).collect();
            if state.keys.insert(key) {
                state.rows.push(tuple.clone());
                receipt.inserted += 1;
            } else {
                receipt.discarded += 1;
            }
        }
        state.batch_sizes.push(tuples.len());
        Ok(receipt)
    }

    async fn close(&mut self) -> Result<(), DestinationError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}
