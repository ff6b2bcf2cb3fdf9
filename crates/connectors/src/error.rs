use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Errors raised while querying or decoding the time-series source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request never produced a response (DNS, refused, timeout, TLS).
    #[error("Source request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("Source returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The query ran but the engine reported an error in the result stream.
    #[error("Source query failed: {0}")]
    Query(String),

    /// The query could not be built from the given parameters.
    #[error("Invalid source query: {0}")]
    InvalidQuery(String),

    /// The response body is not valid annotated CSV.
    #[error("Failed to decode source response: {0}")]
    Decode(#[from] csv::Error),

    #[error("Invalid source URL: {0}")]
    InvalidUrl(String),
}

/// Errors happening while establishing the destination connection.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection string: {0}")]
    InvalidUrl(String),

    #[error("Postgres connection failed: {0}")]
    Connection(#[from] tokio_postgres::Error),

    #[error("Failed to configure TLS: {0}")]
    TlsConfig(#[from] native_tls::Error),
}

/// How a destination failure affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The destination is unreachable or refused us. Fatal to the run.
    Connection,
    /// The batch failed for a reason that may not repeat (deadlock, lock timeout).
    Transient,
    /// A statement in the batch was rejected. The batch is lost, the run goes on.
    Data,
}

/// Errors raised while writing a batch to the destination.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("Destination connection error: {0}")]
    Connect(#[from] ConnectorError),

    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Destination connection is closed")]
    Closed,

    /// Batch rejected by a destination that is not Postgres (dry runs, tests).
    #[error("Batch rejected: {0}")]
    Rejected(String),

    /// Destination unreachable, reported by a destination that is not Postgres.
    #[error("Destination unavailable: {0}")]
    Unavailable(String),

    /// Batch lost to lock contention, reported by a destination that is not Postgres.
    #[error("Batch hit contention: {0}")]
    Contended(String),
}

impl DestinationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DestinationError::Connect(_) => FailureKind::Connection,
            DestinationError::Closed => FailureKind::Connection,
            DestinationError::Unavailable(_) => FailureKind::Connection,
            DestinationError::Rejected(_) => FailureKind::Data,
            DestinationError::Contended(_) => FailureKind::Transient,
            DestinationError::Postgres(err) => classify_pg_error(err),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == FailureKind::Connection
    }
}

fn classify_pg_error(err: &tokio_postgres::Error) -> FailureKind {
    if err.is_closed() {
        return FailureKind::Connection;
    }

    match err.code() {
        Some(code) if is_connection_pg_code(code) => FailureKind::Connection,
        Some(code) if is_transient_pg_code(code) => FailureKind::Transient,
        Some(_) => FailureKind::Data,
        // No SQLSTATE: either the socket failed or a parameter did not encode.
        None => {
            let io = std::error::Error::source(err)
                .is_some_and(|source| source.downcast_ref::<std::io::Error>().is_some());
            if io {
                FailureKind::Connection
            } else {
                FailureKind::Data
            }
        }
    }
}

fn is_connection_pg_code(code: &SqlState) -> bool {
    // Class 08 (connection exception) and class 28 (invalid authorization).
    let class = &code.code()[..2];
    if class == "08" || class == "28" {
        return true;
    }

    matches!(
        *code,
        SqlState::ADMIN_SHUTDOWN
            | SqlState::CRASH_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::TOO_MANY_CONNECTIONS
            | SqlState::INVALID_CATALOG_NAME
    )
}

fn is_transient_pg_code(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::T_R_SERIALIZATION_FAILURE
            | SqlState::T_R_DEADLOCK_DETECTED
            | SqlState::LOCK_NOT_AVAILABLE
            | SqlState::QUERY_CANCELED
    )
}
