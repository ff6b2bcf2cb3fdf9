use crate::error::SettingsError;
use connectors::{
    influx::InfluxConnection,
    postgres::{TableTarget, connect::parse_config},
    source::{AggregateQuery, RangeBound},
};
use engine_core::retry::RetryPolicy;
use model::core::dimension::{DimensionKeys, MissingDimensionPolicy};
use std::{collections::HashMap, fmt::Display, str::FromStr, time::Duration};
use tokio_postgres::Config;

pub const INFLUX_URL: &str = "INFLUX_URL";
pub const INFLUX_TOKEN: &str = "INFLUX_TOKEN";
pub const INFLUX_ORG: &str = "INFLUX_ORG";
pub const INFLUX_BUCKET: &str = "INFLUX_BUCKET";
pub const INFLUX_MEASUREMENT: &str = "INFLUX_MEASUREMENT";
pub const INFLUX_FIELD: &str = "INFLUX_FIELD";
pub const INFLUX_RANGE_START: &str = "INFLUX_RANGE_START";
pub const INFLUX_RANGE_STOP: &str = "INFLUX_RANGE_STOP";
pub const INFLUX_VERSION_TAG: &str = "INFLUX_VERSION_TAG";
pub const INFLUX_TIMEOUT_SECS: &str = "INFLUX_TIMEOUT_SECS";
pub const POSTGRES_URL: &str = "POSTGRES_URL";
pub const POSTGRES_USER: &str = "POSTGRES_USER";
pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const POSTGRES_TABLE: &str = "POSTGRES_TABLE";
pub const POSTGRES_VERSION_COLUMN: &str = "POSTGRES_VERSION_COLUMN";
pub const TRANSFER_BATCH_SIZE: &str = "TRANSFER_BATCH_SIZE";
pub const TRANSFER_BATCH_RETRIES: &str = "TRANSFER_BATCH_RETRIES";
pub const TRANSFER_MISSING_DIMENSION: &str = "TRANSFER_MISSING_DIMENSION";

pub const DEFAULT_BATCH_SIZE: usize = 5000;
const DEFAULT_MEASUREMENT: &str = "events";
const DEFAULT_FIELD: &str = "value";
const DEFAULT_RANGE_START: &str = "-24h";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const YIELD_NAME: &str = "aggregated_by_dimensions";

/// Values given on the command line. They win over the environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub batch_size: Option<usize>,
    pub start: Option<String>,
    pub stop: Option<String>,
    pub retries: Option<usize>,
}

/// Everything a transfer run needs, validated before any connection opens.
///
/// `Debug` output never contains the Influx token or the Postgres password.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub influx: InfluxConnection,
    pub query: AggregateQuery,
    pub postgres: Config,
    pub target: TableTarget,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub missing_dimension: MissingDimensionPolicy,
    pub dimension_keys: DimensionKeys,
}

impl TransferSettings {
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, SettingsError> {
        Self::resolve(vars, &SettingsOverrides::default())
    }

    pub fn resolve(
        vars: &HashMap<String, String>,
        overrides: &SettingsOverrides,
    ) -> Result<Self, SettingsError> {
        let vars = Vars(vars);

        let timeout_secs = vars
            .parse::<u64>(INFLUX_TIMEOUT_SECS)?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(SettingsError::invalid(INFLUX_TIMEOUT_SECS, "must be positive"));
        }

        let influx = InfluxConnection {
            url: vars.required(INFLUX_URL)?.to_string(),
            token: vars.required(INFLUX_TOKEN)?.to_string(),
            org: vars.required(INFLUX_ORG)?.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        };

        let dimension_keys = vars
            .optional(INFLUX_VERSION_TAG)
            .map(DimensionKeys::new)
            .unwrap_or_default();

        let start = overrides
            .start
            .as_deref()
            .unwrap_or_else(|| vars.get_or(INFLUX_RANGE_START, DEFAULT_RANGE_START));
        let start = RangeBound::parse(start)
            .map_err(|e| SettingsError::invalid(INFLUX_RANGE_START, e.to_string()))?;

        let stop = match overrides.stop.as_deref().or(vars.optional(INFLUX_RANGE_STOP)) {
            Some(stop) => Some(
                RangeBound::parse(stop)
                    .map_err(|e| SettingsError::invalid(INFLUX_RANGE_STOP, e.to_string()))?,
            ),
            None => None,
        };

        let query = AggregateQuery {
            bucket: vars.required(INFLUX_BUCKET)?.to_string(),
            measurement: vars.get_or(INFLUX_MEASUREMENT, DEFAULT_MEASUREMENT).to_string(),
            field: vars.get_or(INFLUX_FIELD, DEFAULT_FIELD).to_string(),
            start,
            stop,
            group_keys: dimension_keys.group_keys(),
            yield_name: YIELD_NAME.to_string(),
        };

        let postgres = parse_config(
            vars.required(POSTGRES_URL)?,
            vars.optional(POSTGRES_USER),
            vars.optional(POSTGRES_PASSWORD),
        )
        .map_err(|e| SettingsError::invalid(POSTGRES_URL, e.to_string()))?;

        let defaults = TableTarget::default();
        let target = TableTarget::new(
            vars.get_or(POSTGRES_TABLE, &defaults.table),
            vars.get_or(POSTGRES_VERSION_COLUMN, &defaults.version_column),
        );

        let batch_size = match overrides.batch_size {
            Some(size) => size,
            None => vars
                .parse::<usize>(TRANSFER_BATCH_SIZE)?
                .unwrap_or(DEFAULT_BATCH_SIZE),
        };
        if batch_size == 0 {
            return Err(SettingsError::invalid(TRANSFER_BATCH_SIZE, "must be at least 1"));
        }

        let retries = match overrides.retries {
            Some(retries) => retries,
            None => vars.parse::<usize>(TRANSFER_BATCH_RETRIES)?.unwrap_or(0),
        };
        let retry = if retries == 0 {
            RetryPolicy::none()
        } else {
            RetryPolicy::with_retries(retries)
        };

        let missing_dimension = vars
            .parse::<MissingDimensionPolicy>(TRANSFER_MISSING_DIMENSION)?
            .unwrap_or_default();

        Ok(Self {
            influx,
            query,
            postgres,
            target,
            batch_size,
            retry,
            missing_dimension,
            dimension_keys,
        })
    }
}

struct Vars<'a>(&'a HashMap<String, String>);

impl<'a> Vars<'a> {
    /// Set and non-blank.
    fn optional(&self, name: &str) -> Option<&'a str> {
        self.0
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &'static str) -> Result<&'a str, SettingsError> {
        self.optional(name).ok_or(SettingsError::Missing(name))
    }

    fn get_or<'b>(&self, name: &str, default: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.optional(name).unwrap_or(default)
    }

    fn parse<T>(&self, name: &'static str) -> Result<Option<T>, SettingsError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|e| SettingsError::invalid(name, format!("`{raw}`: {e}")))
            })
            .transpose()
    }
}
