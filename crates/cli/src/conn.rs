use crate::error::CliError;
use async_trait::async_trait;
use connectors::{
    destination::TupleDestination,
    influx::{InfluxConnection, InfluxSource},
    postgres::{PgDestination, TableTarget},
};
use tokio_postgres::Config;
use tracing::{error, info};

/// Trait for "pinging" one side of the transfer
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

pub struct InfluxPinger {
    pub connection: InfluxConnection,
}

pub struct PostgresPinger {
    pub config: Config,
    pub target: TableTarget,
}

#[async_trait]
impl ConnectionPinger for InfluxPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!(url = %self.connection.url, "Pinging InfluxDB");

        let source = InfluxSource::connect(self.connection.clone())?;
        source.ping().await.map_err(|e| {
            error!(url = %self.connection.url, error = %e, "InfluxDB ping failed");
            CliError::Source(e)
        })?;

        info!(url = %self.connection.url, "InfluxDB ping succeeded");
        Ok(())
    }
}

#[async_trait]
impl ConnectionPinger for PostgresPinger {
    async fn ping(&self) -> Result<(), CliError> {
        let hosts = format!("{:?}", self.config.get_hosts());
        info!(%hosts, table = %self.target.table, "Pinging Postgres");

        let mut destination = PgDestination::connect(self.config.clone(), self.target.clone())
            .await
            .map_err(|e| {
                error!(%hosts, error = %e, "Postgres connection failed");
                CliError::Destination(e)
            })?;

        let result = destination.ping().await;
        destination.close().await?;
        result.map_err(|e| {
            error!(table = %self.target.table, error = %e, "Postgres ping query failed");
            CliError::Destination(e)
        })?;

        info!(table = %self.target.table, "Postgres ping succeeded");
        Ok(())
    }
}
