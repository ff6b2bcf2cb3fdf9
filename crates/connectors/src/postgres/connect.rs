use crate::error::ConnectorError;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls, config::SslMode};
use tracing::{error, warn};

/// A client together with the task driving its connection. The task ends
/// once the client is dropped.
pub struct PgConnection {
    pub client: Client,
    pub driver: JoinHandle<()>,
}

/// Parses a connection string. Accepts `postgres://` URLs, key/value strings
/// and JDBC-style `jdbc:postgresql://` URLs. Explicit credentials override
/// the ones embedded in the string.
pub fn parse_config(
    url: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<Config, ConnectorError> {
    let url = url.trim();
    let url = url.strip_prefix("jdbc:").unwrap_or(url);

    let mut config = url
        .parse::<Config>()
        .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;

    if let Some(user) = user {
        config.user(user);
    }
    if let Some(password) = password {
        config.password(password);
    }
    Ok(config)
}

pub async fn connect_client(config: Config) -> Result<PgConnection, ConnectorError> {
    match config.get_ssl_mode() {
        SslMode::Disable => connect_without_tls(config).await,
        SslMode::Prefer => match connect_with_tls(config.clone()).await {
            Ok(connection) => Ok(connection),
            Err(error) => {
                warn!(%error, "Postgres TLS handshake failed, retrying without TLS");
                connect_without_tls(config).await
            }
        },
        _ => connect_with_tls(config).await,
    }
}

async fn connect_with_tls(config: Config) -> Result<PgConnection, ConnectorError> {
    let connector = TlsConnector::builder().build()?;
    let tls = MakeTlsConnector::new(connector);
    let (client, connection) = config.connect(tls).await?;
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(PgConnection { client, driver })
}

async fn connect_without_tls(config: Config) -> Result<PgConnection, ConnectorError> {
    let (client, connection) = config.connect(NoTls).await?;
    let driver = tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(PgConnection { client, driver })
}
