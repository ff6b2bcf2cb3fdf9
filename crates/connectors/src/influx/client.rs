use crate::{
    error::SourceError,
    influx::decoder::AnnotatedCsvDecoder,
    source::{AggregateQuery, MeasurementSource, RowStream},
};
use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use serde_json::json;
use std::{fmt, io::Cursor, time::Duration};
use tracing::{debug, info};

const QUERY_PATH: &str = "/api/v2/query";
const HEALTH_PATH: &str = "/health";

/// Endpoint and credentials of an InfluxDB v2 instance.
#[derive(Clone)]
pub struct InfluxConnection {
    pub url: String,
    pub token: String,
    pub org: String,
    pub timeout: Duration,
}

impl fmt::Debug for InfluxConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxConnection")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("org", &self.org)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InfluxConnection {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

/// Runs Flux queries over the InfluxDB v2 HTTP API.
pub struct InfluxSource {
    client: Option<Client>,
    connection: InfluxConnection,
}

impl InfluxSource {
    pub fn connect(connection: InfluxConnection) -> Result<Self, SourceError> {
        if !(connection.url.starts_with("http://") || connection.url.starts_with("https://")) {
            return Err(SourceError::InvalidUrl(connection.url.clone()));
        }

        let client = Client::builder().timeout(connection.timeout).build()?;
        Ok(Self {
            client: Some(client),
            connection,
        })
    }

    fn client(&self) -> Result<&Client, SourceError> {
        self.client
            .as_ref()
            .ok_or_else(|| SourceError::Query("source connection already closed".into()))
    }

    /// Checks that the instance is up and reports itself healthy.
    pub async fn ping(&self) -> Result<(), SourceError> {
        let response = self
            .client()?
            .get(self.connection.endpoint(HEALTH_PATH))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(url = %self.connection.url, "InfluxDB is healthy");
        Ok(())
    }
}

#[async_trait]
impl MeasurementSource for InfluxSource {
    async fn query(&mut self, query: &AggregateQuery) -> Result<RowStream, SourceError> {
        let flux = query.to_flux();
        debug!(%flux, "Submitting Flux query");

        let body = json!({
            "query": flux,
            "type": "flux",
            "dialect": {
                "header": true,
                "delimiter": ",",
                "annotations": ["datatype", "group", "default"],
            },
        });

        let response = self
            .client()?
            .post(self.connection.endpoint(QUERY_PATH))
            .query(&[("org", self.connection.org.as_str())])
            .header(AUTHORIZATION, format!("Token {}", self.connection.token))
            .header(ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload = response.bytes().await?;
        info!(
            bucket = %query.bucket,
            bytes = payload.len(),
            "Source query returned"
        );

        Ok(Box::new(AnnotatedCsvDecoder::new(Cursor::new(payload))))
    }

    async fn close(&mut self) -> Result<(), SourceError> {
        if self.client.take().is_some() {
            debug!(url = %self.connection.url, "Source connection released");
        }
        Ok(())
    }
}
