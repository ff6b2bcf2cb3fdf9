use crate::{
    destination::{TupleDestination, WriteReceipt},
    error::DestinationError,
    postgres::{
        connect::{PgConnection, connect_client},
        insert::{CHUNK_ROWS, TableTarget, render_insert},
    },
};
use async_trait::async_trait;
use model::records::tuple::DestinationTuple;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, Transaction, types::ToSql};
use tracing::{debug, info, warn};

/// Writes batches into a Postgres table, one transaction per batch.
pub struct PgDestination {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    target: TableTarget,
    full_chunk_sql: String,
}

impl PgDestination {
    pub async fn connect(config: Config, target: TableTarget) -> Result<Self, DestinationError> {
        let PgConnection { client, driver } = connect_client(config).await?;
        info!(table = %target.table, "Connected to Postgres");

        Ok(Self {
            full_chunk_sql: render_insert(&target, CHUNK_ROWS),
            client: Some(client),
            driver: Some(driver),
            target,
        })
    }

    /// Verifies the connection and that the destination table is visible.
    pub async fn ping(&self) -> Result<(), DestinationError> {
        let client = self.client.as_ref().ok_or(DestinationError::Closed)?;
        client.query_one("SELECT 1", &[]).await?;
        client
            .query(
                &format!("SELECT 1 FROM {} LIMIT 0", self.target.qualified_table()),
                &[],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TupleDestination for PgDestination {
    async fn write_batch(
        &mut self,
        tuples: &[DestinationTuple],
    ) -> Result<WriteReceipt, DestinationError> {
        if tuples.is_empty() {
            return Ok(WriteReceipt::default());
        }

        let client = self.client.as_mut().ok_or(DestinationError::Closed)?;
        let tx = client.transaction().await?;

        match insert_all(&tx, &self.target, &self.full_chunk_sql, tuples).await {
            Ok(inserted) => {
                tx.commit().await?;
                Ok(WriteReceipt {
                    inserted,
                    discarded: (tuples.len() as u64).saturating_sub(inserted),
                })
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Explicit rollback failed, the server discards the transaction");
                }
                Err(err.into())
            }
        }
    }

    async fn close(&mut self) -> Result<(), DestinationError> {
        // Dropping the client ends the connection task.
        if self.client.take().is_none() {
            return Ok(());
        }
        if let Some(driver) = self.driver.take()
            && let Err(err) = driver.await
        {
            warn!(%err, "Postgres connection task did not shut down cleanly");
        }
        debug!(table = %self.target.table, "Destination connection released");
        Ok(())
    }
}

/// Stages every tuple in chunked multi-row inserts. Returns the number of
/// rows actually inserted.
async fn insert_all(
    tx: &Transaction<'_>,
    target: &TableTarget,
    full_chunk_sql: &str,
    tuples: &[DestinationTuple],
) -> Result<u64, tokio_postgres::Error> {
    let mut inserted = 0;

    for chunk in tuples.chunks(CHUNK_ROWS) {
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(chunk.len() * 7);
        for t in chunk {
            params.extend_from_slice(&[
                &t.company,
                &t.project,
                &t.cohort,
                &t.user,
                &t.stage,
                &t.version_tag,
                &t.value,
            ]);
        }

        let affected = if chunk.len() == CHUNK_ROWS {
            tx.execute(full_chunk_sql, &params).await?
        } else {
            tx.execute(render_insert(target, chunk.len()).as_str(), &params)
                .await?
        };
        inserted += affected;
    }

    Ok(inserted)
}
