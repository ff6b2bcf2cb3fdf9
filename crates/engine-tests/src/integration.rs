#[cfg(test)]
mod tests {
    use crate::{
        pg_client, pg_config, reset_table, row_count,
        utils::{VecSource, query, row, rows},
    };
    use connectors::{
        destination::TupleDestination,
        postgres::{PgDestination, TableTarget},
    };
    use engine_core::{retry::RetryPolicy, state::TransferState};
    use engine_processing::{coordinator::TransferCoordinator, mapper::RowMapper};
    use model::records::tuple::DestinationTuple;
    use tracing_test::traced_test;

    async fn transfer(
        config: &tokio_postgres::Config,
        target: &TableTarget,
        source: VecSource,
        batch_size: usize,
    ) -> engine_processing::coordinator::TransferOutcome {
        let destination = PgDestination::connect(config.clone(), target.clone())
            .await
            .expect("connect destination");
        TransferCoordinator::new(
            source,
            destination,
            query(),
            RowMapper::default(),
            batch_size,
            RetryPolicy::default(),
        )
        .run()
        .await
    }

    // Scenario: the same result set is transferred twice.
    // Expected Outcome: the second run inserts nothing and the row count is unchanged.
    #[traced_test]
    #[tokio::test]
    async fn rerun_is_idempotent() {
        let Some(config) = pg_config() else { return };
        let client = pg_client(&config).await;
        let target = TableTarget::new("bucketsync_it_rerun", "version_tag");
        reset_table(&client, &target.table, &target.version_column).await;

        let first = transfer(&config, &target, VecSource::new(rows(25)), 10).await;
        assert_eq!(first.state, TransferState::Done);
        assert_eq!(first.stats.tuples_inserted(), 25);

        let second = transfer(&config, &target, VecSource::new(rows(25)), 10).await;
        assert_eq!(second.state, TransferState::Done);
        assert_eq!(second.stats.tuples_inserted(), 0);
        assert_eq!(second.stats.tuples_discarded(), 25);

        assert_eq!(row_count(&client, &target.table).await, 25);
    }

    // Scenario: one batch carries a value that violates a check constraint.
    // Expected Outcome: that whole batch is rolled back, the others commit.
    #[traced_test]
    #[tokio::test]
    async fn rejected_batch_is_rolled_back_as_a_whole() {
        let Some(config) = pg_config() else { return };
        let client = pg_client(&config).await;
        let target = TableTarget::new("bucketsync_it_rollback", "version_tag");
        reset_table(&client, &target.table, &target.version_column).await;

        let mut source_rows = rows(9);
        source_rows[4] = row(4, -1.0);

        let outcome = transfer(&config, &target, VecSource::new(source_rows), 3).await;
        assert_eq!(outcome.state, TransferState::Done);
        assert_eq!(outcome.stats.batches_committed(), 2);
        assert_eq!(outcome.stats.batches_rolled_back(), 1);
        assert_eq!(row_count(&client, &target.table).await, 6);
        assert!(logs_contain("Batch rolled back"));
    }

    // Scenario: a single batch exceeds the rows allowed in one statement.
    // Expected Outcome: every chunk lands inside the same committed transaction.
    #[tokio::test]
    async fn large_batch_is_chunked() {
        let Some(config) = pg_config() else { return };
        let client = pg_client(&config).await;
        let target = TableTarget::new("bucketsync_it_chunks", "java");
        reset_table(&client, &target.table, &target.version_column).await;

        let tuples: Vec<DestinationTuple> = (0..2500)
            .map(|n| DestinationTuple {
                company: "acme".into(),
                project: "apollo".into(),
                cohort: "2024-q1".into(),
                user: format!("user-{n}"),
                stage: "deploy".into(),
                version_tag: "21".into(),
                value: n as f64,
            })
            .collect();

        let mut destination = PgDestination::connect(config.clone(), target.clone())
            .await
            .expect("connect destination");
        let receipt = destination.write_batch(&tuples).await.expect("write batch");
        destination.close().await.expect("close destination");

        assert_eq!(receipt.inserted, 2500);
        assert_eq!(receipt.discarded, 0);
        assert_eq!(row_count(&client, &target.table).await, 2500);
    }

    // Scenario: the destination table does not exist.
    // Expected Outcome: the batch is rolled back and nothing aborts the run.
    #[tokio::test]
    async fn missing_table_rolls_back_batches() {
        let Some(config) = pg_config() else { return };
        let client = pg_client(&config).await;
        client
            .batch_execute("DROP TABLE IF EXISTS bucketsync_it_missing")
            .await
            .expect("drop table");
        let target = TableTarget::new("bucketsync_it_missing", "version_tag");

        let outcome = transfer(&config, &target, VecSource::new(rows(4)), 2).await;
        assert_eq!(outcome.state, TransferState::Done);
        assert_eq!(outcome.stats.batches_rolled_back(), 2);
        assert_eq!(outcome.stats.tuples_committed(), 0);
    }
}
