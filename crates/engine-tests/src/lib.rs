#![allow(dead_code)]

use connectors::postgres::connect::{PgConnection, connect_client, parse_config};
use std::env;
use tokio_postgres::{Client, Config};
use tracing::warn;

pub mod integration;
pub mod utils;

/// Live database used by the integration tests. Tests return early when unset.
const TEST_PG_URL: &str = "TEST_PG_URL";

fn pg_config() -> Option<Config> {
    let Some(url) = env::var(TEST_PG_URL).ok().filter(|url| !url.trim().is_empty()) else {
        warn!(var = TEST_PG_URL, "Live PostgreSQL test skipped");
        return None;
    };
    Some(parse_config(&url, None, None).expect("TEST_PG_URL must be a valid connection string"))
}

async fn pg_client(config: &Config) -> Client {
    let PgConnection { client, .. } = connect_client(config.clone())
        .await
        .expect("connect postgres");
    client
}

/// Drop & recreate `table` with the unique key over the six dimensions and a
/// check constraint that rejects negative measures.
async fn reset_table(client: &Client, table: &str, version_column: &str) {
    client
        .batch_execute(&format!(
            r#"
            DROP TABLE IF EXISTS {table};
            CREATE TABLE {table} (
                company TEXT NOT NULL,
                project TEXT NOT NULL,
                cohort TEXT NOT NULL,
                "user" TEXT NOT NULL,
                stage TEXT NOT NULL,
                {version_column} TEXT NOT NULL,
                value DOUBLE PRECISION NOT NULL CHECK (value >= 0),
                UNIQUE (company, project, cohort, "user", stage, {version_column})
            );
            "#
        ))
        .await
        .expect("reset destination table");
}

async fn row_count(client: &Client, table: &str) -> i64 {
    client
        .query_one(&format!("SELECT COUNT(*) FROM {table}"), &[])
        .await
        .expect("count rows")
        .get(0)
}
