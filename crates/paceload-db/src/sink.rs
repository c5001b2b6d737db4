use crate::{classify_error, Error, Result, UpsertStatement};
use async_trait::async_trait;
use paceload_core::{Record, RecordSink, Row, WriteOutcome};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresSinkConfig {
    pub database_url: String,
    /// Target table, optionally schema-qualified.
    pub table: String,
    pub key_column: String,
    pub acquire_timeout: Duration,
    /// Upper bound on one upsert. Expiry counts as a transient failure.
    pub statement_timeout: Duration,
}

impl PostgresSinkConfig {
    pub fn new(
        database_url: impl Into<String>,
        table: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            table: table.into(),
            key_column: key_column.into(),
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }
}

/// Upserts rows into an existing Postgres table keyed by the natural key.
pub struct PostgresSink {
    config: PostgresSinkConfig,
    pool: Option<Pool<Postgres>>,
    /// Upsert SQL per distinct column layout.
    statements: HashMap<Vec<String>, UpsertStatement>,
}

impl PostgresSink {
    pub fn new(config: PostgresSinkConfig) -> Self {
        Self {
            config,
            pool: None,
            statements: HashMap::new(),
        }
    }

    /// Connect a single-connection pool and check the table is reachable.
    pub async fn connect(&mut self) -> Result<()> {
        // The writer never has more than one statement in flight.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.config.acquire_timeout)
            .connect(&self.config.database_url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let probe = format!(
            "SELECT 1 FROM {} LIMIT 0",
            crate::statement::quote_table(&self.config.table)?
        );
        sqlx::query(&probe).execute(&pool).await?;

        tracing::info!(
            "Connected to Postgres, writing to {} keyed by {}",
            self.config.table,
            self.config.key_column
        );

        self.pool = Some(pool);
        Ok(())
    }

    fn statement_for(&mut self, row: &Row) -> Result<&UpsertStatement> {
        let columns: Vec<String> = row.column_names().map(str::to_string).collect();

        if !self.statements.contains_key(&columns) {
            let stmt = UpsertStatement::build(
                &self.config.table,
                &self.config.key_column,
                columns.iter().map(String::as_str),
            )?;
            tracing::debug!("Prepared upsert: {}", stmt.sql);
            self.statements.insert(columns.clone(), stmt);
        }

        self.statements
            .get(&columns)
            .ok_or_else(|| Error::Other(anyhow::anyhow!("statement cache miss")))
    }
}

#[async_trait]
impl RecordSink<Row> for PostgresSink {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn open(&mut self) -> paceload_core::Result<()> {
        self.connect().await?;
        Ok(())
    }

    async fn write(&mut self, record: &Row) -> WriteOutcome {
        let sql = match self.statement_for(record) {
            Ok(stmt) => stmt.sql.clone(),
            Err(e) => return WriteOutcome::permanent(e.to_string()),
        };

        let Some(pool) = self.pool.as_ref() else {
            return WriteOutcome::permanent("postgres sink used before open");
        };

        let upsert = sqlx::query(&sql)
            .bind(record.to_json().to_string())
            .execute(pool);

        let outcome = bounded(upsert, self.config.statement_timeout).await;
        if !outcome.is_success() {
            tracing::debug!("Upsert of {} failed: {:?}", record.natural_key(), outcome);
        }
        outcome
    }

    async fn close(&mut self) -> paceload_core::Result<()> {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            tracing::info!("Closed Postgres connection");
        }
        Ok(())
    }
}

/// Await one statement, giving up after `limit`.
async fn bounded<F, T>(statement: F, limit: Duration) -> WriteOutcome
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, statement).await {
        Ok(Ok(_)) => WriteOutcome::Succeeded,
        Ok(Err(e)) => classify_error(&e),
        Err(_) => WriteOutcome::transient(format!("statement timed out after {:?}", limit)),
    }
}
