//! MySQL-backed store.
//!
//! sqlx is async; the scrubber is not. The store owns a current-thread
//! runtime and a single-connection pool and blocks on every call, so
//! statements run strictly one after another.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tokio::runtime::{Builder, Runtime};

use crate::error::StoreError;
use crate::storage::queries::{
    build_column_exists_query, build_distinct_like_query, build_tables_like_query,
};
use crate::storage::store::Store;

pub struct MySqlStore {
    runtime: Runtime,
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn connect(database_url: &str) -> Result<Self, StoreError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StoreError::new(e.to_string()))?;

        let pool = runtime.block_on(
            MySqlPoolOptions::new()
                .max_connections(1)
                .connect(database_url),
        )?;

        log::info!("STORE_CONNECTED backend=mysql");

        Ok(Self { runtime, pool })
    }
}

impl Store for MySqlStore {
    fn tables_like(&mut self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.runtime.block_on(
            sqlx::query_scalar::<_, String>(build_tables_like_query())
                .bind(pattern)
                .fetch_all(&self.pool),
        )?;
        Ok(tables)
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        let count = self.runtime.block_on(
            sqlx::query_scalar::<_, i64>(build_column_exists_query())
                .bind(table)
                .bind(column)
                .fetch_one(&self.pool),
        )?;
        Ok(count > 0)
    }

    fn distinct_like(&mut self, table: &str, column: &str, pattern: &str) -> Result<Vec<String>, StoreError> {
        let sql = build_distinct_like_query(table, column);
        let values = self.runtime.block_on(
            sqlx::query_scalar::<_, String>(&sql)
                .bind(pattern)
                .fetch_all(&self.pool),
        )?;
        Ok(values)
    }

    fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        let result = self
            .runtime
            .block_on(sqlx::raw_sql(sql).execute(&self.pool))?;
        Ok(result.rows_affected())
    }
}
