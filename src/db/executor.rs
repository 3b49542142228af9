//! Query execution engine.
//!
//! Two primitives sit on top of the pool:
//! - `select`: parameterized read returning row maps, optionally capped
//! - `execute`: parameterized write returning the affected-row count, run
//!   either in autocommit mode or inside an explicit transaction
//!
//! Both acquire one pooled connection for the duration of the call; the
//! connection goes back to the pool when the guard drops, on every path.
//!
//! # Architecture
//!
//! Backend-specific code lives in the `mysql`, `postgres` and `sqlite`
//! submodules. Their structure is intentionally parallel.

use crate::db::params::{format_args_for_log, to_native_placeholders};
use crate::db::pool::Database;
use crate::db::types::DecodeRow;
use crate::db::value::{Row, Value};
use crate::error::{OrmError, OrmResult};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

impl Database {
    /// Run a read statement and return at most `size` rows (all rows when `None`).
    ///
    /// Zero matching rows yields an empty vector.
    pub async fn select(
        &self,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        info!(sql = %sql, args = %format_args_for_log(args), "SQL: {}", sql);
        let native = to_native_placeholders(sql, self.db_type());

        let rows = impl_db_dispatch!(self.pool(), {
            MySql(p) => mysql::select(p, &native, args, size).await,
            Postgres(p) => postgres::select(p, &native, args, size).await,
            SQLite(p) => sqlite::select(p, &native, args, size).await,
        })
        .map_err(|e| self.annotate_error(e))?;

        debug!(rows = rows.len(), "Rows returned: {}", rows.len());
        Ok(rows)
    }

    /// Run a write statement and return the number of affected rows.
    ///
    /// With `autocommit == false` the statement runs in its own transaction:
    /// committed on success, rolled back on failure. The failure itself is
    /// returned unchanged.
    pub async fn execute(&self, sql: &str, args: &[Value], autocommit: bool) -> OrmResult<u64> {
        info!(sql = %sql, args = %format_args_for_log(args), autocommit, "SQL: {}", sql);
        let native = to_native_placeholders(sql, self.db_type());

        let rows_affected = impl_db_dispatch!(self.pool(), {
            MySql(p) => mysql::execute(p, &native, args, autocommit).await,
            Postgres(p) => postgres::execute(p, &native, args, autocommit).await,
            SQLite(p) => sqlite::execute(p, &native, args, autocommit).await,
        })
        .map_err(|e| self.annotate_error(e))?;

        debug!(rows_affected, "Statement executed");
        Ok(rows_affected)
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R: DecodeRow>(results: Vec<Result<R, sqlx::Error>>) -> OrmResult<Vec<Row>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(OrmError::from)?.to_row());
    }
    Ok(rows)
}

/// Roll back after a failed statement, keeping the statement's error.
async fn rollback_after_failure<F>(rollback: F, error: sqlx::Error) -> OrmError
where
    F: std::future::Future<Output = Result<(), sqlx::Error>>,
{
    if let Err(rollback_err) = rollback.await {
        warn!(error = %rollback_err, "Rollback after failed statement also failed");
    } else {
        debug!("Transaction rolled back");
    }
    OrmError::from(error)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod mysql {
    use super::*;
    use crate::db::params::bind_mysql_value;
    use sqlx::MySqlPool;

    pub async fn select(
        pool: &MySqlPool,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        let mut conn = pool.acquire().await?;
        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_mysql_value(query, arg);
        }
        let results = match size {
            Some(n) => query.fetch(&mut *conn).take(n).collect::<Vec<_>>().await,
            None => query.fetch(&mut *conn).collect::<Vec<_>>().await,
        };
        collect_rows(results)
    }

    pub async fn execute(
        pool: &MySqlPool,
        sql: &str,
        args: &[Value],
        autocommit: bool,
    ) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_mysql_value(query, arg);
        }

        if autocommit {
            let mut conn = pool.acquire().await?;
            let done = query.execute(&mut *conn).await?;
            return Ok(done.rows_affected());
        }

        let mut tx = pool.begin().await?;
        let result = query.execute(&mut *tx).await;
        match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => Err(rollback_after_failure(tx.rollback(), e).await),
        }
    }
}

mod postgres {
    use super::*;
    use crate::db::params::bind_postgres_value;
    use sqlx::PgPool;

    pub async fn select(
        pool: &PgPool,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        let mut conn = pool.acquire().await?;
        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_postgres_value(query, arg);
        }
        let results = match size {
            Some(n) => query.fetch(&mut *conn).take(n).collect::<Vec<_>>().await,
            None => query.fetch(&mut *conn).collect::<Vec<_>>().await,
        };
        collect_rows(results)
    }

    pub async fn execute(
        pool: &PgPool,
        sql: &str,
        args: &[Value],
        autocommit: bool,
    ) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_postgres_value(query, arg);
        }

        if autocommit {
            let mut conn = pool.acquire().await?;
            let done = query.execute(&mut *conn).await?;
            return Ok(done.rows_affected());
        }

        let mut tx = pool.begin().await?;
        let result = query.execute(&mut *tx).await;
        match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => Err(rollback_after_failure(tx.rollback(), e).await),
        }
    }
}

mod sqlite {
    use super::*;
    use crate::db::params::bind_sqlite_value;
    use sqlx::SqlitePool;

    pub async fn select(
        pool: &SqlitePool,
        sql: &str,
        args: &[Value],
        size: Option<usize>,
    ) -> OrmResult<Vec<Row>> {
        let mut conn = pool.acquire().await?;
        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_sqlite_value(query, arg);
        }
        let results = match size {
            Some(n) => query.fetch(&mut *conn).take(n).collect::<Vec<_>>().await,
            None => query.fetch(&mut *conn).collect::<Vec<_>>().await,
        };
        collect_rows(results)
    }

    pub async fn execute(
        pool: &SqlitePool,
        sql: &str,
        args: &[Value],
        autocommit: bool,
    ) -> OrmResult<u64> {
        let mut query = sqlx::query(sql);
        for arg in args {
            query = bind_sqlite_value(query, arg);
        }

        if autocommit {
            let mut conn = pool.acquire().await?;
            let done = query.execute(&mut *conn).await?;
            return Ok(done.rows_affected());
        }

        let mut tx = pool.begin().await?;
        let result = query.execute(&mut *tx).await;
        match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => Err(rollback_after_failure(tx.rollback(), e).await),
        }
    }
}
