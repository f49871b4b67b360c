//! Execution adapter trait.

use crate::error::{QbError, QbResult};
use crate::qb::Statement;
use crate::row::Record;

/// Runs compiled statements against a database.
///
/// Implemented for `tokio_postgres::Client`, the pooled `deadpool_postgres` clients, and
/// references to any executor, so a session can either own its connection or borrow one.
pub trait Executor: Send + Sync {
    /// Execute a statement and return all rows.
    fn fetch_all(
        &self,
        stmt: &Statement,
    ) -> impl std::future::Future<Output = QbResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, stmt: &Statement) -> impl std::future::Future<Output = QbResult<u64>> + Send;
}

impl Executor for tokio_postgres::Client {
    async fn fetch_all(&self, stmt: &Statement) -> QbResult<Vec<Record>> {
        let params = stmt.params_ref();
        let rows = tokio_postgres::Client::query(self, stmt.sql(), &params)
            .await
            .map_err(QbError::from_db_error)?;
        rows.iter().map(Record::from_row).collect()
    }

    async fn execute(&self, stmt: &Statement) -> QbResult<u64> {
        let params = stmt.params_ref();
        tokio_postgres::Client::execute(self, stmt.sql(), &params)
            .await
            .map_err(QbError::from_db_error)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    async fn fetch_all(&self, stmt: &Statement) -> QbResult<Vec<Record>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        Executor::fetch_all(&**self, stmt).await
    }

    async fn execute(&self, stmt: &Statement) -> QbResult<u64> {
        Executor::execute(&**self, stmt).await
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::ClientWrapper {
    async fn fetch_all(&self, stmt: &Statement) -> QbResult<Vec<Record>> {
        Executor::fetch_all(&**self, stmt).await
    }

    async fn execute(&self, stmt: &Statement) -> QbResult<u64> {
        Executor::execute(&**self, stmt).await
    }
}

impl<E: Executor> Executor for &E {
    async fn fetch_all(&self, stmt: &Statement) -> QbResult<Vec<Record>> {
        (**self).fetch_all(stmt).await
    }

    async fn execute(&self, stmt: &Statement) -> QbResult<u64> {
        (**self).execute(stmt).await
    }
}
