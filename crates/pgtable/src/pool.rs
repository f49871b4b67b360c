//! Connection pool utilities

use crate::config::DbConfig;
use crate::error::{QbError, QbResult};
use crate::table::Table;
use deadpool_postgres::{Manager, ManagerConfig, Pool, PoolBuilder, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// Create a connection pool from connection settings, without TLS.
///
/// For TLS, or to tune the pool further, use [`create_pool_with_manager_config`].
pub fn create_pool(config: &DbConfig) -> QbResult<Pool> {
    let max_size = config.max_connections;
    create_pool_with_manager_config(config, NoTls, default_manager_config(), |builder| {
        builder.max_size(max_size)
    })
}

/// Create a connection pool with injected `deadpool_postgres::ManagerConfig` and `PoolBuilder`.
pub fn create_pool_with_manager_config<T>(
    config: &DbConfig,
    tls: T,
    manager_config: ManagerConfig,
    configure_pool: impl FnOnce(PoolBuilder) -> PoolBuilder,
) -> QbResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    config.validate()?;
    let mgr = Manager::from_config(config.pg_config(), tls, manager_config);
    configure_pool(Pool::builder(mgr))
        .build()
        .map_err(|e| QbError::Connection(e.to_string()))
}

fn default_manager_config() -> ManagerConfig {
    ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    }
}

/// An explicitly owned connection pool that hands out table sessions.
///
/// Cloning is cheap and shares the pool.
///
/// ```ignore
/// let db = Database::connect(&DbConfig::from_env()?).await?;
/// let active = db.table("users").await?.where_("status", "active").count().await?;
/// ```
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Build a pool and check out one connection to verify the settings.
    pub async fn connect(config: &DbConfig) -> QbResult<Self> {
        let db = Self::from_pool(create_pool(config)?);
        drop(db.client().await?);
        Ok(db)
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check out a pooled connection.
    pub async fn client(&self) -> QbResult<deadpool_postgres::Client> {
        Ok(self.pool.get().await?)
    }

    /// Start a session on `name`, holding one pooled connection for its lifetime.
    pub async fn table(&self, name: &str) -> QbResult<Table<deadpool_postgres::Client>> {
        let client = self.client().await?;
        Table::new(client, name)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("Database")
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}
