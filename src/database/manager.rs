use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::retry::Transient;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Categories of datastore failures the services react to differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Query returned no row where one was required
    NotFound,
    /// A lock could not be acquired within `lock_timeout` (SQLSTATE 55P03)
    LockWaitTimeout,
    /// Transaction chosen as deadlock victim (SQLSTATE 40P01)
    Deadlock,
    /// Referenced row does not exist (SQLSTATE 23503)
    ForeignKeyViolation,
    /// Unique constraint violated (SQLSTATE 23505)
    UniqueViolation,
    /// Pool or network failure
    Connection,
    Other,
}

impl DbErrorKind {
    /// Map a PostgreSQL SQLSTATE code onto a category
    pub fn from_sqlstate(code: &str) -> Self {
        match code {
            "55P03" => DbErrorKind::LockWaitTimeout,
            "40P01" => DbErrorKind::Deadlock,
            "23503" => DbErrorKind::ForeignKeyViolation,
            "23505" => DbErrorKind::UniqueViolation,
            _ => DbErrorKind::Other,
        }
    }

    pub fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbErrorKind::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DbErrorKind::Connection
            }
            sqlx::Error::Database(db_err) => db_err
                .code()
                .map(|code| Self::from_sqlstate(&code))
                .unwrap_or(DbErrorKind::Other),
            _ => DbErrorKind::Other,
        }
    }
}

impl DatabaseError {
    pub fn kind(&self) -> DbErrorKind {
        match self {
            DatabaseError::NotFound(_) => DbErrorKind::NotFound,
            DatabaseError::Sqlx(err) => DbErrorKind::from_sqlx(err),
            _ => DbErrorKind::Other,
        }
    }

    /// Name of the violated constraint, when the datastore reported one
    pub fn constraint(&self) -> Option<&str> {
        match self {
            DatabaseError::Sqlx(sqlx::Error::Database(db_err)) => db_err.constraint(),
            _ => None,
        }
    }
}

impl Transient for DatabaseError {
    fn is_transient(&self) -> bool {
        self.kind() == DbErrorKind::LockWaitTimeout
    }
}

/// Process-wide connection pool
pub struct DatabaseManager;

static POOL: OnceCell<PgPool> = OnceCell::const_new();

impl DatabaseManager {
    /// Get the shared pool, creating it lazily from configuration
    pub async fn main_pool() -> Result<PgPool, DatabaseError> {
        POOL.get_or_try_init(|| async { Self::connect_lazy(&crate::config::config().database) })
            .await
            .cloned()
    }

    /// Build a pool that opens connections on first use so the server can
    /// start (and report a degraded /health) while the database is down
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        if config.url.is_empty() {
            return Err(DatabaseError::ConfigMissing("DATABASE_URL"));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_lazy(&config.url)?;

        info!(max_connections = config.max_connections, "Created database pool");
        Ok(pool)
    }

    /// Apply pending schema migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Open a transaction whose lock waits fail with SQLSTATE 55P03 after
    /// `lock_timeout` instead of blocking for the server default
    pub async fn begin_with_lock_timeout(
        pool: &PgPool,
        lock_timeout: Duration,
    ) -> Result<Transaction<'static, Postgres>, DatabaseError> {
        let mut tx = pool.begin().await?;
        // SET does not accept bind parameters; the value is a plain integer
        let stmt = format!("SET LOCAL lock_timeout = '{}ms'", lock_timeout.as_millis());
        sqlx::query(&stmt).execute(&mut *tx).await?;
        Ok(tx)
    }

    /// Close the shared pool (e.g., on shutdown)
    pub async fn close_all() {
        if let Some(pool) = POOL.get() {
            pool.close().await;
            info!("Closed database pool");
        }
    }
}
