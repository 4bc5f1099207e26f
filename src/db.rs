//! Connection pool setup for the `prognostics` schema.
//!
//! The catalog lookup and the reading sink share one SeaORM pool. Opening it
//! retries with exponential backoff; once the pool is up the ingester checks
//! that the catalog table is reachable so a wrong database fails at startup
//! rather than on the first channel.

use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{AppConfig, redact_database_url};

const CONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Errors that can occur while preparing the database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Failed to connect to {target} after {attempts} attempts: {source}")]
    ConnectionFailed {
        target: String,
        attempts: u32,
        #[source]
        source: DbErr,
    },
    #[error("Invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
    #[error("Catalog table prognostics.capacitors is not readable: {source}")]
    CatalogUnavailable {
        #[source]
        source: DbErr,
    },
}

/// Opens the connection pool described by `cfg`.
///
/// # Examples
///
/// ```no_run
/// use pcre_ingest::{config::AppConfig, db};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = AppConfig::default();
///     let pool = db::init_pool(&config).await?;
///     db::verify_catalog(&pool).await?;
///     Ok(())
/// }
/// ```
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.trim().is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "Database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let target = redact_database_url(&cfg.database_url);
    let mut retry_delay = INITIAL_RETRY_DELAY;
    let mut attempt = 1;

    loop {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                log::info!("Connected to {} (attempt {})", target, attempt);
                return Ok(conn);
            }
            Err(source) if attempt >= CONNECT_ATTEMPTS => {
                return Err(DatabaseError::ConnectionFailed {
                    target,
                    attempts: attempt,
                    source,
                }
                .into());
            }
            Err(e) => {
                log::warn!(
                    "Connection attempt {} to {} failed: {}, retrying in {:?}",
                    attempt,
                    target,
                    e,
                    retry_delay
                );
                sleep(retry_delay).await;
                retry_delay *= 2;
                attempt += 1;
            }
        }
    }
}

/// Checks that `prognostics.capacitors` exists and is readable with the
/// pool's credentials.
pub async fn verify_catalog(db: &DatabaseConnection) -> Result<()> {
    let stmt = Statement::from_string(
        db.get_database_backend(),
        "SELECT cap_id FROM prognostics.capacitors LIMIT 1".to_string(),
    );

    db.query_one(stmt)
        .await
        .map_err(|source| DatabaseError::CatalogUnavailable { source })
        .context("verifying the capacitor catalog")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_database_url_is_rejected_before_connecting() {
        let mut config = AppConfig::default();
        config.database_url = "   ".to_string();

        let result = init_pool(&config).await;

        assert!(matches!(
            result.unwrap_err().downcast::<DatabaseError>(),
            Ok(DatabaseError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_connection_failure_message_hides_password() {
        let err = DatabaseError::ConnectionFailed {
            target: redact_database_url("postgresql://postgres:hunter2@db:5432/PCRE"),
            attempts: CONNECT_ATTEMPTS,
            source: DbErr::Custom("refused".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains("after 5 attempts"));
        assert!(!message.contains("hunter2"));
    }
}
