//! Connection pool owned by the process

use std::time::Duration;

use futures::future::BoxFuture;
use log::LevelFilter;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};

use bookshelf_kernel::settings::DatabaseSettings;

use crate::error::PersistenceError;
use crate::session::Session;

/// Handle to the PostgreSQL pool.
///
/// Cloning is cheap; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build the pool and open its first connection.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Connect`] if the URL is malformed or the
    /// server cannot be reached within the acquire timeout.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, PersistenceError> {
        let options = connect_options(settings)?;

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(PersistenceError::Connect)?;

        tracing::info!(
            max_connections = settings.max_connections,
            echo = settings.echo,
            "database pool ready"
        );

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check out a connection and open a transaction on it.
    ///
    /// The returned session rolls back if it is dropped without
    /// [`Session::commit`].
    pub async fn acquire_session(&self) -> Result<Session, PersistenceError> {
        let tx = self.pool.begin().await?;
        Ok(Session::new(tx))
    }

    /// Run `work` inside a fresh session.
    ///
    /// Commits once when `work` returns `Ok`, rolls back when it returns
    /// `Err`. A commit failure is reported as the call's error.
    pub async fn scoped<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<PersistenceError> + Send,
    {
        let mut session = self.acquire_session().await?;

        match work(&mut session).await {
            Ok(value) => {
                session.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = session.rollback().await {
                    tracing::warn!(error = %rollback_err, "session rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Wait for checked-out connections to return, then close the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}

fn connect_options(settings: &DatabaseSettings) -> Result<PgConnectOptions, PersistenceError> {
    let options: PgConnectOptions = settings.url.parse().map_err(PersistenceError::Connect)?;
    Ok(options.log_statements(statement_log_level(settings.echo)))
}

/// Level every executed statement is logged at. Slow-statement warnings
/// are left at the driver default either way.
fn statement_log_level(echo: bool) -> LevelFilter {
    if echo {
        LevelFilter::Info
    } else {
        LevelFilter::Off
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p bookshelf-db -- --ignored

    async fn connect() -> Database {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let settings = DatabaseSettings {
            url,
            max_connections: 4,
            ..DatabaseSettings::default()
        };
        Database::connect(&settings).await.expect("pool creation failed")
    }

    #[test]
    fn echo_logs_statements_at_info() {
        assert_eq!(statement_log_level(true), LevelFilter::Info);
        assert_eq!(statement_log_level(false), LevelFilter::Off);
    }

    #[test]
    fn connect_options_accept_either_echo_setting() {
        for echo in [true, false] {
            let settings = DatabaseSettings {
                echo,
                ..DatabaseSettings::default()
            };
            let options = connect_options(&settings).unwrap();
            assert_eq!(options.get_database(), Some("bookshelf"));
        }
    }

    #[tokio::test]
    async fn malformed_url_fails_to_connect() {
        let settings = DatabaseSettings {
            url: "not a url".to_string(),
            ..DatabaseSettings::default()
        };

        let err = Database::connect(&settings).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Connect(_)));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn scoped_commits_on_ok() {
        let db = connect().await;
        sqlx::raw_sql("CREATE TABLE IF NOT EXISTS scoped_commit_probe (v INT NOT NULL)")
            .execute(db.pool())
            .await
            .unwrap();

        db.scoped(|session| {
            Box::pin(async move {
                sqlx::query("INSERT INTO scoped_commit_probe (v) VALUES (7)")
                    .execute(session.conn())
                    .await?;
                Ok::<_, PersistenceError>(())
            })
        })
        .await
        .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scoped_commit_probe WHERE v = 7")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert!(count >= 1);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn scoped_rolls_back_on_err() {
        let db = connect().await;
        sqlx::raw_sql("CREATE TABLE IF NOT EXISTS scoped_rollback_probe (v INT NOT NULL)")
            .execute(db.pool())
            .await
            .unwrap();

        let result: Result<(), PersistenceError> = db
            .scoped(|session| {
                Box::pin(async move {
                    sqlx::query("INSERT INTO scoped_rollback_probe (v) VALUES (1)")
                        .execute(session.conn())
                        .await?;
                    Err(PersistenceError::Sqlx(sqlx::Error::RowNotFound))
                })
            })
            .await;
        assert!(result.is_err());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scoped_rollback_probe")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn dropped_sessions_return_connections() {
        let db = connect().await;

        // More sessions than the pool holds; a leaked connection would time out.
        for _ in 0..8 {
            let mut session = db.acquire_session().await.unwrap();
            sqlx::query("SELECT 1").execute(session.conn()).await.unwrap();
        }
    }
}
