//! Embedded migration utilities.

use std::{error::Error as StdError, time::Duration};

use cfg_if::cfg_if;
use diesel::result::{Error as DieselError, QueryResult};
use diesel_migrations::MigrationHarness;
use thiserror::Error;
use tokio::time::timeout;
use tracing::info;

use super::connection::{DbConnection, MIGRATIONS};

const MIGRATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
enum MigrationFailure {
    #[error("migration harness error: {0}")]
    Harness(#[source] Box<dyn StdError + Send + Sync>),
    #[error("migration execution exceeded {0:?}")]
    Timeout(Duration),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration connection error: {0}")]
    Connection(#[source] diesel::result::ConnectionError),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration executor error: {0}")]
    Executor(#[source] tokio::task::JoinError),
}

impl From<MigrationFailure> for DieselError {
    fn from(failure: MigrationFailure) -> Self {
        Self::SerializationError(Box::new(failure))
    }
}

fn apply_pending<C>(conn: &mut C) -> QueryResult<()>
where
    C: MigrationHarness<crate::DbBackend>,
{
    if let Ok(false) = conn.has_pending_migration(MIGRATIONS) {
        info!("no pending migrations; skipping apply");
        return Ok(());
    }
    info!("applying pending migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| MigrationFailure::Harness(e).into())
}

cfg_if! {
    if #[cfg(feature = "sqlite")] {
        /// Run embedded database migrations.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations.
        #[must_use = "handle the result"]
        pub async fn run_migrations(conn: &mut DbConnection) -> QueryResult<()> {
            timeout(MIGRATION_TIMEOUT, conn.spawn_blocking(apply_pending))
                .await
                .map_err(|_| DieselError::from(MigrationFailure::Timeout(MIGRATION_TIMEOUT)))??;
            Ok(())
        }

        /// Apply embedded migrations for the current backend.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations.
        #[must_use = "handle the result"]
        pub async fn apply_migrations(
            conn: &mut DbConnection,
            _database_url: &str,
        ) -> QueryResult<()> {
            run_migrations(conn).await
        }
    } else if #[cfg(all(feature = "postgres", not(feature = "sqlite")))] {
        /// Run embedded database migrations.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations.
        #[must_use = "handle the result"]
        pub async fn run_migrations(database_url: &str) -> QueryResult<()> {
            use diesel::{Connection, pg::PgConnection};
            use tokio::task;
            let url = database_url.to_owned();
            timeout(
                MIGRATION_TIMEOUT,
                task::spawn_blocking(move || -> QueryResult<()> {
                    let mut conn = PgConnection::establish(&url)
                        .map_err(|e| DieselError::from(MigrationFailure::Connection(e)))?;
                    apply_pending(&mut conn)
                }),
            )
            .await
            .map_err(|_| DieselError::from(MigrationFailure::Timeout(MIGRATION_TIMEOUT)))?
            .map_err(|e| DieselError::from(MigrationFailure::Executor(e)))??;
            Ok(())
        }

        /// Apply embedded migrations for the current backend.
        ///
        /// # Errors
        /// Returns any error produced by Diesel while running migrations.
        #[must_use = "handle the result"]
        pub async fn apply_migrations(conn: &mut DbConnection, url: &str) -> QueryResult<()> {
            let _ = conn;
            run_migrations(url).await
        }
    }
}
