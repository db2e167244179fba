use std::time::Duration;

use crate::dbs::postgres::PgOrderStore;
use crate::error::{PersistError, Result};

pub struct StoreBuilder {
    database_url: Option<String>,
    max_connections: u32,
    acquire_timeout: Duration,
    run_migrations: bool,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: false,
        }
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Apply the bundled migrations after connecting
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub async fn build(self) -> Result<PgOrderStore> {
        let database_url = self
            .database_url
            .ok_or_else(|| PersistError::Internal("database_url is required".to_string()))?;

        if self.max_connections == 0 {
            return Err(PersistError::Internal(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let store =
            PgOrderStore::connect(&database_url, self.max_connections, self.acquire_timeout)
                .await?;

        if self.run_migrations {
            store.migrate().await?;
        }

        Ok(store)
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
