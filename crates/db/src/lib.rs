//! SurrealDB client factory and store bootstrap.
//!
//! The [`Database`] handle is created once by the process entry point and
//! cloned into whatever needs it. Cloning shares the underlying connection.

use bookshelf_kernel::{settings::DatabaseSettings, Migration};
use surrealdb::{engine::any::Any, opt::auth::Root, Surreal};
use thiserror::Error;

/// Table recording which module migrations have been applied.
const MIGRATIONS_TABLE: &str = "_migrations";

/// Fragment SurrealDB puts in unique index violations.
const UNIQUE_VIOLATION_MARKER: &str = "already contains";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("migration '{module}/{id}' failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error(transparent)]
    Query(#[from] surrealdb::Error),
}

/// Shared handle to the document store.
#[derive(Clone)]
pub struct Database {
    client: Surreal<Any>,
}

impl Database {
    /// An unconnected handle. Every query fails until [`Database::open`]
    /// succeeds.
    pub fn new() -> Self {
        Self {
            client: Surreal::init(),
        }
    }

    /// Create a handle and connect it in one step.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let database = Self::new();
        database.open(settings).await?;
        Ok(database)
    }

    /// Connect, authenticate if credentials are configured, and select the
    /// namespace and database.
    pub async fn open(&self, settings: &DatabaseSettings) -> Result<(), DbError> {
        let connect_error = |source| DbError::Connect {
            url: settings.redacted_url(),
            source,
        };

        self.client
            .connect(settings.url.as_str())
            .await
            .map_err(connect_error)?;

        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            self.client
                .signin(Root {
                    username: username.as_str(),
                    password: password.as_str(),
                })
                .await
                .map_err(connect_error)?;
        }

        self.client
            .use_ns(&settings.namespace)
            .use_db(&settings.database)
            .await
            .map_err(connect_error)?;

        tracing::info!(
            target: "bookshelf-db",
            url = %settings.redacted_url(),
            namespace = %settings.namespace,
            database = %settings.database,
            "connected to document store"
        );
        Ok(())
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.client
    }

    /// Apply every migration not yet recorded. Returns how many ran.
    pub async fn apply_migrations(
        &self,
        migrations: &[(String, Migration)],
    ) -> Result<usize, DbError> {
        self.client
            .query(format!(
                "DEFINE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} SCHEMALESS"
            ))
            .await?
            .check()?;

        let applied: Vec<String> = self
            .client
            .query(format!(
                "SELECT VALUE record::id(id) FROM {MIGRATIONS_TABLE}"
            ))
            .await?
            .take(0)?;

        let mut count = 0;
        for (module, migration) in migrations {
            let key = migration_key(module, migration.id);
            if applied.contains(&key) {
                tracing::debug!(target: "bookshelf-db", %key, "migration already applied");
                continue;
            }

            let failed = |source| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            };

            self.client
                .query(migration.up)
                .await
                .and_then(|response| response.check())
                .map_err(failed)?;

            self.client
                .query(format!(
                    "CREATE type::thing('{MIGRATIONS_TABLE}', $key) SET applied_at = time::now() RETURN NONE"
                ))
                .bind(("key", key.clone()))
                .await
                .and_then(|response| response.check())
                .map_err(failed)?;

            tracing::info!(target: "bookshelf-db", %key, "migration applied");
            count += 1;
        }

        Ok(count)
    }

    /// Release the handle. Pending queries on clones keep the connection
    /// alive until they are dropped too.
    pub fn close(self) {
        tracing::info!(target: "bookshelf-db", "closing document store handle");
        drop(self.client);
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier under which a migration is recorded.
pub fn migration_key(module: &str, id: &str) -> String {
    format!("{module}/{id}")
}

/// Whether a store error message reports a unique index violation.
pub fn is_unique_violation(message: &str) -> bool {
    message.contains(UNIQUE_VIOLATION_MARKER)
}
