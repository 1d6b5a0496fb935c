//! Bookshelf application library.
//!
//! Wires the configured store into the application modules and drives the
//! server lifecycle.

pub mod modules;

use std::{future::Future, sync::Arc};

use anyhow::Context;
use bookshelf_db::Database;
use bookshelf_kernel::{
    settings::{DatabaseSettings, Settings},
    InitCtx, ModuleRegistry,
};

pub use modules::books;
use modules::books::store::{BookStore, InMemoryBookStore, SurrealBookStore};

/// The store backing the application, plus the database handle when one is
/// in use.
pub struct Storage {
    pub books: Arc<dyn BookStore>,
    database: Option<Database>,
    connected: bool,
}

impl Storage {
    /// Open the configured store.
    ///
    /// A failed connection is logged, not returned: the server still comes up
    /// and store operations fail until the process is restarted.
    pub async fn open(settings: &DatabaseSettings) -> Self {
        if settings.is_in_memory() {
            tracing::warn!("using the in-memory book store; data is lost on exit");
            return Self::in_memory();
        }

        let database = Database::new();
        let connected = match database.open(settings).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "document store unavailable, continuing without it");
                false
            }
        };

        Self {
            books: Arc::new(SurrealBookStore::new(database.clone())),
            database: Some(database),
            connected,
        }
    }

    /// Open the configured store, failing if it cannot be reached.
    pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Self> {
        if settings.is_in_memory() {
            return Ok(Self::in_memory());
        }

        let database = Database::connect(settings)
            .await
            .context("failed to connect to the document store")?;

        Ok(Self {
            books: Arc::new(SurrealBookStore::new(database.clone())),
            database: Some(database),
            connected: true,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            books: Arc::new(InMemoryBookStore::new()),
            database: None,
            connected: true,
        }
    }

    /// Apply pending module migrations. The in-memory store needs none.
    pub async fn migrate(&self, registry: &ModuleRegistry) -> anyhow::Result<usize> {
        let Some(database) = &self.database else {
            return Ok(0);
        };
        if !self.connected {
            tracing::warn!("skipping migrations: document store is not connected");
            return Ok(0);
        }

        let applied = database
            .apply_migrations(&registry.collect_migrations())
            .await
            .context("failed to apply migrations")?;
        tracing::info!(applied, "migrations complete");
        Ok(applied)
    }

    pub fn close(self) {
        if let Some(database) = self.database {
            database.close();
        }
    }
}

/// Registry with every application module mounted over `storage`.
pub fn build_registry(storage: &Storage) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, Arc::clone(&storage.books))?;
    Ok(registry)
}

/// Run the server until `shutdown` resolves, then stop modules and release
/// the store.
pub async fn serve<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let storage = Storage::open(&settings.database).await;
    let registry = build_registry(&storage)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    storage.migrate(&registry).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, shutdown).await;

    let stopped = registry.stop_all().await;
    storage.close();

    served?;
    stopped
}

/// Apply migrations against the configured store and exit.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let storage = Storage::connect(&settings.database).await?;
    let registry = build_registry(&storage)?;
    let applied = storage.migrate(&registry).await;
    storage.close();
    applied
}
