//! Process lifecycle: open storage, ensure schema, run modules, serve.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use bookshelf_db::Database;
use bookshelf_kernel::settings::{DatabaseBackend, DatabaseSettings, Settings};
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;
use crate::modules::books::repository::{BookRepository, InMemoryBookRepository, PgBookRepository};

/// Backing store selected by configuration
pub struct Storage {
    pub repository: Arc<dyn BookRepository>,
    /// Present only for the postgres backend
    pub database: Option<Database>,
}

impl Storage {
    /// Storage with no database behind it
    pub fn in_memory() -> Self {
        Self {
            repository: Arc::new(InMemoryBookRepository::new()),
            database: None,
        }
    }
}

/// Open the configured backend. Fails if postgres is unreachable.
pub async fn open_storage(settings: &DatabaseSettings) -> anyhow::Result<Storage> {
    match settings.backend {
        DatabaseBackend::Memory => {
            tracing::warn!("using in-memory book storage; data is lost on restart");
            Ok(Storage::in_memory())
        }
        DatabaseBackend::Postgres => {
            let database = Database::connect(settings)
                .await
                .context("failed to connect to database")?;
            Ok(Storage {
                repository: Arc::new(PgBookRepository::new(database.clone())),
                database: Some(database),
            })
        }
    }
}

/// Registry holding every application module
pub fn build_registry(books: Arc<dyn BookRepository>) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, books)?;
    Ok(registry)
}

/// Apply every module's migrations. Returns how many were new.
pub async fn init_schema(database: &Database, registry: &ModuleRegistry) -> anyhow::Result<usize> {
    let migrations = registry.collect_migrations();
    let applied = database
        .init_schema(&migrations)
        .await
        .context("failed to initialize database schema")?;

    tracing::info!(
        applied,
        declared = migrations.len(),
        "database schema ready"
    );
    Ok(applied)
}

/// Connect and apply the schema, then exit
pub async fn init_db(settings: &Settings) -> anyhow::Result<usize> {
    if settings.database.backend != DatabaseBackend::Postgres {
        anyhow::bail!("init-db requires the postgres backend");
    }

    let storage = open_storage(&settings.database).await?;
    let registry = build_registry(Arc::clone(&storage.repository))?;

    let Some(database) = storage.database else {
        anyhow::bail!("postgres backend opened without a database handle");
    };
    let applied = init_schema(&database, &registry).await;
    database.close().await;
    applied
}

/// Run the service until Ctrl+C or SIGTERM
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    serve_with_shutdown(settings, bookshelf_http::shutdown_signal()).await
}

/// Run the service until `shutdown` resolves
pub async fn serve_with_shutdown<F>(settings: Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let storage = open_storage(&settings.database).await?;
    let registry = build_registry(Arc::clone(&storage.repository))?;

    if let Some(database) = &storage.database {
        init_schema(database, &registry).await?;
    }

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;
    registry.start_modules(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, shutdown).await;
    let stopped = registry.stop_modules().await;

    if let Some(database) = storage.database {
        database.close().await;
    }

    served?;
    stopped?;
    tracing::info!("bookshelf shut down cleanly");
    Ok(())
}
