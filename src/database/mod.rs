pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use repository::Repositories;

use tracing::info;

use crate::config::{DatabaseConfig, StorageBackend};

/// Open the configured store, applying migrations to Postgres when enabled.
pub async fn connect(config: &DatabaseConfig) -> Result<Repositories, DatabaseError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Repositories::memory())
        }
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect_lazy(config)?;
            if config.run_migrations {
                DatabaseManager::migrate(&pool).await?;
            }
            Ok(Repositories::postgres(pool))
        }
    }
}
