pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryStorage;
pub use sqlite::SqliteStorage;
pub use traits::Storage;

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Builds the storage backend selected in configuration, with its schema applied.
pub fn open_storage(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    match config.backend {
        DatabaseBackend::Sqlite => {
            let storage = SqliteStorage::open(&config.path)?;
            storage.run_migrations()?;
            Ok(Arc::new(storage))
        }
        DatabaseBackend::Memory => {
            info!("Using in-memory storage; data is lost on exit");
            Ok(Arc::new(InMemoryStorage::new()))
        }
    }
}
