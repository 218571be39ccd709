use std::sync::Arc;

use crate::config::{StoreConfig, StoreType};

pub mod file_store;
pub mod memory_store;
pub mod store_trait;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use store_trait::AnnouncementStore;

/// Builds the announcement store selected by the configuration
pub fn from_config(config: &StoreConfig) -> Arc<dyn AnnouncementStore> {
    match config.store_type {
        StoreType::File => {
            let store = FileStore::new(config.path.clone());
            tracing::info!(
                path = %store.path().display(),
                "using File store for announced first bloods"
            );
            Arc::new(store)
        }
        StoreType::Memory => {
            tracing::warn!("using Memory store: announcements will repeat after a restart");
            Arc::new(MemoryStore::new())
        }
    }
}
