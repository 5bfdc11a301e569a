use async_trait::async_trait;
use es_core::{Error, Result, SignalStorage};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub mod backends;

pub use backends::*;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn get_error_message() -> &'static str;
    async fn new(config: &StorageConfig) -> Result<Self> where Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StorageKind {
    #[default]
    Memory,
    Sqlite,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => write!(f, "memory"),
            StorageKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub sqlite_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            sqlite_path: PathBuf::from("signals.db"),
        }
    }
}

/// Opens the configured backend.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn SignalStorage>> {
    let storage: Arc<dyn SignalStorage> = match config.kind {
        StorageKind::Memory => Arc::new(open::<InMemoryStorage>(config).await?),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Arc::new(open::<SQLiteStorage>(config).await?),
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            return Err(Error::Config("built without the sqlite feature".to_string()))
        }
    };
    info!("💾 Storage backend opened ({})", config.kind);
    Ok(storage)
}

async fn open<T: StorageBackend>(config: &StorageConfig) -> Result<T> {
    T::new(config)
        .await
        .map_err(|e| Error::Storage(format!("{} ({})", e, T::get_error_message())))
}

pub mod prelude {
    pub use super::{create_storage, StorageConfig, StorageKind};
    pub use super::backends::*;
}
