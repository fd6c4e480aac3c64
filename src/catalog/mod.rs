//! Local file catalog
//!
//! Read-only view of the file and folder records a principal owns locally.
//! The records themselves are owned by the persistence layer.

pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use memory::MemoryCatalog;
pub use types::{LocalFileRecord, LocalFolderRecord};

/// Failures reading local records
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Source of locally tracked records
///
/// Results are complete and unpaginated for one principal.
#[async_trait]
pub trait FileCatalog: Send + Sync {
    /// All files owned by a principal
    async fn list_files_by_owner(&self, principal: &str)
        -> Result<Vec<LocalFileRecord>, CatalogError>;

    /// All folders owned by a principal
    async fn list_folders_by_owner(
        &self,
        principal: &str,
    ) -> Result<Vec<LocalFolderRecord>, CatalogError>;
}
