//! Usage insights
//!
//! The cached, budgeted `UsageAggregator` and the uncached `StatsSummarizer`
//! both read local records and, when the principal is connected, remote listings.

pub mod aggregator;
pub mod cache;
pub mod report;
pub mod summary;

use std::time::{SystemTime, UNIX_EPOCH};

pub use aggregator::{ReportOptions, UsageAggregator};
pub use cache::ReportCache;
pub use report::{ItemSource, ItemSummary, UsageCounts, UsageReport};
pub use summary::{StatsSummarizer, StorageStats};

/// Current time in milliseconds since epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::catalog::{
        CatalogError, FileCatalog, LocalFileRecord, LocalFolderRecord, MemoryCatalog,
    };

    /// Wraps a MemoryCatalog, counting loads and optionally failing or stalling
    #[derive(Default)]
    pub(crate) struct CountingCatalog {
        pub inner: MemoryCatalog,
        pub loads: AtomicUsize,
        pub fail: bool,
        pub delay: Option<Duration>,
    }

    impl CountingCatalog {
        pub fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FileCatalog for CountingCatalog {
        async fn list_files_by_owner(
            &self,
            principal: &str,
        ) -> Result<Vec<LocalFileRecord>, CatalogError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(CatalogError::Unavailable("database offline".to_string()));
            }
            self.inner.list_files_by_owner(principal).await
        }

        async fn list_folders_by_owner(
            &self,
            principal: &str,
        ) -> Result<Vec<LocalFolderRecord>, CatalogError> {
            self.inner.list_folders_by_owner(principal).await
        }
    }

    pub(crate) fn local_file(owner: &str, name: &str, size: u64, uploaded_at: u64) -> LocalFileRecord {
        LocalFileRecord {
            owner: owner.to_string(),
            name: name.to_string(),
            size,
            mime_type: String::new(),
            shared: false,
            uploaded_at,
            bucket: None,
            key: String::new(),
        }
    }
}
