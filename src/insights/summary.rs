//! Stats Summarizer
//!
//! Always-fresh dashboard counters. Same sources as the aggregator, but no
//! distributions, no top-N lists and no cache; the remote walk only adds to
//! counts and bytes under its own, higher ceiling.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use super::report::usage_percent;
use crate::catalog::FileCatalog;
use crate::config::Config;
use crate::errors::InsightsError;
use crate::remote::RemoteLister;
use crate::vault::CredentialVault;

/// Dashboard counters for one principal
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    /// Local files plus remote objects counted
    pub files: u64,
    pub folders: u64,
    pub shared: u64,
    pub used_bytes: u64,
    pub capacity_bytes: u64,
    pub available_bytes: u64,
    pub usage_pct: f64,
    pub local_files: u64,
    pub local_bytes: u64,
    pub remote_objects: u64,
    pub remote_bytes: u64,
    pub remote_buckets: u64,
    /// A credential was present for the principal
    pub connected: bool,
    /// Remote counting stopped early
    pub partial: bool,
}

/// Computes `StorageStats` on every call
pub struct StatsSummarizer {
    catalog: Arc<dyn FileCatalog>,
    vault: Arc<CredentialVault>,
    lister: RemoteLister,
    capacity_bytes: u64,
    object_ceiling: usize,
    timeout: Duration,
}

impl StatsSummarizer {
    pub fn new(
        catalog: Arc<dyn FileCatalog>,
        vault: Arc<CredentialVault>,
        lister: RemoteLister,
        config: &Config,
    ) -> Self {
        Self {
            catalog,
            vault,
            lister,
            capacity_bytes: config.capacity_bytes,
            object_ceiling: config.stats_object_ceiling,
            timeout: config.compute_timeout,
        }
    }

    pub async fn summarize(&self, principal: &str) -> Result<StorageStats, InsightsError> {
        tokio::time::timeout(self.timeout, self.collect(principal))
            .await
            .map_err(|_| {
                error!(principal = principal, timeout = ?self.timeout, "Stats summary timed out");
                InsightsError::Timeout(self.timeout)
            })?
    }

    async fn collect(&self, principal: &str) -> Result<StorageStats, InsightsError> {
        let files = self.catalog.list_files_by_owner(principal).await?;
        let folders = self.catalog.list_folders_by_owner(principal).await?;

        let mut stats = StorageStats {
            local_files: files.len() as u64,
            local_bytes: files.iter().map(|f| f.size).sum(),
            folders: folders.len() as u64,
            shared: files.iter().filter(|f| f.shared).count() as u64
                + folders.iter().filter(|f| f.shared).count() as u64,
            capacity_bytes: self.capacity_bytes,
            ..StorageStats::default()
        };

        if let Some(credential) = self.vault.get(principal).filter(|c| c.is_well_formed()) {
            stats.connected = true;
            let outcome = self
                .lister
                .traverse(&credential, self.object_ceiling, |_, _| {})
                .await;
            stats.remote_objects = outcome.objects as u64;
            stats.remote_bytes = outcome.bytes;
            stats.remote_buckets = outcome.buckets as u64;
            stats.partial = outcome.partial;
        }

        stats.files = stats.local_files + stats.remote_objects;
        stats.used_bytes = stats.local_bytes + stats.remote_bytes;
        stats.available_bytes = self.capacity_bytes.saturating_sub(stats.used_bytes);
        stats.usage_pct = usage_percent(stats.used_bytes, self.capacity_bytes);

        debug!(
            principal = principal,
            files = stats.files,
            used_bytes = stats.used_bytes,
            partial = stats.partial,
            "Computed storage stats"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::testing::{local_file, CountingCatalog};
    use crate::remote::lister::tests::{object, ScriptedStore};
    use crate::vault::Credential;

    fn summarizer(
        catalog: Arc<CountingCatalog>,
        store: Arc<ScriptedStore>,
        vault: Arc<CredentialVault>,
        config: &Config,
    ) -> StatsSummarizer {
        StatsSummarizer::new(catalog, vault, RemoteLister::new(store, config.page_size), config)
    }

    fn catalog() -> Arc<CountingCatalog> {
        let catalog = CountingCatalog::default();
        catalog.inner.insert_file(local_file("alice", "a.txt", 100, 0));
        let mut shared = local_file("alice", "b.txt", 50, 0);
        shared.shared = true;
        catalog.inner.insert_file(shared);
        Arc::new(catalog)
    }

    fn bucket_pages(count: usize, per_page: usize) -> Vec<Vec<crate::remote::RemoteObject>> {
        (0..count)
            .map(|p| (0..per_page).map(|i| object(&format!("o{}-{}", p, i), 10, 0)).collect())
            .collect()
    }

    fn vault(connected: bool) -> Arc<CredentialVault> {
        let vault = Arc::new(CredentialVault::new(Duration::from_secs(60)));
        if connected {
            vault.set("alice", Credential::new("id", "secret", ""), None);
        }
        vault
    }

    #[tokio::test]
    async fn test_local_only_when_disconnected() {
        let store = Arc::new(ScriptedStore::default().with_bucket("a", bucket_pages(1, 3)));
        let stats = summarizer(catalog(), store.clone(), vault(false), &Config::default())
            .summarize("alice")
            .await
            .unwrap();

        assert!(!stats.connected);
        assert_eq!(stats.files, 2);
        assert_eq!(stats.used_bytes, 150);
        assert_eq!(stats.shared, 1);
        assert_eq!(store.bucket_calls(), 0);
    }

    #[tokio::test]
    async fn test_counts_remote_objects() {
        let store = Arc::new(
            ScriptedStore::default()
                .with_bucket("a", bucket_pages(2, 3))
                .with_bucket("b", bucket_pages(1, 1)),
        );
        let stats = summarizer(catalog(), store, vault(true), &Config::default())
            .summarize("alice")
            .await
            .unwrap();

        assert!(stats.connected);
        assert!(!stats.partial);
        assert_eq!(stats.remote_objects, 7);
        assert_eq!(stats.remote_buckets, 2);
        assert_eq!(stats.files, 9);
        assert_eq!(stats.used_bytes, 220);
    }

    #[tokio::test]
    async fn test_uses_its_own_ceiling() {
        let store = Arc::new(ScriptedStore::default().with_bucket("a", bucket_pages(4, 3)));
        let config = Config {
            report_object_ceiling: 1,
            stats_object_ceiling: 8,
            ..Config::default()
        };
        let stats = summarizer(catalog(), store, vault(true), &config)
            .summarize("alice")
            .await
            .unwrap();

        assert!(stats.partial);
        assert_eq!(stats.remote_objects, 8);
    }

    #[tokio::test]
    async fn test_uncached_reloads_every_call() {
        let catalog = catalog();
        let store = Arc::new(ScriptedStore::default());
        let summarizer = summarizer(catalog.clone(), store, vault(false), &Config::default());

        summarizer.summarize("alice").await.unwrap();
        summarizer.summarize("alice").await.unwrap();
        assert_eq!(catalog.loads(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_not_fatal() {
        let store = Arc::new(
            ScriptedStore::default()
                .with_bucket("a", bucket_pages(1, 3))
                .failing_at("a", 0),
        );
        let stats = summarizer(catalog(), store, vault(true), &Config::default())
            .summarize("alice")
            .await
            .unwrap();

        assert!(stats.partial);
        assert_eq!(stats.remote_objects, 0);
        assert_eq!(stats.files, 2);
    }
}
