//! Insights Service - the operations the daemon exposes
//!
//! Owns the vault, transport, aggregator and summarizer, and implements the
//! connect/disconnect flow around them.

use std::sync::Arc;

use tracing::{info, warn};

use crate::catalog::FileCatalog;
use crate::config::Config;
use crate::errors::InsightsError;
use crate::insights::{ReportOptions, StatsSummarizer, StorageStats, UsageAggregator, UsageReport};
use crate::remote::{BucketDescriptor, ObjectStore, RemoteLister};
use crate::vault::{Credential, CredentialVault};

/// Shared state behind every IPC connection
pub struct InsightsService {
    vault: Arc<CredentialVault>,
    store: Arc<dyn ObjectStore>,
    aggregator: UsageAggregator,
    summarizer: StatsSummarizer,
}

impl InsightsService {
    pub fn new(
        catalog: Arc<dyn FileCatalog>,
        store: Arc<dyn ObjectStore>,
        vault: Arc<CredentialVault>,
        config: &Config,
    ) -> Self {
        let lister = RemoteLister::new(Arc::clone(&store), config.page_size);
        Self {
            aggregator: UsageAggregator::new(
                Arc::clone(&catalog),
                Arc::clone(&vault),
                lister.clone(),
                config,
            ),
            summarizer: StatsSummarizer::new(catalog, Arc::clone(&vault), lister, config),
            vault,
            store,
        }
    }

    /// Validate a credential remotely and store it on success
    ///
    /// A rejected credential is never stored.
    pub async fn connect(
        &self,
        principal: &str,
        credential: Credential,
    ) -> Result<Vec<BucketDescriptor>, InsightsError> {
        let buckets = match self.store.validate_credential(&credential).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(principal = principal, error = %e, "Credential validation failed");
                return Err(InsightsError::InvalidCredential(e.to_string()));
            }
        };

        self.vault.set(principal, credential, None);
        self.aggregator.cache().invalidate(principal);
        info!(principal = principal, buckets = buckets.len(), "Connected remote storage");
        Ok(buckets)
    }

    /// Forget a principal's credential; returns whether one was stored
    pub fn disconnect(&self, principal: &str) -> bool {
        let existed = self.vault.delete(principal);
        self.aggregator.cache().invalidate(principal);
        info!(principal = principal, existed = existed, "Disconnected remote storage");
        existed
    }

    pub fn is_connected(&self, principal: &str) -> bool {
        self.vault.has(principal)
    }

    pub async fn analytics(
        &self,
        principal: &str,
        options: ReportOptions,
    ) -> Result<Arc<UsageReport>, InsightsError> {
        self.aggregator.compute_report(principal, options).await
    }

    pub async fn stats(&self, principal: &str) -> Result<StorageStats, InsightsError> {
        self.summarizer.summarize(principal).await
    }

    /// Drop all credentials and cached reports
    pub fn shutdown(&self) {
        self.vault.shutdown();
        self.aggregator.cache().clear();
        info!("Insights service shut down");
    }
}
