//! Usage Aggregator
//!
//! Builds a `UsageReport` from local records plus, when asked and connected,
//! a budgeted walk of the principal's remote buckets. Reports are cached per
//! principal; a forced refresh always recomputes.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::cache::ReportCache;
use super::now_millis;
use super::report::{ReportBuilder, UsageReport};
use crate::catalog::FileCatalog;
use crate::config::Config;
use crate::errors::InsightsError;
use crate::remote::RemoteLister;
use crate::vault::CredentialVault;

/// Per-call options for `compute_report`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Skip the cache and recompute
    pub force_refresh: bool,
    /// Fold remote objects into the report when connected
    pub include_external: bool,
}

/// Limits applied to one report
#[derive(Debug, Clone)]
struct ReportLimits {
    capacity_bytes: u64,
    object_ceiling: usize,
    top_n: usize,
    recent_window: Duration,
    timeout: Duration,
}

/// Computes and caches usage reports
pub struct UsageAggregator {
    catalog: Arc<dyn FileCatalog>,
    vault: Arc<CredentialVault>,
    lister: RemoteLister,
    cache: ReportCache,
    limits: ReportLimits,
}

impl UsageAggregator {
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
            cache: ReportCache::new(config.report_ttl),
            limits: ReportLimits {
                capacity_bytes: config.capacity_bytes,
                object_ceiling: config.report_object_ceiling,
                top_n: config.top_n,
                recent_window: config.recent_window,
                timeout: config.compute_timeout,
            },
        }
    }

    /// Report cache, for invalidation on connect/disconnect
    pub fn cache(&self) -> &ReportCache {
        &self.cache
    }

    /// Compute (or serve from cache) the usage report for a principal
    ///
    /// Local-data failures and timeouts are returned as errors and leave the
    /// cache untouched. Remote failures only mark the report partial.
    pub async fn compute_report(
        &self,
        principal: &str,
        options: ReportOptions,
    ) -> Result<Arc<UsageReport>, InsightsError> {
        if !options.force_refresh {
            if let Some(report) = self.cache.get(principal, options.include_external) {
                debug!(principal = principal, "Serving cached usage report");
                return Ok(report);
            }
        }

        let epoch = self.cache.epoch();
        let started = std::time::Instant::now();
        let report = tokio::time::timeout(
            self.limits.timeout,
            self.build(principal, options.include_external),
        )
        .await
        .map_err(|_| {
            error!(principal = principal, timeout = ?self.limits.timeout, "Usage report timed out");
            InsightsError::Timeout(self.limits.timeout)
        })??;

        let report = Arc::new(report);
        self.cache
            .insert(principal, options.include_external, epoch, Arc::clone(&report));

        info!(
            principal = principal,
            files = report.counts.files,
            used_bytes = report.used_bytes,
            partial = report.partial,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Computed usage report"
        );
        Ok(report)
    }

    async fn build(
        &self,
        principal: &str,
        include_external: bool,
    ) -> Result<UsageReport, InsightsError> {
        let files = self.catalog.list_files_by_owner(principal).await?;
        let folders = self.catalog.list_folders_by_owner(principal).await?;

        let now = now_millis();
        let cutoff = now.saturating_sub(self.limits.recent_window.as_millis() as u64);
        let mut builder = ReportBuilder::new(cutoff, self.limits.top_n);

        for file in &files {
            builder.add_local_file(file);
        }
        for folder in &folders {
            builder.add_local_folder(folder);
        }

        let mut partial = false;
        let mut folded_remote = false;
        if include_external {
            match self.vault.get(principal).filter(|c| c.is_well_formed()) {
                Some(credential) => {
                    let outcome = self
                        .lister
                        .traverse(&credential, self.limits.object_ceiling, |bucket, object| {
                            builder.add_remote_object(bucket, object)
                        })
                        .await;
                    partial = outcome.partial;
                    folded_remote = true;
                }
                None => debug!(principal = principal, "Not connected, local data only"),
            }
        }

        Ok(builder.finish(self.limits.capacity_bytes, partial, folded_remote, now))
    }
}
