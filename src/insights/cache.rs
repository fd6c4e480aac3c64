//! Report Cache Implementation
//!
//! Short-lived memoization of usage reports using Moka, so repeated dashboard
//! loads skip the remote traversal entirely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::{debug, trace};

use super::now_millis;
use super::report::UsageReport;
use crate::config::MAX_TTL;

/// Cache key: reports with and without remote data are kept apart
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
struct ReportKey {
    principal: String,
    include_external: bool,
}

impl ReportKey {
    fn new(principal: &str, include_external: bool) -> Self {
        Self {
            principal: principal.to_string(),
            include_external,
        }
    }
}

/// Per-principal report cache with a fixed TTL
///
/// Age is measured from the report's `refreshed_at`, not from insertion, so
/// time spent computing counts against the TTL.
pub struct ReportCache {
    reports: Cache<ReportKey, Arc<UsageReport>>,
    ttl: Duration,
    /// Bumped by every invalidation; inserts computed under an older epoch are dropped
    epoch: AtomicU64,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        let ttl = ttl.min(MAX_TTL);
        let reports = Cache::builder()
            .time_to_live(ttl)
            .name("usage_report_cache")
            .build();

        Self {
            reports,
            ttl,
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Current invalidation epoch, read before computing a report
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Get a fresh report, if one is cached
    pub fn get(&self, principal: &str, include_external: bool) -> Option<Arc<UsageReport>> {
        let key = ReportKey::new(principal, include_external);

        match self.reports.get(&key) {
            Some(report) if self.is_fresh(&report) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(principal = principal, "Cache HIT for usage report");
                Some(report)
            }
            Some(_) => {
                self.reports.invalidate(&key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(principal = principal, "Cache entry for usage report went stale");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(principal = principal, "Cache MISS for usage report");
                None
            }
        }
    }

    /// Store a report computed for `include_external` under `epoch`
    ///
    /// Returns false, storing nothing, if an invalidation happened since
    /// `epoch` was read.
    pub fn insert(
        &self,
        principal: &str,
        include_external: bool,
        epoch: u64,
        report: Arc<UsageReport>,
    ) -> bool {
        if self.epoch() != epoch {
            debug!(principal = principal, "Discarding report computed before invalidation");
            return false;
        }
        self.reports
            .insert(ReportKey::new(principal, include_external), report);
        debug!(principal = principal, "Cached usage report");
        true
    }

    /// Drop every cached report for a principal
    pub fn invalidate(&self, principal: &str) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        for include_external in [false, true] {
            self.reports
                .invalidate(&ReportKey::new(principal, include_external));
        }
        debug!(principal = principal, "Invalidated cached reports");
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.reports.invalidate_all();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Cleared report cache");
    }

    /// Returns (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }

    fn is_fresh(&self, report: &UsageReport) -> bool {
        let age_ms = now_millis().saturating_sub(report.refreshed_at);
        u128::from(age_ms) < self.ttl.as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::report::ReportBuilder;

    fn report_at(include_external: bool, refreshed_at: u64) -> Arc<UsageReport> {
        Arc::new(ReportBuilder::new(0, 10).finish(100, false, include_external, refreshed_at))
    }

    fn report(include_external: bool) -> Arc<UsageReport> {
        report_at(include_external, now_millis())
    }

    #[test]
    fn test_cache_hit_miss() {
        let cache = ReportCache::new(Duration::from_secs(600));
        assert!(cache.get("alice", false).is_none());

        assert!(cache.insert("alice", false, cache.epoch(), report(false)));
        assert!(cache.get("alice", false).is_some());
        // Keyed by the external flag too
        assert!(cache.get("alice", true).is_none());

        let (hits, misses, _) = cache.stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 2);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ReportCache::new(Duration::from_millis(20));
        cache.insert("alice", false, cache.epoch(), report(false));
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("alice", false).is_none());
    }

    #[test]
    fn test_age_counts_from_refreshed_at() {
        let cache = ReportCache::new(Duration::from_secs(1));
        // Computed 1.5 s ago, inserted just now
        let old = report_at(false, now_millis() - 1500);
        cache.insert("alice", false, cache.epoch(), old);
        assert!(cache.get("alice", false).is_none());
    }

    #[test]
    fn test_insert_after_invalidate_is_dropped() {
        let cache = ReportCache::new(Duration::from_secs(600));
        let epoch = cache.epoch();
        cache.invalidate("alice");

        assert!(!cache.insert("alice", true, epoch, report(true)));
        assert!(cache.get("alice", true).is_none());

        assert!(cache.insert("alice", true, cache.epoch(), report(true)));
        assert!(cache.get("alice", true).is_some());
    }

    #[test]
    fn test_invalidate_principal_only() {
        let cache = ReportCache::new(Duration::from_secs(600));
        cache.insert("alice", false, cache.epoch(), report(false));
        cache.insert("alice", true, cache.epoch(), report(true));
        cache.insert("bob", false, cache.epoch(), report(false));

        cache.invalidate("alice");
        assert!(cache.get("alice", false).is_none());
        assert!(cache.get("alice", true).is_none());
        assert!(cache.get("bob", false).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ReportCache::new(Duration::from_secs(600));
        cache.insert("alice", false, cache.epoch(), report(false));
        cache.clear();
        assert!(cache.get("alice", false).is_none());
        let (hits, misses, _) = cache.stats();
        assert_eq!((hits, misses), (0, 1));
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let cache = ReportCache::new(Duration::MAX);
        cache.insert("alice", false, cache.epoch(), report(false));
        assert!(cache.get("alice", false).is_some());
    }
}
