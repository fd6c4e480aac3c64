//! Credential Vault Implementation
//!
//! A sharded map of per-principal credentials with absolute expiry.
//! Two independent eviction paths keep it correct and bounded:
//! - lazy: `get` removes an expired entry it finds, so no caller ever sees one
//! - periodic: `sweep` (driven by `start_sweeper`) removes entries never read again

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use super::credential::Credential;
use crate::config::MAX_TTL;

/// A stored credential and the instant it stops being valid
#[derive(Clone, Debug)]
pub struct CredentialEntry {
    pub credential: Credential,
    pub expires_at: Instant,
}

impl CredentialEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Per-principal credential store with TTL expiry
pub struct CredentialVault {
    /// Entries by principal
    entries: DashMap<String, CredentialEntry>,
    /// TTL applied when `set` is not given one
    default_ttl: Duration,
    /// Background sweep task, if started
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl CredentialVault {
    /// Create an empty vault
    ///
    /// # Arguments
    /// * `default_ttl` - Lifetime of entries stored without an explicit TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            sweeper: Mutex::new(None),
        }
    }

    /// Store or replace the credential for a principal
    ///
    /// TTLs beyond `MAX_TTL` are clamped to it.
    pub fn set(&self, principal: &str, credential: Credential, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl).min(MAX_TTL);
        let entry = CredentialEntry {
            credential,
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(principal.to_string(), entry);
        debug!(principal = principal, ttl_secs = ttl.as_secs(), "Stored credential");
    }

    /// Get the credential for a principal if present and unexpired
    ///
    /// An expired entry is removed as a side effect. Missing and expired
    /// are indistinguishable to the caller.
    pub fn get(&self, principal: &str) -> Option<Credential> {
        let now = Instant::now();
        {
            let entry = self.entries.get(principal)?;
            if !entry.is_expired(now) {
                return Some(entry.credential.clone());
            }
        }

        // Only remove if still expired; a concurrent set may have replaced it
        if self
            .entries
            .remove_if(principal, |_, entry| entry.is_expired(now))
            .is_some()
        {
            debug!(principal = principal, "Evicted expired credential on read");
        }
        None
    }

    /// Whether `get` would return a well-formed credential
    pub fn has(&self, principal: &str) -> bool {
        self.get(principal)
            .map(|credential| credential.is_well_formed())
            .unwrap_or(false)
    }

    /// Remove a principal's credential, returning whether one existed
    pub fn delete(&self, principal: &str) -> bool {
        let existed = self.entries.remove(principal).is_some();
        debug!(principal = principal, existed = existed, "Deleted credential");
        existed
    }

    /// Remove every expired entry, returning how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        trace!(removed = removed, remaining = self.entries.len(), "Credential sweep");
        removed
    }

    /// Number of stored entries, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start the periodic sweep on the current tokio runtime
    ///
    /// The task holds only a weak reference, so dropping the vault ends it.
    /// Calling this again replaces the previous sweeper.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) {
        let vault: Weak<Self> = Arc::downgrade(self);
        let interval = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(strong) = vault.upgrade() else {
                    break;
                };
                let removed = strong.sweep();
                if removed > 0 {
                    info!(removed = removed, "Swept expired credentials");
                }
            }
        });

        let mut sweeper = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = sweeper.replace(task) {
            previous.abort();
        }
        debug!(interval_secs = interval.as_secs(), "Credential sweeper started");
    }

    /// Stop the sweeper and drop every stored credential
    pub fn shutdown(&self) {
        let task = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }

        let cleared = self.entries.len();
        self.entries.clear();
        info!(cleared = cleared, "Credential vault shut down");
    }
}

impl Drop for CredentialVault {
    fn drop(&mut self) {
        if let Some(task) = self
            .sweeper
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.abort();
        }
    }
}
