//! Budgeted remote listing
//!
//! `PageCursor` walks one bucket page by page and can be dropped at any point,
//! so a listing is never buffered whole. `RemoteLister::traverse` drives
//! cursors across every visible bucket under a shared object budget.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use super::errors::RemoteError;
use super::types::{BucketDescriptor, ObjectPage, RemoteObject};
use super::ObjectStore;
use crate::vault::Credential;

/// Cursor over the pages of one bucket listing
pub struct PageCursor<'a> {
    store: &'a dyn ObjectStore,
    credential: &'a Credential,
    bucket: &'a BucketDescriptor,
    prefix: Option<&'a str>,
    page_size: u32,
    token: Option<String>,
    exhausted: bool,
}

impl<'a> PageCursor<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        credential: &'a Credential,
        bucket: &'a BucketDescriptor,
        prefix: Option<&'a str>,
        page_size: u32,
    ) -> Self {
        Self {
            store,
            credential,
            bucket,
            prefix,
            page_size,
            token: None,
            exhausted: false,
        }
    }

    /// Fetch the next page, or None once the bucket is exhausted
    pub async fn next_page(&mut self) -> Result<Option<ObjectPage>, RemoteError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_objects_page(
                self.bucket,
                self.prefix,
                self.credential,
                self.token.as_deref(),
                self.page_size,
            )
            .await?;

        // A truncated page without a token cannot be resumed
        match (&page.next_token, page.truncated) {
            (Some(token), true) => self.token = Some(token.clone()),
            _ => self.exhausted = true,
        }

        Ok(Some(page))
    }

    /// Whether another page may follow
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }
}

/// Ceiling on remote objects examined in one run
///
/// Charging is atomic so concurrent bucket walks can share one budget.
#[derive(Debug)]
pub struct TraversalBudget {
    ceiling: usize,
    used: AtomicUsize,
}

impl TraversalBudget {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            used: AtomicUsize::new(0),
        }
    }

    /// Take one unit, returning false once the ceiling is reached
    pub fn try_charge(&self) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.ceiling).then_some(used + 1)
            })
            .is_ok()
    }

    pub fn is_exhausted(&self) -> bool {
        self.used.load(Ordering::Acquire) >= self.ceiling
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }
}

/// Summary of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalOutcome {
    /// Buckets listed by the credential
    pub buckets: usize,
    /// Objects folded into the caller's aggregate
    pub objects: usize,
    /// Bytes across those objects
    pub bytes: u64,
    /// Pages fetched
    pub pages: usize,
    /// Buckets whose listing failed
    pub failed_buckets: Vec<String>,
    /// Stopped early by the budget or a failure
    pub partial: bool,
}

/// Drives budgeted listings against an object store
#[derive(Clone)]
pub struct RemoteLister {
    store: Arc<dyn ObjectStore>,
    page_size: u32,
}

impl RemoteLister {
    pub fn new(store: Arc<dyn ObjectStore>, page_size: u32) -> Self {
        Self { store, page_size }
    }

    /// Walk every bucket visible to `credential`, calling `visit` per object
    ///
    /// At most `ceiling` objects are visited. Folder markers are skipped and
    /// not charged. A failing bucket is logged and skipped; traversal goes on
    /// with the next one. Either early stop sets `partial`.
    pub async fn traverse<F>(
        &self,
        credential: &Credential,
        ceiling: usize,
        mut visit: F,
    ) -> TraversalOutcome
    where
        F: FnMut(&BucketDescriptor, &RemoteObject) + Send,
    {
        let mut outcome = TraversalOutcome::default();
        let budget = TraversalBudget::new(ceiling);

        let buckets = match self.store.list_buckets(credential).await {
            Ok(buckets) => buckets,
            Err(e) => {
                warn!(error = %e, "Failed to list buckets, skipping remote data");
                outcome.partial = true;
                return outcome;
            }
        };
        outcome.buckets = buckets.len();

        'buckets: for bucket in &buckets {
            if budget.is_exhausted() {
                warn!(ceiling = ceiling, bucket = %bucket.name, "Object budget spent before bucket");
                outcome.partial = true;
                break;
            }

            let mut cursor =
                PageCursor::new(self.store.as_ref(), credential, bucket, None, self.page_size);

            loop {
                let page = match cursor.next_page().await {
                    Ok(Some(page)) => page,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(bucket = %bucket.name, error = %e, "Bucket listing failed, continuing");
                        outcome.failed_buckets.push(bucket.name.clone());
                        outcome.partial = true;
                        continue 'buckets;
                    }
                };
                outcome.pages += 1;

                for object in page.objects.iter().filter(|o| !o.is_folder_marker()) {
                    if !budget.try_charge() {
                        warn!(ceiling = ceiling, bucket = %bucket.name, "Object budget reached mid-page");
                        outcome.partial = true;
                        break 'buckets;
                    }
                    outcome.objects += 1;
                    outcome.bytes += object.size;
                    visit(bucket, object);
                }

                if budget.is_exhausted() && cursor.has_more() {
                    warn!(ceiling = ceiling, bucket = %bucket.name, "Object budget reached, more pages remain");
                    outcome.partial = true;
                    break 'buckets;
                }
            }
        }

        debug!(
            buckets = outcome.buckets,
            objects = outcome.objects,
            pages = outcome.pages,
            partial = outcome.partial,
            "Remote traversal finished"
        );
        outcome
    }
}
