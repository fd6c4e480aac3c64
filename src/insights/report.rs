//! Usage report types and the fold that builds them
//!
//! Local records and remote objects are folded into one `ReportBuilder`.
//! Every fold is a sum, a count, or a bounded top-N insert, so folding order
//! does not change the totals.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;

use crate::catalog::{LocalFileRecord, LocalFolderRecord};
use crate::classify::{classify_key, classify_mime, FileCategory, SizeBucket};
use crate::remote::{BucketDescriptor, RemoteObject};

/// Where an item in the report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemSource {
    Local,
    Remote,
}

/// One file or object in the largest / recent lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub name: String,
    pub key: String,
    pub size: u64,
    pub category: FileCategory,
    pub location: String,
    /// Milliseconds since epoch
    pub modified_at: u64,
    pub source: ItemSource,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounts {
    /// Local files plus remote objects examined
    pub files: u64,
    pub folders: u64,
    pub shared: u64,
    pub local_files: u64,
    pub remote_objects: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSlice {
    pub category: FileCategory,
    pub label: &'static str,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeSlice {
    pub bucket: SizeBucket,
    pub label: &'static str,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSlice {
    pub location: String,
    pub count: u64,
    pub bytes: u64,
}

/// Merged usage analytics for one principal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub usage_pct: f64,
    pub counts: UsageCounts,
    /// Non-empty categories, largest first
    pub by_type: Vec<TypeSlice>,
    /// Every size bucket, ascending, including empty ones
    pub by_size: Vec<SizeSlice>,
    /// Storage locations, largest first
    pub by_location: Vec<LocationSlice>,
    pub largest: Vec<ItemSummary>,
    pub recent: Vec<ItemSummary>,
    /// Remote portion cut short by the budget or a failure
    pub partial: bool,
    pub include_external: bool,
    /// Milliseconds since epoch
    pub refreshed_at: u64,
}

/// Percentage of capacity in use, rounded to two decimals
pub fn usage_percent(used: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    let pct = used as f64 / capacity as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Heap entry: ordered by key, earlier insertions win ties
struct Ranked {
    key: u64,
    seq: u64,
    item: ItemSummary,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Keeps the `limit` highest-keyed items without buffering the rest
struct TopN {
    limit: usize,
    seq: u64,
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl TopN {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seq: 0,
            heap: BinaryHeap::with_capacity(limit + 1),
        }
    }

    fn offer(&mut self, key: u64, item: impl FnOnce() -> ItemSummary) {
        if self.limit == 0 {
            return;
        }
        let seq = self.seq;
        self.seq += 1;

        if self.heap.len() < self.limit {
            self.heap.push(Reverse(Ranked { key, seq, item: item() }));
            return;
        }

        let beats_min = match self.heap.peek() {
            Some(Reverse(min)) => key > min.key,
            None => true,
        };
        if beats_min {
            self.heap.pop();
            self.heap.push(Reverse(Ranked { key, seq, item: item() }));
        }
    }

    /// Items in descending key order
    fn into_sorted(self) -> Vec<ItemSummary> {
        let mut ranked: Vec<Ranked> = self.heap.into_iter().map(|Reverse(r)| r).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        ranked.into_iter().map(|r| r.item).collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    count: u64,
    bytes: u64,
}

impl Tally {
    fn add(&mut self, bytes: u64) {
        self.count += 1;
        self.bytes += bytes;
    }
}

/// Accumulates one aggregation run
pub(crate) struct ReportBuilder {
    recent_cutoff: u64,
    used_bytes: u64,
    counts: UsageCounts,
    by_type: HashMap<FileCategory, Tally>,
    by_size: HashMap<SizeBucket, Tally>,
    by_location: HashMap<String, Tally>,
    largest: TopN,
    recent: TopN,
}

impl ReportBuilder {
    /// # Arguments
    /// * `recent_cutoff` - Items modified before this (ms since epoch) are not "recent"
    /// * `top_n` - Length of the largest and recent lists
    pub fn new(recent_cutoff: u64, top_n: usize) -> Self {
        Self {
            recent_cutoff,
            used_bytes: 0,
            counts: UsageCounts::default(),
            by_type: HashMap::new(),
            by_size: HashMap::new(),
            by_location: HashMap::new(),
            largest: TopN::new(top_n),
            recent: TopN::new(top_n),
        }
    }

    pub fn add_local_file(&mut self, file: &LocalFileRecord) {
        let mut category = classify_mime(&file.mime_type);
        if category == FileCategory::Other && file.mime_type.trim().is_empty() {
            category = classify_key(&file.name);
        }

        self.counts.local_files += 1;
        if file.shared {
            self.counts.shared += 1;
        }

        let key = if file.key.is_empty() { &file.name } else { &file.key };
        self.fold(
            category,
            file.location(),
            file.size,
            file.uploaded_at,
            || ItemSummary {
                name: file.name.clone(),
                key: key.clone(),
                size: file.size,
                category,
                location: file.location().to_string(),
                modified_at: file.uploaded_at,
                source: ItemSource::Local,
            },
        );
    }

    pub fn add_local_folder(&mut self, folder: &LocalFolderRecord) {
        self.counts.folders += 1;
        if folder.shared {
            self.counts.shared += 1;
        }
    }

    pub fn add_remote_object(&mut self, bucket: &BucketDescriptor, object: &RemoteObject) {
        let category = classify_key(&object.key);
        self.counts.remote_objects += 1;

        self.fold(
            category,
            &bucket.name,
            object.size,
            object.last_modified,
            || ItemSummary {
                name: object.base_name().to_string(),
                key: object.key.clone(),
                size: object.size,
                category,
                location: bucket.name.clone(),
                modified_at: object.last_modified,
                source: ItemSource::Remote,
            },
        );
    }

    fn fold<F>(&mut self, category: FileCategory, location: &str, size: u64, modified_at: u64, item: F)
    where
        F: Fn() -> ItemSummary,
    {
        self.counts.files += 1;
        self.used_bytes += size;
        self.by_type.entry(category).or_default().add(size);
        self.by_size.entry(SizeBucket::of(size)).or_default().add(size);
        match self.by_location.get_mut(location) {
            Some(tally) => tally.add(size),
            None => {
                let mut tally = Tally::default();
                tally.add(size);
                self.by_location.insert(location.to_string(), tally);
            }
        }

        self.largest.offer(size, &item);
        if modified_at >= self.recent_cutoff {
            self.recent.offer(modified_at, &item);
        }
    }

    pub fn finish(
        self,
        capacity_bytes: u64,
        partial: bool,
        include_external: bool,
        refreshed_at: u64,
    ) -> UsageReport {
        let mut by_type: Vec<TypeSlice> = FileCategory::ALL
            .iter()
            .filter_map(|category| {
                self.by_type.get(category).map(|tally| TypeSlice {
                    category: *category,
                    label: category.label(),
                    count: tally.count,
                    bytes: tally.bytes,
                })
            })
            .collect();
        by_type.sort_by(|a, b| b.bytes.cmp(&a.bytes).then(a.category.cmp(&b.category)));

        let by_size = SizeBucket::ALL
            .iter()
            .map(|bucket| {
                let tally = self.by_size.get(bucket).copied().unwrap_or_default();
                SizeSlice {
                    bucket: *bucket,
                    label: bucket.label(),
                    count: tally.count,
                    bytes: tally.bytes,
                }
            })
            .collect();

        let mut by_location: Vec<LocationSlice> = self
            .by_location
            .into_iter()
            .map(|(location, tally)| LocationSlice {
                location,
                count: tally.count,
                bytes: tally.bytes,
            })
            .collect();
        by_location.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.location.cmp(&b.location)));

        UsageReport {
            capacity_bytes,
            used_bytes: self.used_bytes,
            available_bytes: capacity_bytes.saturating_sub(self.used_bytes),
            usage_pct: usage_percent(self.used_bytes, capacity_bytes),
            counts: self.counts,
            by_type,
            by_size,
            by_location,
            largest: self.largest.into_sorted(),
            recent: self.recent.into_sorted(),
            partial,
            include_external,
            refreshed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, size: u64, mime: &str, uploaded_at: u64) -> LocalFileRecord {
        LocalFileRecord {
            owner: "alice".to_string(),
            name: name.to_string(),
            size,
            mime_type: mime.to_string(),
            shared: false,
            uploaded_at,
            bucket: None,
            key: String::new(),
        }
    }

    fn bucket(name: &str) -> BucketDescriptor {
        BucketDescriptor {
            id: format!("id-{}", name),
            name: name.to_string(),
            kind: String::new(),
        }
    }

    #[test]
    fn test_local_totals() {
        let mut builder = ReportBuilder::new(0, 10);
        for (i, size) in [10u64, 20, 30].into_iter().enumerate() {
            builder.add_local_file(&file(&format!("f{}.txt", i), size, "text/plain", 1));
        }
        let report = builder.finish(1000, false, false, 5);

        assert_eq!(report.used_bytes, 60);
        assert_eq!(report.available_bytes, 940);
        assert_eq!(report.counts.files, 3);
        assert_eq!(report.usage_pct, 6.0);
        assert_eq!(report.by_type.len(), 1);
        assert_eq!(report.by_type[0].category, FileCategory::Document);
        assert_eq!(report.by_location[0].location, "local");
        assert_eq!(report.refreshed_at, 5);
    }

    #[test]
    fn test_size_buckets_exhaustive() {
        let mut builder = ReportBuilder::new(0, 10);
        let sizes = [0u64, 5_000, 20_000, 2_000_000, 500_000_000, 2_000_000_000, 9];
        for (i, size) in sizes.iter().enumerate() {
            builder.add_local_file(&file(&format!("f{}", i), *size, "", 1));
        }
        let report = builder.finish(u64::MAX, false, false, 0);

        assert_eq!(report.by_size.len(), SizeBucket::ALL.len());
        let total: u64 = report.by_size.iter().map(|s| s.count).sum();
        assert_eq!(total, sizes.len() as u64);
        assert_eq!(report.by_size[0].count, 3);
        assert_eq!(report.by_size[4].count, 1);
    }

    #[test]
    fn test_largest_keeps_top_n_descending() {
        let mut builder = ReportBuilder::new(0, 3);
        for size in [5u64, 50, 1, 40, 30, 60] {
            builder.add_local_file(&file(&format!("s{}", size), size, "", 1));
        }
        let report = builder.finish(1000, false, false, 0);
        let sizes: Vec<u64> = report.largest.iter().map(|i| i.size).collect();
        assert_eq!(sizes, vec![60, 50, 40]);
    }

    #[test]
    fn test_largest_ties_keep_first_seen() {
        let mut builder = ReportBuilder::new(0, 1);
        builder.add_local_file(&file("first", 10, "", 1));
        builder.add_local_file(&file("second", 10, "", 1));
        let report = builder.finish(1000, false, false, 0);
        assert_eq!(report.largest[0].name, "first");
    }

    #[test]
    fn test_recent_respects_window() {
        let mut builder = ReportBuilder::new(1_000, 10);
        builder.add_local_file(&file("old", 1, "", 999));
        builder.add_local_file(&file("new", 1, "", 2_000));
        builder.add_local_file(&file("newer", 1, "", 3_000));
        let report = builder.finish(1000, false, false, 0);

        let names: Vec<&str> = report.recent.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "new"]);
    }

    #[test]
    fn test_remote_objects_merge_into_same_model() {
        let mut builder = ReportBuilder::new(0, 10);
        builder.add_local_file(&file("a.jpg", 100, "image/jpeg", 1));
        builder.add_remote_object(
            &bucket("photos"),
            &RemoteObject {
                key: "2024/b.png".to_string(),
                size: 300,
                last_modified: 2,
                version_id: None,
            },
        );
        let report = builder.finish(1000, false, true, 0);

        assert_eq!(report.counts.files, 2);
        assert_eq!(report.counts.local_files, 1);
        assert_eq!(report.counts.remote_objects, 1);
        assert_eq!(report.used_bytes, 400);
        assert_eq!(report.by_type[0].category, FileCategory::Image);
        assert_eq!(report.by_type[0].count, 2);
        assert_eq!(report.by_location[0].location, "photos");
        assert_eq!(report.largest[0].name, "b.png");
        assert_eq!(report.largest[0].source, ItemSource::Remote);
    }

    #[test]
    fn test_shared_and_folders() {
        let mut builder = ReportBuilder::new(0, 10);
        let mut shared = file("s.txt", 1, "text/plain", 1);
        shared.shared = true;
        builder.add_local_file(&shared);
        builder.add_local_folder(&LocalFolderRecord {
            owner: "alice".to_string(),
            name: "photos".to_string(),
            parent: None,
            shared: true,
            created_at: 0,
        });
        let report = builder.finish(1000, false, false, 0);
        assert_eq!(report.counts.folders, 1);
        assert_eq!(report.counts.shared, 2);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(usage_percent(0, 0), 0.0);
        assert_eq!(usage_percent(1, 3), 33.33);
        assert_eq!(usage_percent(200, 100), 200.0);
    }
}
