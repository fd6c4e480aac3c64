//! Remote listing types
//!
//! Transport-neutral bucket/object/page types, plus the B2 wire shapes they
//! are decoded from.

use serde::{Deserialize, Deserializer, Serialize};

/// A bucket visible to a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketDescriptor {
    pub id: String,
    pub name: String,
    /// Visibility, e.g. "allPrivate"
    #[serde(default)]
    pub kind: String,
}

/// An object as seen in a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Full object key within the bucket
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last-modified time in milliseconds since epoch
    pub last_modified: u64,
    /// Store-specific identifier, needed for deletion on B2
    pub version_id: Option<String>,
}

impl RemoteObject {
    /// Zero-byte placeholders with a trailing slash stand in for folders
    pub fn is_folder_marker(&self) -> bool {
        self.key.ends_with('/')
    }

    /// Last component of the key
    pub fn base_name(&self) -> &str {
        let name = self.key.trim_end_matches('/');
        name.rsplit('/').next().unwrap_or(name)
    }
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<RemoteObject>,
    /// Where the next page resumes
    pub next_token: Option<String>,
    /// More objects remain after this page
    pub truncated: bool,
}

/// Deserialize a number that might be encoded as a string or null.
/// B2 sometimes returns numeric fields as strings (e.g. "1536964279000")
/// and null for folder entries.
fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// File entry from b2_list_file_names
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2FileEntry {
    pub file_name: String,
    #[serde(deserialize_with = "deserialize_flexible_u64")]
    pub content_length: u64,
    #[serde(deserialize_with = "deserialize_flexible_u64")]
    pub upload_timestamp: u64,
    #[serde(default)]
    pub file_id: Option<String>,
}

impl From<B2FileEntry> for RemoteObject {
    fn from(entry: B2FileEntry) -> Self {
        Self {
            key: entry.file_name,
            size: entry.content_length,
            last_modified: entry.upload_timestamp,
            version_id: entry.file_id,
        }
    }
}

/// Response from b2_list_file_names
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2ListFilesResponse {
    pub files: Vec<B2FileEntry>,
    pub next_file_name: Option<String>,
}

impl From<B2ListFilesResponse> for ObjectPage {
    fn from(response: B2ListFilesResponse) -> Self {
        Self {
            objects: response.files.into_iter().map(RemoteObject::from).collect(),
            truncated: response.next_file_name.is_some(),
            next_token: response.next_file_name,
        }
    }
}

/// Bucket entry from b2_list_buckets
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2Bucket {
    pub bucket_id: String,
    pub bucket_name: String,
    #[serde(default)]
    pub bucket_type: String,
}

impl From<B2Bucket> for BucketDescriptor {
    fn from(bucket: B2Bucket) -> Self {
        Self {
            id: bucket.bucket_id,
            name: bucket.bucket_name,
            kind: bucket.bucket_type,
        }
    }
}

/// Response from b2_list_buckets
#[derive(Debug, Deserialize)]
pub struct B2ListBucketsResponse {
    pub buckets: Vec<B2Bucket>,
}
