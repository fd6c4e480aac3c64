//! Local record types

use serde::{Deserialize, Serialize};

/// A file tracked by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFileRecord {
    /// Owning principal
    pub owner: String,
    /// Display name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Stored MIME type
    #[serde(default)]
    pub mime_type: String,
    /// Whether the file is shared with others
    #[serde(default)]
    pub shared: bool,
    /// Upload timestamp in milliseconds since epoch
    pub uploaded_at: u64,
    /// Bucket holding the object, if any
    #[serde(default)]
    pub bucket: Option<String>,
    /// Object key within the bucket
    #[serde(default)]
    pub key: String,
}

impl LocalFileRecord {
    /// Storage location label used in the location distribution
    pub fn location(&self) -> &str {
        self.bucket.as_deref().unwrap_or(LOCAL_LOCATION)
    }
}

/// Location label for files not tied to a bucket
pub const LOCAL_LOCATION: &str = "local";

/// A folder tracked by the persistence layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFolderRecord {
    /// Owning principal
    pub owner: String,
    /// Display name
    pub name: String,
    /// Parent folder name, None at the root
    #[serde(default)]
    pub parent: Option<String>,
    /// Whether the folder is shared with others
    #[serde(default)]
    pub shared: bool,
    /// Creation timestamp in milliseconds since epoch
    #[serde(default)]
    pub created_at: u64,
}
