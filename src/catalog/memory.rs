//! In-memory catalog
//!
//! Holds records grouped by owner. The daemon loads it from a JSON manifest.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::types::{LocalFileRecord, LocalFolderRecord};
use super::{CatalogError, FileCatalog};

/// On-disk manifest shape
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    files: Vec<LocalFileRecord>,
    #[serde(default)]
    folders: Vec<LocalFolderRecord>,
}

#[derive(Debug, Default)]
struct OwnerRecords {
    files: Vec<LocalFileRecord>,
    folders: Vec<LocalFolderRecord>,
}

/// Catalog backed by an in-process map
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    owners: RwLock<HashMap<String, OwnerRecords>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load records from a JSON manifest (`{"files": [...], "folders": [...]}`)
    ///
    /// A missing file yields an empty catalog.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::new();

        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No catalog manifest, starting empty");
                return Ok(catalog);
            }
            Err(e) => return Err(e.into()),
        };

        let manifest: Manifest = serde_json::from_slice(&data)?;
        let (files, folders) = (manifest.files.len(), manifest.folders.len());
        for file in manifest.files {
            catalog.insert_file(file);
        }
        for folder in manifest.folders {
            catalog.insert_folder(folder);
        }

        info!(path = %path.display(), files = files, folders = folders, "Loaded catalog manifest");
        Ok(catalog)
    }

    pub fn insert_file(&self, file: LocalFileRecord) {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        owners.entry(file.owner.clone()).or_default().files.push(file);
    }

    pub fn insert_folder(&self, folder: LocalFolderRecord) {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        owners
            .entry(folder.owner.clone())
            .or_default()
            .folders
            .push(folder);
    }
}

#[async_trait]
impl FileCatalog for MemoryCatalog {
    async fn list_files_by_owner(
        &self,
        principal: &str,
    ) -> Result<Vec<LocalFileRecord>, CatalogError> {
        let owners = self.owners.read().unwrap_or_else(|e| e.into_inner());
        let files = owners
            .get(principal)
            .map(|records| records.files.clone())
            .unwrap_or_default();
        debug!(principal = principal, count = files.len(), "Listed local files");
        Ok(files)
    }

    async fn list_folders_by_owner(
        &self,
        principal: &str,
    ) -> Result<Vec<LocalFolderRecord>, CatalogError> {
        let owners = self.owners.read().unwrap_or_else(|e| e.into_inner());
        Ok(owners
            .get(principal)
            .map(|records| records.folders.clone())
            .unwrap_or_default())
    }
}
