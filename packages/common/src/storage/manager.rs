use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::error::StorageError;
use super::filesystem::FilesystemDisk;
use super::memory::MemoryDisk;
use super::traits::StorageBackend;
use crate::config::{DiskConfig, StorageConfig};

/// Registry of named disks.
#[derive(Clone, Default)]
pub struct DiskManager {
    disks: HashMap<String, Arc<dyn StorageBackend>>,
}

impl DiskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every disk declared in `config`.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut manager = Self::new();
        for (name, disk) in &config.disks {
            let backend: Arc<dyn StorageBackend> = match disk {
                DiskConfig::Local {
                    root,
                    url,
                    max_size,
                } => Arc::new(FilesystemDisk::new(root.clone(), url.clone(), *max_size).await?),
                DiskConfig::Memory { url } => Arc::new(MemoryDisk::new(url.clone())),
            };
            info!(disk = %name, "Registered storage disk");
            manager.disks.insert(name.clone(), backend);
        }
        Ok(manager)
    }

    /// Register (or replace) a disk under `name`.
    pub fn with_disk(mut self, name: impl Into<String>, disk: Arc<dyn StorageBackend>) -> Self {
        self.disks.insert(name.into(), disk);
        self
    }

    /// Look up a disk by name.
    pub fn disk(&self, name: &str) -> Result<Arc<dyn StorageBackend>, StorageError> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDisk(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.disks.keys().map(String::as_str)
    }
}
