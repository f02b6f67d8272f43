//! File records backed by named disks.
//!
//! A record is created exactly once through `put`/`store`: the content is
//! normalized, written to a freshly generated path, and only then may the
//! record be saved. Deleting a record removes its blob as well.

mod content;
mod error;
mod mime;
mod owner;
mod record;
mod relation;
mod temp;

use std::path::PathBuf;
use std::sync::Arc;

use common::StorageConfig;
use common::storage::{DiskManager, StorageBackend};

pub use content::{Contents, Normalized, UploadedFile, disposition_filename};
pub use error::FileError;
pub use mime::{DefaultMimeRegistry, MimeRegistry, sniff};
pub use owner::{HasFiles, Owner, OwnerRef};
pub use record::{FileAttributes, FileEntity, FileRecord, StoredFile};
pub use relation::{Cardinality, FileRelation};
pub use temp::TempFileRecord;

/// Everything the file core needs from its environment.
#[derive(Clone)]
pub struct Files {
    disks: DiskManager,
    mime: Option<Arc<dyn MimeRegistry>>,
    default_disk: String,
    temp_disk: String,
    temp_url: String,
    scratch_dir: PathBuf,
}

impl Files {
    pub fn new(disks: DiskManager, config: &StorageConfig) -> Self {
        Self {
            disks,
            mime: Some(Arc::new(DefaultMimeRegistry)),
            default_disk: config.default_disk.clone(),
            temp_disk: config.temp_disk.clone(),
            temp_url: config.temp_url.clone(),
            scratch_dir: config
                .scratch_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Build the disks declared in `config` and wrap them.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, FileError> {
        let disks = DiskManager::from_config(config).await?;
        Ok(Self::new(disks, config))
    }

    /// Replace the MIME registry. `None` leaves content-type guessing unavailable.
    pub fn with_mime_registry(mut self, registry: Option<Arc<dyn MimeRegistry>>) -> Self {
        self.mime = registry;
        self
    }

    pub fn disk(&self, name: &str) -> Result<Arc<dyn StorageBackend>, FileError> {
        Ok(self.disks.disk(name)?)
    }

    pub fn default_disk(&self) -> &str {
        &self.default_disk
    }

    pub fn temp_disk(&self) -> &str {
        &self.temp_disk
    }

    pub fn temp_url(&self) -> &str {
        &self.temp_url
    }

    fn mime_registry(&self) -> Result<&Arc<dyn MimeRegistry>, FileError> {
        self.mime.as_ref().ok_or_else(|| {
            FileError::Configuration(
                "cannot guess content types: no MIME registry is configured".into(),
            )
        })
    }

    /// MIME type of raw content, `None` when unrecognized.
    pub async fn guess_contents_type(&self, contents: &[u8]) -> Result<Option<String>, FileError> {
        let registry = self.mime_registry()?;
        sniff(registry.clone(), &self.scratch_dir, contents).await
    }

    /// Default extension for a MIME type, `None` when unknown.
    pub fn guess_extension(&self, mime_type: &str) -> Result<Option<String>, FileError> {
        let registry = self.mime_registry()?;
        Ok(registry.extensions(mime_type).into_iter().next())
    }
}
