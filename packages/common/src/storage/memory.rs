use async_trait::async_trait;
use dashmap::DashMap;

use super::error::StorageError;
use super::traits::{
    BoxReader, PutOptions, SNIFF_LEN, StorageBackend, check_path, cursor_reader,
    detect_mime_type, join_url,
};

struct MemoryBlob {
    data: Vec<u8>,
    content_type: Option<String>,
}

/// Process-local disk keeping every blob in memory.
#[derive(Default)]
pub struct MemoryDisk {
    blobs: DashMap<String, MemoryBlob>,
    url: Option<String>,
}

impl MemoryDisk {
    pub fn new(url: Option<String>) -> Self {
        Self {
            blobs: DashMap::new(),
            url,
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryDisk {
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        options: &PutOptions,
    ) -> Result<(), StorageError> {
        check_path(path)?;
        self.blobs.insert(
            path.to_string(),
            MemoryBlob {
                data: data.to_vec(),
                content_type: options.content_type.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        check_path(path)?;
        self.blobs
            .get(path)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn read_stream(&self, path: &str) -> Result<BoxReader, StorageError> {
        Ok(cursor_reader(self.get(path).await?))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        check_path(path)?;
        Ok(self.blobs.contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        check_path(path)?;
        self.blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn size(&self, path: &str) -> Result<u64, StorageError> {
        check_path(path)?;
        self.blobs
            .get(path)
            .map(|blob| blob.data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn mime_type(&self, path: &str) -> Result<Option<String>, StorageError> {
        check_path(path)?;
        let blob = self
            .blobs
            .get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))?;
        if let Some(declared) = &blob.content_type {
            return Ok(Some(declared.clone()));
        }
        let head = &blob.data[..blob.data.len().min(SNIFF_LEN)];
        Ok(detect_mime_type(path, head))
    }

    fn url(&self, path: &str) -> Result<String, StorageError> {
        check_path(path)?;
        Ok(join_url(self.url.as_deref().unwrap_or("/storage"), path))
    }
}
