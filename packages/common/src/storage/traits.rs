use std::collections::HashMap;
use std::io::Cursor;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Access level requested for a stored blob.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Per-write options forwarded to the backend.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub visibility: Visibility,
    /// Content type declared by the writer, if known.
    pub content_type: Option<String>,
}

/// Path-addressed blob storage. Every disk is one implementation of this trait.
///
/// Paths are relative to the disk root and use `/` as separator.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write `data` at `path`, replacing anything already there.
    async fn put(&self, path: &str, data: &[u8], options: &PutOptions)
    -> Result<(), StorageError>;

    /// Retrieve all bytes stored at `path`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.read_stream(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Open the blob at `path` as a streaming reader.
    async fn read_stream(&self, path: &str) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete the blob at `path`.
    ///
    /// Fails with [`StorageError::NotFound`] when nothing is stored there.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Size of the blob in bytes.
    async fn size(&self, path: &str) -> Result<u64, StorageError>;

    /// MIME type of the stored blob, sniffed from its leading bytes with a
    /// fallback on the path extension.
    async fn mime_type(&self, path: &str) -> Result<Option<String>, StorageError> {
        let mut reader = self.read_stream(path).await?;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        (&mut reader).take(SNIFF_LEN as u64).read_to_end(&mut head).await?;
        Ok(detect_mime_type(path, &head))
    }

    /// Public URL of the blob.
    fn url(&self, path: &str) -> Result<String, StorageError>;

    /// Time-limited URL of the blob.
    async fn temporary_url(
        &self,
        _path: &str,
        _expires_at: SystemTime,
        _options: &HashMap<String, String>,
    ) -> Result<String, StorageError> {
        Err(StorageError::Unsupported("temporary URLs"))
    }
}

/// Number of leading bytes inspected by content sniffing.
pub(crate) const SNIFF_LEN: usize = 8192;

/// Detect a MIME type from content with a fallback to the path extension.
pub(crate) fn detect_mime_type(path: &str, head: &[u8]) -> Option<String> {
    if let Some(kind) = infer::get(head) {
        return Some(kind.mime_type().to_string());
    }

    mime_guess::from_path(path).first().map(|m| m.to_string())
}

/// Join a public base URL and a disk-relative path.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Reject absolute paths and `..` segments.
pub(crate) fn check_path(path: &str) -> Result<(), StorageError> {
    let trimmed = path.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed.contains('\\')
        || trimmed.contains('\0')
        || trimmed.split('/').any(|segment| segment == "..")
    {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}

pub(crate) fn cursor_reader(data: Vec<u8>) -> BoxReader {
    Box::new(Cursor::new(data))
}
