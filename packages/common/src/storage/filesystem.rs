use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};

use super::error::StorageError;
use super::traits::{
    BoxReader, PutOptions, StorageBackend, Visibility, check_path, join_url,
};

/// Local filesystem disk.
///
/// Blobs live at `{root}/{path}`. Writes go through `{root}/.tmp` and are
/// renamed into place so readers never observe a partial file.
pub struct FilesystemDisk {
    root: PathBuf,
    url: Option<String>,
    max_size: Option<u64>,
}

impl FilesystemDisk {
    /// Create a new filesystem disk rooted at `root`.
    pub async fn new(
        root: PathBuf,
        url: Option<String>,
        max_size: Option<u64>,
    ) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self {
            root,
            url,
            max_size,
        })
    }

    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        check_path(path)?;
        Ok(self.root.join(path.trim()))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    fn not_found(path: &str, err: std::io::Error) -> StorageError {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemDisk {
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        options: &PutOptions,
    ) -> Result<(), StorageError> {
        let target = self.full_path(path)?;

        if let Some(limit) = self.max_size
            && data.len() as u64 > limit
        {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit,
            });
        }

        let temp_path = self.temp_path();
        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = match options.visibility {
                Visibility::Public => 0o644,
                Visibility::Private => 0o600,
            };
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(mode)).await?;
        }
        #[cfg(not(unix))]
        let _ = options;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn read_stream(&self, path: &str) -> Result<BoxReader, StorageError> {
        let target = self.full_path(path)?;
        match fs::File::open(&target).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) => Err(Self::not_found(path, e)),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.full_path(path)?;
        Ok(fs::try_exists(&target).await?)
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.full_path(path)?;
        fs::remove_file(&target)
            .await
            .map_err(|e| Self::not_found(path, e))
    }

    async fn size(&self, path: &str) -> Result<u64, StorageError> {
        let target = self.full_path(path)?;
        match fs::metadata(&target).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) => Err(Self::not_found(path, e)),
        }
    }

    fn url(&self, path: &str) -> Result<String, StorageError> {
        check_path(path)?;
        let base = self.url.as_deref().unwrap_or("/storage");
        Ok(join_url(base, path))
    }
}
