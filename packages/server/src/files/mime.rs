use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use super::error::FileError;

/// Content-type knowledge used when a file arrives without a usable name.
pub trait MimeRegistry: Send + Sync {
    /// Sniff the MIME type of the file at `path` from its content.
    fn guess_mime_type(&self, path: &Path) -> std::io::Result<Option<String>>;

    /// Known extensions for `mime_type`, preferred first.
    fn extensions(&self, mime_type: &str) -> Vec<String>;
}

/// Extensions that win over whatever order the lookup table returns.
const PREFERRED_EXTENSIONS: &[(&str, &str)] = &[
    ("text/plain", "txt"),
    ("image/jpeg", "jpeg"),
    ("image/svg+xml", "svg"),
    ("audio/mpeg", "mp3"),
    ("application/octet-stream", "bin"),
];

/// Magic-byte sniffing via `infer`, extension lookup via `mime_guess`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultMimeRegistry;

impl MimeRegistry for DefaultMimeRegistry {
    fn guess_mime_type(&self, path: &Path) -> std::io::Result<Option<String>> {
        if let Some(kind) = infer::get_from_path(path)? {
            return Ok(Some(kind.mime_type().to_string()));
        }

        // infer can't detect plain text via magic bytes.
        let data = std::fs::read(path)?;
        if !data.is_empty() && !data.contains(&0) && std::str::from_utf8(&data).is_ok() {
            return Ok(Some("text/plain".to_string()));
        }

        Ok(None)
    }

    fn extensions(&self, mime_type: &str) -> Vec<String> {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        let Some(known) = mime_guess::get_mime_extensions_str(&mime_type) else {
            return Vec::new();
        };

        let mut extensions: Vec<String> = known.iter().map(|ext| ext.to_string()).collect();

        let preferred = PREFERRED_EXTENSIONS
            .iter()
            .find(|(mime, _)| *mime == mime_type)
            .map(|(_, ext)| *ext)
            .or_else(|| {
                mime_type
                    .split_once('/')
                    .map(|(_, subtype)| subtype.split('+').next().unwrap_or(subtype))
            });

        if let Some(preferred) = preferred
            && let Some(pos) = extensions.iter().position(|ext| ext == preferred)
        {
            let ext = extensions.remove(pos);
            extensions.insert(0, ext);
        }

        extensions
    }
}

/// Sniff `contents` by writing them to a uniquely named scratch file.
///
/// The registry runs on the blocking pool. The scratch file is removed before
/// returning, whether sniffing succeeded or not.
pub async fn sniff(
    registry: Arc<dyn MimeRegistry>,
    scratch_dir: &Path,
    contents: &[u8],
) -> Result<Option<String>, FileError> {
    let scratch = scratch_dir.join(format!("tether-sniff-{}", Uuid::new_v4()));

    let result = async {
        tokio::fs::write(&scratch, contents).await?;
        let path = scratch.clone();
        let mime = tokio::task::spawn_blocking(move || registry.guess_mime_type(&path))
            .await
            .map_err(|e| std::io::Error::other(format!("MIME sniffing task failed: {e}")))??;
        Ok::<_, FileError>(mime)
    }
    .await;

    // Best effort.
    let _ = tokio::fs::remove_file(&scratch).await;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R',
    ];

    fn scratch_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn sniffs_png_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let mime = sniff(Arc::new(DefaultMimeRegistry), dir.path(), PNG).await.unwrap();
        assert_eq!(mime.as_deref(), Some("image/png"));
        assert_eq!(scratch_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn unknown_binary_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let mime = sniff(Arc::new(DefaultMimeRegistry), dir.path(), &[0, 159, 146, 150])
            .await
            .unwrap();
        assert_eq!(mime, None);
        assert_eq!(scratch_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn text_is_plain() {
        let dir = tempfile::tempdir().unwrap();
        let mime = sniff(Arc::new(DefaultMimeRegistry), dir.path(), b"just some notes\n")
            .await
            .unwrap();
        assert_eq!(mime.as_deref(), Some("text/plain"));
    }

    struct FailingRegistry;

    impl MimeRegistry for FailingRegistry {
        fn guess_mime_type(&self, path: &Path) -> std::io::Result<Option<String>> {
            assert!(path.exists());
            Err(std::io::Error::other("sniffer crashed"))
        }

        fn extensions(&self, _mime_type: &str) -> Vec<String> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn scratch_removed_when_sniffing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = sniff(Arc::new(FailingRegistry), dir.path(), b"data").await;
        assert!(matches!(result, Err(FileError::Io(_))));
        assert_eq!(scratch_entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn concurrent_sniffs_use_distinct_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                sniff(Arc::new(DefaultMimeRegistry), &path, PNG).await
            }));
        }
        for handle in handles {
            let mime = handle.await.unwrap().unwrap();
            assert_eq!(mime.as_deref(), Some("image/png"));
        }
        assert_eq!(scratch_entries(dir.path()), 0);
    }

    #[test]
    fn default_extensions() {
        let registry = DefaultMimeRegistry;
        assert_eq!(registry.extensions("image/png").first().map(String::as_str), Some("png"));
        assert_eq!(
            registry.extensions("application/pdf").first().map(String::as_str),
            Some("pdf")
        );
        assert_eq!(registry.extensions("text/plain").first().map(String::as_str), Some("txt"));
        assert!(registry.extensions("application/x-made-up").is_empty());
    }
}
