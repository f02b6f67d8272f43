use std::collections::HashMap;
use std::path::PathBuf;

use common::storage::BoxReader;
use tokio::io::AsyncReadExt;

use super::Files;
use super::error::FileError;
use super::record::StoredFile;
use crate::utils::filename::{RANDOM_LENGTH, random_string};

/// An uploaded file as received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub contents: Vec<u8>,
    /// Filename reported by the client.
    pub original_name: String,
}

/// Content accepted by `put`.
pub enum Contents<'a> {
    /// Raw bytes with no name attached.
    Bytes(Vec<u8>),
    /// A byte stream with transport metadata such as `Content-Disposition`.
    Stream {
        reader: BoxReader,
        metadata: HashMap<String, String>,
    },
    /// Another record, copied by content.
    Record(&'a dyn StoredFile),
    /// A client upload carrying its original filename.
    Upload(UploadedFile),
    /// A file on the local filesystem.
    File(PathBuf),
}

impl From<Vec<u8>> for Contents<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for Contents<'_> {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<UploadedFile> for Contents<'_> {
    fn from(upload: UploadedFile) -> Self {
        Self::Upload(upload)
    }
}

impl std::fmt::Debug for Contents<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Stream { metadata, .. } => f
                .debug_struct("Stream")
                .field("metadata", metadata)
                .finish_non_exhaustive(),
            Self::Record(record) => write!(f, "Record({})", record.pathname()),
            Self::Upload(upload) => write!(f, "Upload({})", upload.original_name),
            Self::File(path) => write!(f, "File({})", path.display()),
        }
    }
}

/// Resolved payload and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub bytes: Vec<u8>,
    pub name: String,
}

/// The `filename` parameter of a `Content-Disposition` style value.
pub fn disposition_filename(value: &str) -> Option<String> {
    value
        .split(';')
        .filter_map(|segment| segment.trim().split_once('='))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("filename"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .next_back()
}

impl Contents<'_> {
    /// Resolve the bytes and display name of this content.
    ///
    /// `current_name` is the display name already set on the target record
    /// and always wins.
    pub async fn normalize(
        self,
        files: &Files,
        current_name: Option<&str>,
    ) -> Result<Normalized, FileError> {
        let (bytes, carried_name) = match self {
            Self::Bytes(bytes) => (bytes, None),
            Self::Stream {
                mut reader,
                metadata,
            } => {
                let name = metadata
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case("content-disposition"))
                    .and_then(|(_, value)| disposition_filename(value))
                    .filter(|name| !name.is_empty());
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes).await?;
                (bytes, name)
            }
            Self::Record(record) => {
                let bytes = record.contents(files).await?;
                (bytes, record.name().map(str::to_owned))
            }
            Self::Upload(upload) => (upload.contents, Some(upload.original_name)),
            Self::File(path) => {
                let bytes = tokio::fs::read(&path).await?;
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                (bytes, name)
            }
        };

        let name = match current_name.map(str::to_owned).or(carried_name) {
            Some(name) => name,
            None => generated_name(files, &bytes).await?,
        };

        Ok(Normalized { bytes, name })
    }
}

/// Random base name plus an extension guessed from the content.
async fn generated_name(files: &Files, bytes: &[u8]) -> Result<String, FileError> {
    let extension = match files.guess_contents_type(bytes).await? {
        Some(mime_type) => files.guess_extension(&mime_type)?,
        None => None,
    };

    let basename = random_string(RANDOM_LENGTH);
    Ok(match extension {
        Some(ext) => format!("{basename}.{ext}"),
        None => basename,
    })
}
