use serde::Serialize;

use crate::files::{FileError, Files, StoredFile};

/// Public representation of a stored file.
///
/// Storage location and owner linkage are never exposed.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    /// Record ID.
    #[schema(example = 42)]
    pub id: i32,
    /// Where the file can be fetched.
    #[schema(example = "/api/v1/temp-files/42/report.pdf")]
    pub url: String,
    /// Size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    /// Display filename.
    #[schema(example = "report.pdf")]
    pub name: String,
    /// Display filename without extension.
    #[schema(example = "report")]
    pub basename: String,
    /// Extension of the stored file.
    #[schema(example = "pdf")]
    pub extension: Option<String>,
}

impl FileResponse {
    /// Snapshot a saved record. Size and URL are read from its disk.
    pub async fn from_record(record: &dyn StoredFile, files: &Files) -> Result<Self, FileError> {
        let id = record
            .id()
            .ok_or_else(|| FileError::Logic("Cannot describe an unsaved file".into()))?;

        Ok(Self {
            id,
            url: record.url(files)?,
            size: record.size(files).await?,
            name: record.name().unwrap_or_default().to_string(),
            basename: record.basename().unwrap_or_default().to_string(),
            extension: record.extension().map(str::to_owned),
        })
    }
}
