use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::PutOptions;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{instrument, warn};

use super::Files;
use super::content::Contents;
use super::error::FileError;
use super::record::{FileEntity, StoredFile, ensure_blob_exists, remove_blob};
use crate::entity::temp_file;
use crate::utils::response::encode_path_segment;

/// An upload staged on the temp disk, visible only to the session that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFileRecord {
    pub id: Option<i32>,
    pub disk: String,
    /// Session identity of the uploader.
    pub uuid: String,
    pub pathname: String,
    pub name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FileEntity for TempFileRecord {
    const TABLE: &'static str = "temp_files";
    const TEMPORARY: bool = true;
}

impl TempFileRecord {
    /// Unsaved record on the temp disk owned by `session`.
    pub fn new(files: &Files, session: impl Into<String>) -> Self {
        Self {
            id: None,
            disk: files.temp_disk().to_string(),
            uuid: session.into(),
            pathname: String::new(),
            name: None,
            created_at: None,
        }
    }

    /// Store `contents` at the temp disk root for `session` and persist the record.
    #[instrument(skip(db, files, contents))]
    pub async fn stage<C: ConnectionTrait>(
        db: &C,
        files: &Files,
        contents: Contents<'_>,
        session: &str,
    ) -> Result<Self, FileError> {
        let mut record = Self::new(files, session);
        record
            .put(files, contents, "", &PutOptions::default())
            .await?;

        if let Err(e) = record.save(db, files).await {
            if let Err(cleanup) = remove_blob(&record, files).await {
                warn!(error = %cleanup, pathname = %record.pathname, "Failed to remove unsaved blob");
            }
            return Err(e);
        }
        Ok(record)
    }

    /// Persist a new record. Fails when its blob is missing from the disk.
    pub async fn save<C: ConnectionTrait>(&mut self, db: &C, files: &Files) -> Result<(), FileError> {
        ensure_blob_exists(&*self, files).await?;

        let model = temp_file::ActiveModel {
            disk: Set(self.disk.clone()),
            uuid: Set(self.uuid.clone()),
            pathname: Set(self.pathname.clone()),
            name: Set(self.name.clone().unwrap_or_default()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        self.id = Some(model.id);
        self.created_at = Some(model.created_at);
        Ok(())
    }

    /// Delete the row, then the blob. A blob that is already gone is not an error.
    pub async fn delete<C: ConnectionTrait>(self, db: &C, files: &Files) -> Result<(), FileError> {
        if let Some(id) = self.id {
            temp_file::Entity::delete_by_id(id).exec(db).await?;
        }
        remove_blob(&self, files).await
    }

    /// The staged record matching all of `id`, `name` and `session`.
    ///
    /// Any mismatch yields the same [`FileError::NotFound`].
    pub async fn find_for_session<C: ConnectionTrait>(
        db: &C,
        id: i32,
        name: &str,
        session: &str,
    ) -> Result<Self, FileError> {
        temp_file::Entity::find()
            .filter(temp_file::Column::Id.eq(id))
            .filter(temp_file::Column::Name.eq(name))
            .filter(temp_file::Column::Uuid.eq(session))
            .one(db)
            .await?
            .map(Self::from)
            .ok_or(FileError::NotFound)
    }
}

impl From<temp_file::Model> for TempFileRecord {
    fn from(model: temp_file::Model) -> Self {
        Self {
            id: Some(model.id),
            disk: model.disk,
            uuid: model.uuid,
            pathname: model.pathname,
            name: Some(model.name),
            created_at: Some(model.created_at),
        }
    }
}

#[async_trait]
impl StoredFile for TempFileRecord {
    fn id(&self) -> Option<i32> {
        self.id
    }

    fn disk(&self) -> &str {
        &self.disk
    }

    fn pathname(&self) -> &str {
        &self.pathname
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_location(&mut self, name: String, pathname: String) {
        self.name = Some(name);
        self.pathname = pathname;
    }

    /// Staged files are served by the fetch route, never straight from the disk.
    fn url(&self, files: &Files) -> Result<String, FileError> {
        let id = self.id.ok_or_else(|| {
            FileError::Logic("Temporary file has no URL before it is saved".into())
        })?;
        Ok(format!(
            "{}/{}/{}",
            files.temp_url().trim_end_matches('/'),
            id,
            encode_path_segment(self.name().unwrap_or_default())
        ))
    }
}
