use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::storage::{BoxReader, PutOptions, Visibility};
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectionTrait, EntityTrait, Set};
use tracing::{debug, instrument, warn};

use super::Files;
use super::content::Contents;
use super::error::FileError;
use super::owner::OwnerRef;
use crate::entity::file;
use crate::utils::filename::{generate_pathname, split_dir_filename, split_name};

/// Compile-time facts about a persisted file kind.
pub trait FileEntity {
    /// Backing table.
    const TABLE: &'static str;
    /// Staged uploads can never be the target of an ownership relation.
    const TEMPORARY: bool;
}

/// Fillable attributes of a new record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAttributes {
    /// Display name. When unset it is derived from the content.
    pub name: Option<String>,
    pub visibility: Visibility,
}

impl FileAttributes {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub(crate) fn put_options(&self) -> PutOptions {
        PutOptions {
            visibility: self.visibility,
            content_type: None,
        }
    }
}

/// Behaviour shared by every record that points at a blob.
///
/// Derived values (`size`, `mime_type`, `url`, ...) are read from the disk
/// on every call and never cached.
#[async_trait]
pub trait StoredFile: Send + Sync {
    fn id(&self) -> Option<i32>;

    fn disk(&self) -> &str;

    /// Disk-relative path. Empty until content has been stored.
    fn pathname(&self) -> &str;

    /// Display name. `None` until set or derived from content.
    fn name(&self) -> Option<&str>;

    /// Record where the content was written.
    fn set_location(&mut self, name: String, pathname: String);

    /// Extension of the stored path.
    fn extension(&self) -> Option<&str> {
        split_name(self.pathname()).1
    }

    /// Display name without its extension.
    fn basename(&self) -> Option<&str> {
        self.name().map(|name| split_name(name).0)
    }

    /// Directory of the stored path, `""` at the disk root.
    fn dir(&self) -> &str {
        split_dir_filename(self.pathname()).0
    }

    fn url(&self, files: &Files) -> Result<String, FileError> {
        Ok(files.disk(self.disk())?.url(self.pathname())?)
    }

    async fn size(&self, files: &Files) -> Result<u64, FileError> {
        Ok(files.disk(self.disk())?.size(self.pathname()).await?)
    }

    async fn mime_type(&self, files: &Files) -> Result<Option<String>, FileError> {
        Ok(files.disk(self.disk())?.mime_type(self.pathname()).await?)
    }

    async fn exists(&self, files: &Files) -> Result<bool, FileError> {
        if self.pathname().is_empty() {
            return Ok(false);
        }
        Ok(files.disk(self.disk())?.exists(self.pathname()).await?)
    }

    async fn contents(&self, files: &Files) -> Result<Vec<u8>, FileError> {
        Ok(files.disk(self.disk())?.get(self.pathname()).await?)
    }

    async fn read_stream(&self, files: &Files) -> Result<BoxReader, FileError> {
        Ok(files.disk(self.disk())?.read_stream(self.pathname()).await?)
    }

    async fn temporary_url(
        &self,
        files: &Files,
        expires_at: SystemTime,
        options: &HashMap<String, String>,
    ) -> Result<String, FileError> {
        Ok(files
            .disk(self.disk())?
            .temporary_url(self.pathname(), expires_at, options)
            .await?)
    }

    /// Normalize `contents`, write them under `dir` and remember the location.
    ///
    /// Nothing is persisted; call `save` afterwards.
    async fn put(
        &mut self,
        files: &Files,
        contents: Contents<'_>,
        dir: &str,
        options: &PutOptions,
    ) -> Result<(), FileError> {
        let current = self.name().map(str::to_owned);
        let normalized = contents.normalize(files, current.as_deref()).await?;

        let pathname = generate_pathname(&normalized.name, dir);
        debug!(disk = %self.disk(), %pathname, name = %normalized.name, "Storing file");

        files
            .disk(self.disk())?
            .put(&pathname, &normalized.bytes, options)
            .await?;

        self.set_location(normalized.name, pathname);
        Ok(())
    }
}

/// Refuse to persist metadata for a blob that is not on its disk.
pub(crate) async fn ensure_blob_exists(
    record: &(impl StoredFile + ?Sized),
    files: &Files,
) -> Result<(), FileError> {
    if !record.exists(files).await? {
        return Err(FileError::Logic(format!(
            "File does not exist on \"{}\" disk at path \"{}\"",
            record.disk(),
            record.pathname()
        )));
    }
    Ok(())
}

/// Delete the blob behind `record`, treating an already absent blob as done.
pub(crate) async fn remove_blob(
    record: &(impl StoredFile + ?Sized),
    files: &Files,
) -> Result<(), FileError> {
    if record.pathname().is_empty() {
        return Ok(());
    }

    match files.disk(record.disk())?.delete(record.pathname()).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            warn!(disk = %record.disk(), pathname = %record.pathname(), "Blob already absent");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// A permanent file, optionally linked to an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: Option<i32>,
    pub disk: String,
    pub pathname: String,
    pub name: Option<String>,
    pub owner: Option<OwnerRef>,
    /// Relation name on the owner.
    pub collection: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl FileEntity for FileRecord {
    const TABLE: &'static str = "files";
    const TEMPORARY: bool = false;
}

impl FileRecord {
    /// Unsaved record on `disk`.
    pub fn new(disk: impl Into<String>, attributes: FileAttributes) -> Self {
        Self {
            id: None,
            disk: disk.into(),
            pathname: String::new(),
            name: attributes.name,
            owner: None,
            collection: None,
            created_at: None,
        }
    }

    /// New record with `contents` written under `dir`. Not persisted.
    pub async fn store(
        files: &Files,
        disk: &str,
        contents: Contents<'_>,
        attributes: FileAttributes,
        dir: &str,
    ) -> Result<Self, FileError> {
        let options = attributes.put_options();
        let mut record = Self::new(disk, attributes);
        record.put(files, contents, dir, &options).await?;
        Ok(record)
    }

    pub async fn find<C: ConnectionTrait>(db: &C, id: i32) -> Result<Option<Self>, FileError> {
        Ok(file::Entity::find_by_id(id).one(db).await?.map(Self::from))
    }

    /// Persist the record. Fails when its blob is missing from the disk.
    #[instrument(skip(self, db, files), fields(disk = %self.disk, pathname = %self.pathname))]
    pub async fn save<C: ConnectionTrait>(&mut self, db: &C, files: &Files) -> Result<(), FileError> {
        ensure_blob_exists(&*self, files).await?;

        let name = self.name.clone().unwrap_or_default();
        let owner_type = self.owner.as_ref().map(|o| o.owner_type.clone());
        let owner_id = self.owner.as_ref().map(|o| o.owner_id.clone());

        let model = match self.id {
            Some(id) => {
                file::ActiveModel {
                    id: ActiveValue::Unchanged(id),
                    name: Set(name),
                    owner_type: Set(owner_type),
                    owner_id: Set(owner_id),
                    collection: Set(self.collection.clone()),
                    ..Default::default()
                }
                .update(db)
                .await?
            }
            None => {
                file::ActiveModel {
                    disk: Set(self.disk.clone()),
                    pathname: Set(self.pathname.clone()),
                    name: Set(name),
                    owner_type: Set(owner_type),
                    owner_id: Set(owner_id),
                    collection: Set(self.collection.clone()),
                    created_at: Set(Utc::now()),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };

        self.id = Some(model.id);
        self.created_at = Some(model.created_at);
        Ok(())
    }

    /// Delete the row, then the blob. A blob that is already gone is not an error.
    #[instrument(skip(self, db, files), fields(id = ?self.id, pathname = %self.pathname))]
    pub async fn delete<C: ConnectionTrait>(self, db: &C, files: &Files) -> Result<(), FileError> {
        if let Some(id) = self.id {
            file::Entity::delete_by_id(id).exec(db).await?;
        }
        remove_blob(&self, files).await
    }
}

impl From<file::Model> for FileRecord {
    fn from(model: file::Model) -> Self {
        let owner = match (model.owner_type, model.owner_id) {
            (Some(owner_type), Some(owner_id)) => Some(OwnerRef {
                owner_type,
                owner_id,
            }),
            _ => None,
        };

        Self {
            id: Some(model.id),
            disk: model.disk,
            pathname: model.pathname,
            name: Some(model.name),
            owner,
            collection: model.collection,
            created_at: Some(model.created_at),
        }
    }
}

#[async_trait]
impl StoredFile for FileRecord {
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
}
