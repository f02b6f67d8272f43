use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Select};
use tracing::{debug, instrument, warn};

use super::Files;
use super::content::Contents;
use super::error::FileError;
use super::owner::{Owner, to_snake_case};
use super::record::{FileAttributes, FileEntity, FileRecord, StoredFile, remove_blob};
use super::temp::TempFileRecord;
use crate::entity::file;

/// How many files a relation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Storing adds a record.
    Many,
    /// Storing replaces whatever the relation held.
    One,
}

type PathResolver<O> = Box<dyn Fn(&O) -> String + Send + Sync>;

/// Files attached to one owner under a named collection.
pub struct FileRelation<'o, O: Owner> {
    owner: &'o O,
    collection: String,
    cardinality: Cardinality,
    disk: Option<String>,
    resolver: Option<PathResolver<O>>,
}

impl<'o, O: Owner> FileRelation<'o, O> {
    /// Declare a relation targeting `R`.
    ///
    /// Staged uploads cannot be owned, so a temporary `R` is rejected here
    /// before anything touches a disk or the database.
    pub fn new<R: FileEntity>(
        owner: &'o O,
        collection: impl Into<String>,
        cardinality: Cardinality,
    ) -> Result<Self, FileError> {
        if R::TEMPORARY {
            return Err(FileError::Logic(format!(
                "Records of \"{}\" are temporary and cannot be the target of a relation",
                R::TABLE
            )));
        }

        Ok(Self {
            owner,
            collection: collection.into(),
            cardinality,
            disk: None,
            resolver: None,
        })
    }

    /// Store on `disk` instead of the default disk.
    pub fn disk(mut self, disk: impl Into<String>) -> Self {
        self.disk = Some(disk.into());
        self
    }

    /// Derive the storage directory from the owner with `resolver`.
    pub fn path(mut self, resolver: impl Fn(&O) -> String + Send + Sync + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Target disk name.
    pub fn disk_name<'a>(&'a self, files: &'a Files) -> &'a str {
        self.disk.as_deref().unwrap_or(files.default_disk())
    }

    /// Directory new files are stored under.
    pub fn resolve_path(&self) -> String {
        match &self.resolver {
            Some(resolve) => resolve(self.owner),
            None => format!(
                "{}/{}",
                to_snake_case(self.owner.table_name()),
                self.owner.owner_key()
            ),
        }
    }

    fn query(&self) -> Select<file::Entity> {
        file::Entity::find()
            .filter(file::Column::OwnerType.eq(self.owner.owner_type()))
            .filter(file::Column::OwnerId.eq(self.owner.owner_key()))
            .filter(file::Column::Collection.eq(self.collection.as_str()))
    }

    /// All records in the relation, oldest first.
    pub async fn get<C: ConnectionTrait>(&self, db: &C) -> Result<Vec<FileRecord>, FileError> {
        let models = self.query().order_by_asc(file::Column::Id).all(db).await?;
        Ok(models.into_iter().map(FileRecord::from).collect())
    }

    /// Newest record in the relation.
    pub async fn first<C: ConnectionTrait>(&self, db: &C) -> Result<Option<FileRecord>, FileError> {
        let model = self.query().order_by_desc(file::Column::Id).one(db).await?;
        Ok(model.map(FileRecord::from))
    }

    /// Store `contents` as a new record of this relation and persist it.
    ///
    /// For [`Cardinality::One`] the previous records are deleted once the new
    /// one is saved, so a failed store leaves the old file untouched.
    #[instrument(skip_all, fields(
        owner_type = %self.owner.owner_type(),
        owner_id = %self.owner.owner_key(),
        collection = %self.collection,
    ))]
    pub async fn store<C: ConnectionTrait>(
        &self,
        db: &C,
        files: &Files,
        contents: Contents<'_>,
        attributes: FileAttributes,
    ) -> Result<FileRecord, FileError> {
        let options = attributes.put_options();
        let mut record = FileRecord::new(self.disk_name(files), attributes);
        record.owner = Some(self.owner.owner_ref());
        record.collection = Some(self.collection.clone());

        record
            .put(files, contents, &self.resolve_path(), &options)
            .await?;

        if let Err(e) = record.save(db, files).await {
            if let Err(cleanup) = remove_blob(&record, files).await {
                warn!(error = %cleanup, pathname = %record.pathname, "Failed to remove unsaved blob");
            }
            return Err(e);
        }

        if self.cardinality == Cardinality::One {
            for previous in self.get(db).await? {
                if previous.id != record.id {
                    debug!(id = ?previous.id, "Replacing previous file");
                    previous.delete(db, files).await?;
                }
            }
        }

        Ok(record)
    }

    /// Move a staged upload into this relation.
    ///
    /// The content and display name are copied, then the staged record and
    /// its blob are deleted.
    pub async fn attach<C: ConnectionTrait>(
        &self,
        db: &C,
        files: &Files,
        staged: TempFileRecord,
    ) -> Result<FileRecord, FileError> {
        let attributes = FileAttributes {
            name: staged.name().map(str::to_owned),
            ..FileAttributes::default()
        };
        let record = self
            .store(db, files, Contents::Record(&staged), attributes)
            .await?;
        staged.delete(db, files).await?;
        Ok(record)
    }

    /// Delete every record in the relation. Returns how many were removed.
    pub async fn delete_all<C: ConnectionTrait>(
        &self,
        db: &C,
        files: &Files,
    ) -> Result<usize, FileError> {
        let records = self.get(db).await?;
        let count = records.len();
        for record in records {
            record.delete(db, files).await?;
        }
        Ok(count)
    }
}
