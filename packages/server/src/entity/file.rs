use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Name of the disk holding the blob.
    pub disk: String,

    /// Disk-relative path of the blob. Unique per disk.
    pub pathname: String,

    /// Display filename.
    pub name: String,

    /// Owner entity type (e.g. "post", "user").
    pub owner_type: Option<String>,

    /// Owner entity ID (canonical string form).
    pub owner_id: Option<String>,

    /// Relation name on the owner (e.g. "avatar", "attachments").
    pub collection: Option<String>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
