use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "temp_files")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub disk: String,

    /// Session identity of the uploader.
    pub uuid: String,

    pub pathname: String,

    pub name: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
