use std::time::Duration;

use sea_orm::sea_query::{Index, IndexCreateStatement, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::entity::{file, temp_file};

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    // Set connection pool options
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;
    sync_schema(&db).await?;

    Ok(db)
}

/// Create or update the tables of every registered entity, then their indexes.
pub async fn sync_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    db.get_schema_registry("tether_server::entity::*")
        .sync(db)
        .await?;
    ensure_indexes(db).await
}

/// Ensure required database indexes exist.
///
/// Schema-sync doesn't create composite indexes, so they are added here. The
/// generated SQL is quoted the way both Postgres and SQLite accept.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Pathnames are unique per disk.
    create_index(
        db,
        "idx_files_disk_pathname",
        Index::create()
            .unique()
            .table(file::Entity)
            .col(file::Column::Disk)
            .col(file::Column::Pathname)
            .to_owned(),
        true,
    )
    .await?;

    create_index(
        db,
        "idx_temp_files_disk_pathname",
        Index::create()
            .unique()
            .table(temp_file::Entity)
            .col(temp_file::Column::Disk)
            .col(temp_file::Column::Pathname)
            .to_owned(),
        true,
    )
    .await?;

    // Relation lookups:
    // SELECT * FROM files WHERE owner_type = ? AND owner_id = ? AND collection = ?
    create_index(
        db,
        "idx_files_owner",
        Index::create()
            .table(file::Entity)
            .col(file::Column::OwnerType)
            .col(file::Column::OwnerId)
            .to_owned(),
        false,
    )
    .await
}

/// Run one `CREATE INDEX`. Failures of optional indexes are only logged.
async fn create_index(
    db: &DatabaseConnection,
    name: &str,
    mut stmt: IndexCreateStatement,
    required: bool,
) -> Result<(), DbErr> {
    let sql = stmt
        .if_not_exists()
        .name(name)
        .to_string(PostgresQueryBuilder);

    match db.execute_unprepared(&sql).await {
        Ok(_) => {
            info!("Ensured index {} exists", name);
            Ok(())
        }
        Err(e) if required => Err(e),
        Err(e) => {
            warn!("Failed to create index {}: {}", name, e);
            Ok(())
        }
    }
}
