use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::files::Files;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub files: Files,
    pub config: Arc<AppConfig>,
}
