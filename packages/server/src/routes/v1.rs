use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/temp-files", temp_file_routes(config))
}

fn temp_file_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::temp_file::upload_temp_file))
        .layer(handlers::temp_file::upload_body_limit(
            config.upload.max_size,
        ));

    OpenApiRouter::new()
        .routes(routes!(handlers::temp_file::show_temp_file))
        .merge(upload)
}
