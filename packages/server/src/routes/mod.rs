use axum::extract::DefaultBodyLimit;
use axum::routing::put;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers::{media, poster};
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/posters", poster_routes(config))
}

fn poster_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(poster::list_posters, poster::create_poster))
        .routes(routes!(
            poster::get_poster,
            poster::update_poster,
            poster::delete_poster
        ))
        // PUT shares the partial-update handler; only PATCH is documented.
        .route("/{id}", put(poster::update_poster))
        .routes(routes!(poster::hide_poster))
        .routes(routes!(poster::unhide_poster))
        .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes))
}

/// Mounted at `media.url_prefix`.
pub fn media_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(media::get_media))
}
