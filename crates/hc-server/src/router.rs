//! Axum router construction.
//!
//! The media playlist is served by a handler so it can block; every other
//! file under `/hls` comes straight from the muxer directory.

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::muxer::MEDIA_PLAYLIST;
use crate::routes;

pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let hls = Router::new()
        .route(
            &format!("/{MEDIA_PLAYLIST}"),
            get(routes::playlist::media_playlist),
        )
        .fallback_service(ServeDir::new(ctx.muxer.directory()));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/hls", hls)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
