pub mod config;
pub mod dto;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;

use axum::routing::{
    delete,
    get,
    patch,
    post,
    put,
};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/readyz", get(routes::health::readyz))
        .route("/v2/assets/search", get(routes::assets::search_assets))
        .route("/v2/assets", post(routes::assets::create_asset))
        .route("/v2/assets/{id}", get(routes::assets::get_asset))
        .route("/v2/assets/{id}", patch(routes::assets::update_asset))
        .route("/v2/assets/{id}", put(routes::assets::update_asset))
        .route("/v2/assets/{id}", delete(routes::assets::delete_asset))
        .route("/v2/tags", post(routes::tags::create_tag))
        .route("/v2/tags", get(routes::tags::list_tags))
        .route("/v2/tags/{id}", delete(routes::tags::delete_tag))
        .route("/v2/views", post(routes::views::create_view))
        .route("/v2/views/tree", get(routes::views::view_tree))
        .route("/v2/views/{id}", patch(routes::views::update_view))
        .route("/v2/views/{id}", put(routes::views::update_view))
        .route("/v2/views/{id}", delete(routes::views::delete_view))
        .route("/v2/views/{id}/tags", get(routes::views::get_view_tags))
        .route("/v2/views/{id}/tags", put(routes::views::replace_view_tags))
        .route("/v2/index/app-ids", get(routes::index::app_ids))
        .route("/v2/index/rebuild", post(routes::index::rebuild))
        .route("/v2/index/jobs/{id}", get(routes::index::get_job))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), extract::require_internal_token));

    Router::new()
        .route("/healthz", get(routes::health::healthz))
        .merge(protected)
        .with_state(state)
}
