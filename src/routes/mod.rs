pub mod admin;
pub mod auth;
pub mod health;
pub mod stones;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::middleware::{
    auth::{require_admin, require_session},
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::AppState;

/// Every route of the API with its guards. Outer layers (tracing, CORS,
/// timeouts, body limits) are added by the binary.
pub fn build_router(state: AppState, auth_rps: u32) -> Router {
    let auth_api = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .layer(from_fn_with_state(new_rps_state(auth_rps), rps_middleware));

    let session_api = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::current_session))
        .route(
            "/api/stones",
            get(stones::list_stones).post(stones::create_stone),
        )
        .route("/api/stones/filters", get(stones::filter_options))
        .route(
            "/api/stones/:id",
            get(stones::get_stone)
                .patch(stones::update_stone)
                .delete(stones::delete_stone),
        )
        .route("/api/stones/:id/image", post(stones::upload_stone_image))
        .route("/api/materials", get(stones::list_materials))
        .route(
            "/api/materials/:name/images",
            post(stones::upload_material_image),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let admin_api = Router::new()
        .route("/api/admin/approvals", get(admin::list_approvals))
        .route("/api/admin/approvals/:id/decision", post(admin::decide))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health::health))
        .merge(auth_api)
        .merge(session_api)
        .merge(admin_api)
        .with_state(state)
}
