// ============================
// tradingroom-backend/src/router.rs
// ============================
//! HTTP router for the room API.
use axum::{
    extract::Request,
    middleware::from_fn_with_state,
    routing::{delete, get, post, MethodRouter},
    Router,
};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::{info_span, warn};
use uuid::Uuid;

use crate::{config::RoomRoute, handlers, middleware::require_identity, AppState};

pub const CREATE_PATH: &str = "/streaming/room/create";
pub const GET_PATH: &str = "/streaming/room/get";
pub const LIST_PATH: &str = "/streaming/room/list";
pub const JOIN_PATH: &str = "/streaming/room/join";
pub const DELETE_PATH: &str = "/streaming/room/delete";
pub const TOKEN_PATH: &str = "/auth/token";

/// Create the room router.
///
/// Create and token issuance always run behind the identity middleware.
/// The other routes do too unless `auth.public_routes` names them.
pub fn create_router(state: AppState) -> Router {
    let mut protected = Router::new()
        .route(CREATE_PATH, post(handlers::create_room))
        .route(TOKEN_PATH, post(handlers::issue_token));
    let mut public = Router::new();

    let optional: [(RoomRoute, &str, MethodRouter<AppState>); 4] = [
        (RoomRoute::Get, GET_PATH, get(handlers::get_room)),
        (RoomRoute::List, LIST_PATH, get(handlers::list_rooms)),
        (RoomRoute::Join, JOIN_PATH, post(handlers::join_room)),
        (RoomRoute::Delete, DELETE_PATH, delete(handlers::delete_room)),
    ];

    for (route, path, method_router) in optional {
        if state.settings.is_public(route) {
            warn!(path, "route is served without authentication");
            public = public.route(path, method_router);
        } else {
            protected = protected.route(path, method_router);
        }
    }

    let protected = protected.route_layer(from_fn_with_state(state.clone(), require_identity));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %Uuid::new_v4(),
            )
        }))
        .layer(cors)
        .with_state(state)
}
