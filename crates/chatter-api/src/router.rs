//! Route definitions for the Chatter HTTP API.
//!
//! Routes are organized by domain and mounted under `/api`; the WebSocket
//! upgrade lives at `/ws`.

use axum::http::{HeaderValue, Method};
use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Builds the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(group_routes())
        .merge(message_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = build_cors_layer(&state);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Auth endpoints: register, login, logout, me.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
}

/// User listing, search, profile, and contacts.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::user::list_users))
        .route("/users/search", get(handlers::user::search_users))
        .route("/users/me", put(handlers::user::update_profile))
        .route("/users/contacts", get(handlers::user::list_contacts))
        .route("/users/contacts/{id}", post(handlers::user::add_contact))
        .route("/users/{id}", get(handlers::user::get_user))
}

/// Group CRUD and membership management.
fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", post(handlers::group::create_group))
        .route("/groups", get(handlers::group::my_groups))
        .route("/groups/{id}", get(handlers::group::get_group))
        .route("/groups/{id}", put(handlers::group::update_group))
        .route("/groups/{id}/members", get(handlers::group::list_members))
        .route(
            "/groups/{id}/members/{user_id}",
            post(handlers::group::add_member),
        )
        .route(
            "/groups/{id}/members/{user_id}",
            delete(handlers::group::remove_member),
        )
}

/// Message history, read state, hide, and delete.
fn message_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/messages/direct/{user_id}",
            get(handlers::message::direct_history),
        )
        .route(
            "/messages/group/{group_id}",
            get(handlers::message::group_history),
        )
        .route(
            "/messages/read/{sender_id}",
            put(handlers::message::mark_read),
        )
        .route("/messages/unread", get(handlers::message::unread_counts))
        .route("/messages/{id}/hide", put(handlers::message::hide_message))
        .route("/messages/{id}", delete(handlers::message::delete_message))
}

/// Health endpoints.
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}

/// Builds the CORS layer from configuration. A lone `*` origin allows any,
/// for development.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let cors_config = &state.config.server.cors;

    let mut layer = CorsLayer::new()
        .allow_methods(
            cors_config
                .allowed_methods
                .iter()
                .filter_map(|method| method.parse::<Method>().ok())
                .collect::<Vec<_>>(),
        )
        .max_age(std::time::Duration::from_secs(cors_config.max_age_seconds));

    if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
        layer = layer.allow_origin(Any).allow_headers(Any);
    } else {
        layer = layer
            .allow_origin(
                cors_config
                    .allowed_origins
                    .iter()
                    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_headers(Any);
    }

    layer
}
