pub mod auth;
pub mod friends;
pub mod messages;
pub mod middleware;

use axum::{
    Router,
    http::StatusCode,
    routing::{delete, get, post},
};
use tracing::error;

use crate::auth::AppState;
use crate::middleware::require_auth;

/// All routes. Everything except `/auth/*` requires a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/friends", get(friends::list_friends).post(friends::add_friend))
        .route("/messages", post(messages::send_message))
        .route("/messages/sent", get(messages::list_sent))
        .route("/messages/received", get(messages::list_received))
        .route("/messages/search", get(messages::search))
        .route("/messages/{id}", get(messages::get_message))
        .route("/messages/{id}/read", post(messages::mark_read))
        .route("/messages/sent/{id}", delete(messages::delete_sent))
        .route("/messages/received/{id}", delete(messages::delete_received))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, StatusCode>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}
