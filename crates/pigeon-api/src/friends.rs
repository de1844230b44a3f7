use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use pigeon_types::api::{AddFriendRequest, FriendsResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::middleware::Claims;

pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let friends = blocking(move || state.db.list_friends(&claims.username))
        .await?
        .map_err(|e| {
            error!("Failed to list friends: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(FriendsResponse { friends }))
}

/// Befriend another user. Friendships are mutual and take effect immediately.
pub async fn add_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddFriendRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username == claims.username {
        return Err(StatusCode::BAD_REQUEST);
    }

    let created = blocking(move || -> anyhow::Result<Option<bool>> {
        if !state.db.user_exists(&req.username)? {
            return Ok(None);
        }
        let created = state.db.create_friendship(&claims.username, &req.username)?;
        if created {
            info!("{} and {} are now friends", claims.username, req.username);
        }
        Ok(Some(created))
    })
    .await?
    .map_err(|e| {
        error!("Failed to add friend: {:#}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .ok_or(StatusCode::NOT_FOUND)?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(serde_json::json!({ "created": created }))))
}
