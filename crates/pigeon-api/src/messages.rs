use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use pigeon_messaging::SendError;
use pigeon_types::api::{SearchQuery, SendMessageRequest, SendMessageResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::middleware::Claims;

/// The caller is always the sender.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let sent = blocking(move || {
        state
            .messaging
            .send(&claims.username, &req.recipient, &req.subject, &req.body)
    })
    .await?;

    match sent {
        Ok(id) => Ok((StatusCode::CREATED, Json(SendMessageResponse { id }))),
        Err(SendError::UsersNotFound) => Err(StatusCode::NOT_FOUND),
        Err(SendError::NoFriendship) => Err(StatusCode::FORBIDDEN),
        Err(SendError::SendFailed) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn list_sent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = blocking(move || state.messaging.list_sent(&claims.username)).await?;
    Ok(Json(messages))
}

pub async fn list_received(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = blocking(move || state.messaging.list_received(&claims.username)).await?;
    Ok(Json(messages))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let messages = blocking(move || state.messaging.search(&claims.username, &query.q)).await?;
    Ok(Json(messages))
}

/// Only parties who can still see the message get it back; anything else is
/// a plain 404 so ids of other people's messages can't be probed.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let message = blocking(move || state.messaging.get_by_id(id))
        .await?
        .filter(|m| m.is_visible_to(&claims.username))
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(message))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let updated = blocking(move || state.messaging.mark_as_read(id, &claims.username)).await?;
    no_content_or_not_found(updated)
}

pub async fn delete_sent(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let updated = blocking(move || state.messaging.delete_for_sender(id, &claims.username)).await?;
    no_content_or_not_found(updated)
}

pub async fn delete_received(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, StatusCode> {
    let updated =
        blocking(move || state.messaging.delete_for_recipient(id, &claims.username)).await?;
    no_content_or_not_found(updated)
}

fn no_content_or_not_found(updated: bool) -> Result<StatusCode, StatusCode> {
    if updated {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
