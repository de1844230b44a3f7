use std::sync::Arc;

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{error, info};
use uuid::Uuid;

use pigeon_db::Database;
use pigeon_messaging::MessagingService;
use pigeon_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub messaging: MessagingService,
    pub jwt_secret: String,
}

/// Shared state with the messaging service wired to `db`.
pub fn app_state(db: Arc<Database>, jwt_secret: String) -> AppState {
    let messaging = MessagingService::from_database(db.clone());
    Arc::new(AppStateInner { db, messaging, jwt_secret })
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.email.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let username = req.username.clone();
    let registered = blocking(move || -> anyhow::Result<Option<Uuid>> {
        // Check if username is taken
        if db.get_user_by_username(&req.username)?.is_some() {
            return Ok(None);
        }

        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {}", e))?
            .to_string();

        let user_id = Uuid::new_v4();

        // False if a concurrent registration claimed the name after the check
        let created = db.create_user(
            &user_id.to_string(),
            &req.username,
            &password_hash,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
            req.email.trim(),
        )?;
        Ok(created.then_some(user_id))
    })
    .await?
    .map_err(|e| {
        error!("Failed to register {}: {:#}", username, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let Some(user_id) = registered else {
        info!("Registration failed: username {} taken", username);
        return Err(StatusCode::CONFLICT);
    };

    info!("User {} registered", username);

    let token = create_token(&state.jwt_secret, user_id, &username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.trim().is_empty() || req.password.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();
    let username = req.username.clone();
    let user = blocking(move || db.get_user_by_username(&username))
        .await?
        .map_err(|e| {
            error!("Failed to look up user {}: {:#}", req.username, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_id: Uuid = user.id.parse().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
