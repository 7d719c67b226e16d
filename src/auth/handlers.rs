use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        extractors::{expired_session_cookie, session_cookie, SESSION_COOKIE},
        password::{hash_password, verify_password},
        repo_types::{Session, User},
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{2,31}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// True when the error is a database unique-constraint violation. Signup
/// races past its duplicate pre-check land here instead of surfacing as 500.
pub(crate) fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password required".into(),
        ));
    }
    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(ApiError::BadRequest("Invalid username".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    if User::find_by_username(&state.db, &payload.username)
        .await?
        .is_some()
    {
        warn!(username = %payload.username, "username already exists");
        return Err(ApiError::Conflict("Username already exists".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &hash)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(username = %payload.username, "username already exists");
                ApiError::Conflict("Username already exists".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok(Json(json!({ "message": "Signup successful" })))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(mut payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password required".into(),
        ));
    }

    // Same message for unknown user and bad password
    let user = User::find_by_username(&state.db, &payload.username)
        .await?
        .ok_or_else(|| {
            warn!(username = %payload.username, "login unknown username");
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(username = %payload.username, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let swept = Session::delete_expired(&state.db).await?;
    if swept > 0 {
        debug!(swept, "expired sessions deleted");
    }

    let session = Session::create(&state.db, user.id, state.config.session_ttl_minutes).await?;
    let jar = jar.add(session_cookie(
        session.token,
        state.config.session_ttl_minutes,
    ));

    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok((jar, Json(json!({ "message": "Login successful" }))))
}

/// Deletes the session if one exists. Always succeeds, matching the
/// destroy-then-respond behavior of session middleware.
#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    if let Some(token) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        Session::delete(&state.db, token).await?;
        info!(%token, "session deleted");
    }
    let jar = jar.remove(expired_session_cookie());
    Ok((jar, Json(json!({ "message": "Logged out" }))))
}
