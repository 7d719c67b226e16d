use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::{auth::repo_types::Session, error::ApiError, state::AppState};

pub const SESSION_COOKIE: &str = "attendance_session";

/// Session cookie set on login. HttpOnly so scripts never see the token.
pub fn session_cookie(token: Uuid, ttl_minutes: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(ttl_minutes))
        .build()
}

pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// Extracts the logged-in user from the session cookie. Rejects with 401
/// when the cookie is missing, malformed, unknown or expired.
pub struct SessionUser {
    pub user_id: Uuid,
    pub username: String,
}

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("Unauthorized".into())
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let raw = jar
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or_else(unauthorized)?;
        let token = Uuid::parse_str(&raw).map_err(|_| unauthorized())?;

        let user = Session::find_user(&state.db, token)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| {
                warn!("session unknown or expired");
                unauthorized()
            })?;

        Ok(SessionUser {
            user_id: user.id,
            username: user.username,
        })
    }
}

/// Admin identity, authenticated by a static bearer token from config.
#[derive(Debug)]
pub struct AdminAuth;

// Constant-time so response timing does not leak how much of the token
// matched
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(unauthorized)?;
        let token = auth.strip_prefix("Bearer ").ok_or_else(unauthorized)?;

        if !token_matches(token, &state.config.admin_token) {
            warn!("admin token mismatch");
            return Err(unauthorized());
        }
        Ok(AdminAuth)
    }
}
