use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{AdminAuth, SessionUser},
    error::ApiError,
    punches::{dto::PunchRequest, Punch},
    state::AppState,
};

pub fn punch_routes() -> Router<AppState> {
    Router::new()
        .route("/punch-in", post(punch_in))
        .route("/punch-out", post(punch_out))
        .route("/punches", get(list_punches))
        .route("/admin/punches", get(list_all_punches))
}

fn check_geofence(state: &AppState, lat: f64, lon: f64) -> Result<(), ApiError> {
    let gf = &state.config.geofence;
    if !gf.contains(lat, lon) {
        warn!(
            distance_m = gf.distance_m(lat, lon),
            radius_m = gf.radius_m,
            "outside geofence"
        );
        return Err(ApiError::Forbidden("Outside geofence area".into()));
    }
    Ok(())
}

#[instrument(skip(state, user, payload), fields(username = %user.username))]
pub async fn punch_in(
    State(state): State<AppState>,
    user: SessionUser,
    Json(payload): Json<PunchRequest>,
) -> Result<Json<Value>, ApiError> {
    check_geofence(&state, payload.lat, payload.lon)?;

    // One open punch per user; the repo enforces it atomically
    let punch = Punch::create_open(&state.db, &user.username, payload.lat, payload.lon)
        .await?
        .ok_or_else(|| {
            warn!("punch-in with open punch");
            ApiError::Conflict("Already punched in".into())
        })?;
    info!(punch_id = %punch.id, "punched in");
    Ok(Json(json!({ "message": "Punch In successful" })))
}

#[instrument(skip(state, user, payload), fields(username = %user.username))]
pub async fn punch_out(
    State(state): State<AppState>,
    user: SessionUser,
    Json(payload): Json<PunchRequest>,
) -> Result<Json<Value>, ApiError> {
    check_geofence(&state, payload.lat, payload.lon)?;

    let punch = Punch::close_open(&state.db, &user.username)
        .await?
        .ok_or_else(|| {
            warn!("punch-out without open punch");
            ApiError::BadRequest("No active punch-in found".into())
        })?;

    info!(punch_id = %punch.id, "punched out");
    Ok(Json(json!({ "message": "Punch Out successful" })))
}

#[instrument(skip(state, user), fields(username = %user.username))]
pub async fn list_punches(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Vec<Punch>>, ApiError> {
    let punches = Punch::list_for_user(&state.db, &user.username).await?;
    Ok(Json(punches))
}

#[instrument(skip(state))]
pub async fn list_all_punches(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<Punch>>, ApiError> {
    let punches = Punch::list_all(&state.db).await?;
    Ok(Json(punches))
}
