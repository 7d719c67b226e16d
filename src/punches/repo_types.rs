use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A single attendance record. `username` is stored by value; punches are
/// never deleted, even if the user is.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Punch {
    pub id: Uuid,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub punch_in_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub punch_out_at: Option<OffsetDateTime>,
    pub lat: f64,
    pub lon: f64,
}
