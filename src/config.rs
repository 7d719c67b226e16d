use serde::Deserialize;

/// Circular geofence around the office. Punches reported outside the radius
/// are rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct GeofenceConfig {
    pub office_lat: f64,
    pub office_lon: f64,
    pub radius_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Static bearer token for the admin identity. There is no admin user
    /// row; whoever presents this token is the admin.
    pub admin_token: String,
    pub geofence: GeofenceConfig,
    pub session_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let admin_token = std::env::var("ADMIN_TOKEN")?;
        let geofence = GeofenceConfig {
            office_lat: env_or("OFFICE_LAT", 11.274_570),
            office_lon: env_or("OFFICE_LON", 77.607_235),
            radius_m: env_or("GEOFENCE_RADIUS_METERS", 100.0),
        };
        let session_ttl_minutes = env_or("SESSION_TTL_MINUTES", 60 * 12);
        Ok(Self {
            database_url,
            admin_token,
            geofence,
            session_ttl_minutes,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
