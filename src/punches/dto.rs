use serde::Deserialize;

/// Coordinates reported by the client on punch-in and punch-out.
#[derive(Debug, Deserialize)]
pub struct PunchRequest {
    pub lat: f64,
    pub lon: f64,
}
