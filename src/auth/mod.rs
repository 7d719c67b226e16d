use crate::state::AppState;
use axum::Router;

mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod repo;
mod repo_types;

pub use extractors::{AdminAuth, SessionUser};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
