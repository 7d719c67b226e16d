use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
mod repo_types;

pub use repo_types::Punch;

pub fn router() -> Router<AppState> {
    handlers::punch_routes()
}
