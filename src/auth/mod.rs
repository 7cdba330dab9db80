use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod session;
pub mod tokens;
pub(crate) mod validate;

pub fn router() -> Router<AppState> {
    handlers::router()
}
