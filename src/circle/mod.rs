//! Proxy over the Circle community platform.

use crate::state::AppState;
use axum::Router;

pub mod admin;
pub mod clock;
pub mod enrich;
pub mod flags;
pub mod gateway;
pub mod handlers;
pub mod location;
pub mod settings;
pub mod token_cache;
pub mod transport;
pub mod types;

pub fn router() -> Router<AppState> {
    handlers::circle_routes()
}
