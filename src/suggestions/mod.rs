mod dto;
pub mod handlers;
mod prompt;
pub mod rate_limit;
mod response;
pub mod service;

use crate::state::AppState;
use axum::Router;

pub use rate_limit::{RateLimiter, SlidingWindowLimiter};
pub use service::{SuggestionError, SuggestionService};

pub fn router() -> Router<AppState> {
    handlers::suggestion_routes()
}
