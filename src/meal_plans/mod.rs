pub mod dto;
pub mod handlers;
pub mod repo;

use crate::state::AppState;
use axum::Router;

pub use repo::MealPlanStore;

pub fn router() -> Router<AppState> {
    handlers::meal_plan_routes()
}
