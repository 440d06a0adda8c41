use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateMealPlanRequest, DateRangeQuery},
    repo::MealPlan,
};
use crate::{
    auth::AuthUser,
    error::ApiError,
    state::AppState,
    validation::{ValidJson, ValidPath, ValidQuery},
};

pub fn meal_plan_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(list_meal_plans).post(create_meal_plan))
        .route("/meal-plans/:id", delete(delete_meal_plan))
}

#[instrument(skip(state))]
pub async fn list_meal_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(range): ValidQuery<DateRangeQuery>,
) -> Result<Json<Vec<MealPlan>>, ApiError> {
    let plans = state.meal_plans.list(user_id, range.from, range.to).await?;
    Ok(Json(plans))
}

/// POST /meal-plans: schedules a snapshot of a suggested or favorite meal.
#[instrument(skip(state, req))]
pub async fn create_meal_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<CreateMealPlanRequest>,
) -> Result<(StatusCode, Json<MealPlan>), ApiError> {
    let plan = state.meal_plans.create(user_id, &req).await?;
    info!(%user_id, meal_plan_id = %plan.id, date = %plan.date, meal_type = %plan.meal_type, "meal scheduled");
    Ok((StatusCode::CREATED, Json(plan)))
}

#[instrument(skip(state))]
pub async fn delete_meal_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.meal_plans.delete(user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
