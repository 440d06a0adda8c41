use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{RecipeInput, RecipeListQuery},
    repo,
    repo_types::Recipe,
};
use crate::{
    auth::AuthUser,
    error::ApiError,
    state::AppState,
    validation::{ValidJson, ValidPath, ValidQuery},
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(q): ValidQuery<RecipeListQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = repo::list_visible(&state.db, user_id, q.dietary_restriction).await?;
    Ok(Json(recipes))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<Json<Recipe>, ApiError> {
    repo::find_visible(&state.db, user_id, id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Recipe"))
}

#[instrument(skip(state, input))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(input): ValidJson<RecipeInput>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = repo::create(&state.db, user_id, &input).await?;
    info!(%user_id, recipe_id = %recipe.id, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state, input))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(input): ValidJson<RecipeInput>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = repo::update(&state.db, user_id, id, &input)
        .await?
        .ok_or(ApiError::NotFound("Recipe"))?;
    info!(%user_id, recipe_id = %id, "recipe updated");
    Ok(Json(recipe))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound("Recipe"));
    }
    info!(%user_id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}
