use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{normalize_tags, FavoriteCheckQuery, FavoriteCheckResponse, FavoriteInput, TagsUpdate},
    repo::{self, Favorite},
};
use crate::{
    auth::AuthUser,
    error::ApiError,
    state::AppState,
    validation::{ValidJson, ValidPath, ValidQuery},
};

pub fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites).post(add_favorite))
        .route("/favorites/check", get(check_favorite))
        .route("/favorites/:id", delete(remove_favorite))
        .route("/favorites/:id/tags", put(update_tags))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Favorite>>, ApiError> {
    Ok(Json(repo::list(&state.db, user_id).await?))
}

#[instrument(skip(state, input))]
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(input): ValidJson<FavoriteInput>,
) -> Result<(StatusCode, Json<Favorite>), ApiError> {
    let tags = normalize_tags(&input.tags);
    let favorite = repo::create(&state.db, user_id, &input, &tags).await?;
    info!(%user_id, favorite_id = %favorite.id, "favorite added");
    Ok((StatusCode::CREATED, Json(favorite)))
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound("Favorite"));
    }
    info!(%user_id, favorite_id = %id, "favorite removed");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn update_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(body): ValidJson<TagsUpdate>,
) -> Result<Json<Favorite>, ApiError> {
    let tags = normalize_tags(&body.tags);
    repo::update_tags(&state.db, user_id, id, &tags)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Favorite"))
}

#[instrument(skip(state))]
pub async fn check_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidQuery(q): ValidQuery<FavoriteCheckQuery>,
) -> Result<Json<FavoriteCheckResponse>, ApiError> {
    let is_favorite = repo::is_favorite(&state.db, user_id, &q.name).await?;
    Ok(Json(FavoriteCheckResponse { is_favorite }))
}
