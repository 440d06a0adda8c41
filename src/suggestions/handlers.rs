use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::dto::{
    ChatReply, ChatRequest, MacroSuggestionRequest, PantryResponse, PantrySuggestionRequest,
    SuggestionResponse,
};
use crate::{auth::AuthUser, error::ApiError, state::AppState, validation::ValidJson};

pub fn suggestion_routes() -> Router<AppState> {
    Router::new()
        .route("/suggestions/macros", post(suggest_from_macros))
        .route("/suggestions/pantry", post(suggest_from_pantry))
        .route("/chat", post(chat))
}

#[instrument(skip(state, req))]
pub async fn suggest_from_macros(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<MacroSuggestionRequest>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let meals = state.suggestions.suggest_from_macros(user_id, &req).await?;
    Ok(Json(SuggestionResponse { meals }))
}

#[instrument(skip(state, req))]
pub async fn suggest_from_pantry(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<PantrySuggestionRequest>,
) -> Result<Json<PantryResponse>, ApiError> {
    let recipe = state.suggestions.suggest_from_pantry(&req).await?;
    Ok(Json(PantryResponse { recipe }))
}

#[instrument(skip(state, req))]
pub async fn chat(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state.suggestions.chat(&req).await?;
    Ok(Json(ChatReply { reply }))
}
