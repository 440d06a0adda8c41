use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, PublicUser, RefreshRequest,
            RegisterRequest, UpdateProfileRequest,
        },
        repo::is_unique_violation,
        repo_types::User,
        services::{
            cleared_session_cookie, hash_password, normalize_username, session_cookie,
            verify_password, AuthUser, JwtKeys,
        },
    },
    error::ApiError,
    state::AppState,
    validation::ValidJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/password", put(change_password))
}

/// Signs a token pair and sets the session cookie.
fn issue_session(
    state: &AppState,
    jar: CookieJar,
    user: User,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    let jar = jar.add(session_cookie(
        &state.config.session,
        access_token.clone(),
        keys.access_ttl,
    ));
    Ok((
        jar,
        Json(AuthResponse {
            access_token,
            refresh_token,
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let username = normalize_username(&payload.username);

    if User::find_by_username(&state.db, &username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(ApiError::Conflict("Username already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let name = payload.name.as_deref().map(str::trim);
    let user = User::create(&state.db, &username, &hash, name)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(%username, "username registered concurrently");
                ApiError::Conflict("Username already registered".into())
            } else {
                ApiError::Internal(e)
            }
        })?;

    info!(user_id = %user.id, %username, "user registered");
    let (jar, body) = issue_session(&state, jar, user)?;
    Ok((StatusCode::CREATED, jar, body))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let username = normalize_username(&payload.username);

    let Some(user) = User::find_by_username(&state.db, &username).await? else {
        warn!(%username, "login unknown username");
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    info!(user_id = %user.id, %username, "user logged in");
    issue_session(&state, jar, user)
}

#[instrument(skip(state, jar, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(payload): ValidJson<RefreshRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    issue_session(&state, jar, user)
}

#[instrument(skip(state, jar))]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (StatusCode, CookieJar) {
    let jar = jar.add(cleared_session_cookie(&state.config.session));
    (StatusCode::NO_CONTENT, jar)
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::update_profile(&state.db, user_id, &payload)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    info!(%user_id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(payload): ValidJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(%user_id, "password change with wrong current password");
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}
