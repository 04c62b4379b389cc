use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookie::{cleared_cookie, session_cookie, set_cookie_headers},
        dto::{LoginRequest, MessageResponse, OnboardRequest, PublicUser, RegisterRequest, UserEnvelope},
        jwt::{AuthUser, JwtKeys},
        services::{self, Session},
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/onboarding", post(onboard))
        .route("/auth/me", get(get_me))
}

fn session_headers(state: &AppState, session: &Session) -> Result<HeaderMap, AppError> {
    let ttl = JwtKeys::from_ref(state).ttl;
    let cookie = session_cookie(&session.token, ttl, state.config.cookie_secure);
    Ok(set_cookie_headers(&cookie)?)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<PublicUser>), AppError> {
    let Json(payload) = payload?;
    let session = services::register(&state, payload).await?;
    let headers = session_headers(&state, &session)?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(PublicUser::from(&session.user)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<UserEnvelope>), AppError> {
    let Json(payload) = payload?;
    let session = services::login(&state, payload).await?;
    let headers = session_headers(&state, &session)?;
    Ok((headers, Json(UserEnvelope::ok(session.user))))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<MessageResponse>), AppError> {
    let headers = set_cookie_headers(&cleared_cookie(state.config.cookie_secure))?;
    Ok((
        headers,
        Json(MessageResponse {
            success: true,
            message: "Logout successful".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn onboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<OnboardRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, AppError> {
    let Json(payload) = payload?;
    let user = services::onboard(&state, user_id, payload).await?;
    Ok(Json(UserEnvelope::ok(user)))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(UserEnvelope::ok(user)))
}
