use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{AcceptResponse, FriendRequestView, IncomingRequests, UserSummary},
    repo_types::FriendRequest,
    services,
};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(recommended))
        .route("/users/friends", get(my_friends))
        .route("/users/friend-request/:id", post(send_request))
        .route("/users/friend-request/:id/accept", put(accept_request))
        .route("/users/friend-requests", get(incoming))
        .route("/users/outgoing-friend-requests", get(outgoing))
}

#[instrument(skip(state))]
pub async fn recommended(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(services::recommended_users(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn my_friends(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(services::friends(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn send_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(recipient): Path<Uuid>,
) -> Result<(StatusCode, Json<FriendRequest>), AppError> {
    let request = services::send_friend_request(&state, user_id, recipient).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[instrument(skip(state))]
pub async fn accept_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AcceptResponse>, AppError> {
    services::accept_friend_request(&state, user_id, id).await?;
    Ok(Json(AcceptResponse {
        message: "Friend request accepted".into(),
    }))
}

#[instrument(skip(state))]
pub async fn incoming(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<IncomingRequests>, AppError> {
    Ok(Json(services::incoming_requests(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn outgoing(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<FriendRequestView>>, AppError> {
    Ok(Json(services::outgoing_requests(&state, user_id).await?))
}
