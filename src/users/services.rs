use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    state::AppState,
    users::{
        dto::{FriendRequestView, IncomingRequests, UserSummary},
        repo_types::{FriendRequest, RequestStatus, User},
    },
};

pub const RECOMMENDATION_LIMIT: i64 = 50;

async fn load_user(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Profiles for `ids`, keyed by id. Unknown ids are skipped.
async fn summaries(state: &AppState, ids: Vec<Uuid>) -> Result<HashMap<Uuid, UserSummary>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = state.users.find_many(&ids).await?;
    Ok(users.iter().map(|u| (u.id, UserSummary::from(u))).collect())
}

pub async fn recommended_users(state: &AppState, me: Uuid) -> Result<Vec<UserSummary>, AppError> {
    let user = load_user(state, me).await?;
    let mut exclude = user.friends.clone();
    exclude.push(me);
    let users = state
        .users
        .list_recommended(&exclude, RECOMMENDATION_LIMIT)
        .await?;
    Ok(users.iter().map(UserSummary::from).collect())
}

pub async fn friends(state: &AppState, me: Uuid) -> Result<Vec<UserSummary>, AppError> {
    let user = load_user(state, me).await?;
    if user.friends.is_empty() {
        return Ok(Vec::new());
    }
    let users = state.users.find_many(&user.friends).await?;
    Ok(users.iter().map(UserSummary::from).collect())
}

pub async fn send_friend_request(
    state: &AppState,
    me: Uuid,
    recipient_id: Uuid,
) -> Result<FriendRequest, AppError> {
    if me == recipient_id {
        return Err(AppError::bad_request(
            "You can't send a friend request to yourself",
        ));
    }

    let recipient = state
        .users
        .find_by_id(recipient_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipient not found".into()))?;

    if recipient.friends.contains(&me) {
        return Err(AppError::bad_request("You are already friends with this user"));
    }

    if state.requests.find_between(me, recipient_id).await?.is_some() {
        warn!(sender = %me, recipient = %recipient_id, "duplicate friend request");
        return Err(AppError::bad_request(
            "A friend request already exists between you and this user",
        ));
    }

    // A concurrent send for the same pair surfaces here as DuplicateRequest.
    let request = state.requests.create(me, recipient_id).await?;
    info!(request_id = %request.id, sender = %me, recipient = %recipient_id, "friend request sent");
    Ok(request)
}

pub async fn accept_friend_request(
    state: &AppState,
    me: Uuid,
    request_id: Uuid,
) -> Result<FriendRequest, AppError> {
    let request = state
        .requests
        .find(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Friend request not found".into()))?;

    if request.recipient != me {
        return Err(AppError::Forbidden(
            "You are not authorized to accept this request".into(),
        ));
    }
    if request.status == RequestStatus::Accepted {
        return Err(AppError::bad_request("Friend request already accepted"));
    }

    let accepted = state
        .requests
        .accept_and_link(request_id)
        .await?
        .ok_or_else(|| AppError::bad_request("Friend request already accepted"))?;

    info!(request_id = %request_id, sender = %accepted.sender, recipient = %me, "friend request accepted");
    Ok(accepted)
}

pub async fn incoming_requests(state: &AppState, me: Uuid) -> Result<IncomingRequests, AppError> {
    let pending = state
        .requests
        .list_received(me, RequestStatus::Pending)
        .await?;
    let accepted = state.requests.list_sent(me, RequestStatus::Accepted).await?;

    let ids = pending
        .iter()
        .map(|r| r.sender)
        .chain(accepted.iter().map(|r| r.recipient))
        .collect();
    let profiles = summaries(state, ids).await?;

    Ok(IncomingRequests {
        incoming: pending
            .iter()
            .map(|r| FriendRequestView::new(r, profiles.get(&r.sender).cloned(), None))
            .collect(),
        accepted: accepted
            .iter()
            .map(|r| FriendRequestView::new(r, None, profiles.get(&r.recipient).cloned()))
            .collect(),
    })
}

pub async fn outgoing_requests(state: &AppState, me: Uuid) -> Result<Vec<FriendRequestView>, AppError> {
    let sent = state.requests.list_sent(me, RequestStatus::Pending).await?;
    let profiles = summaries(state, sent.iter().map(|r| r.recipient).collect()).await?;
    Ok(sent
        .iter()
        .map(|r| FriendRequestView::new(r, None, profiles.get(&r.recipient).cloned()))
        .collect())
}
