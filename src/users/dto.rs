use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{FriendRequest, RequestStatus, User};

/// Profile fields other users may see.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub fullname: String,
    pub avatar: String,
    pub bio: String,
    pub nativelanguage: String,
    pub learninglanguage: String,
    pub location: String,
}

impl From<&User> for UserSummary {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            fullname: u.fullname.clone(),
            avatar: u.avatar.clone(),
            bio: u.bio.clone(),
            nativelanguage: u.native_language.clone(),
            learninglanguage: u.learning_language.clone(),
            location: u.location.clone(),
        }
    }
}

/// A friend request with the other party's profile attached.
#[derive(Debug, Serialize)]
pub struct FriendRequestView {
    pub id: Uuid,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<UserSummary>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl FriendRequestView {
    pub fn new(
        req: &FriendRequest,
        sender: Option<UserSummary>,
        recipient: Option<UserSummary>,
    ) -> Self {
        Self {
            id: req.id,
            status: req.status,
            sender,
            recipient,
            created_at: req.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IncomingRequests {
    #[serde(rename = "incomingReqs")]
    pub incoming: Vec<FriendRequestView>,
    #[serde(rename = "acceptedReqs")]
    pub accepted: Vec<FriendRequestView>,
}

#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub message: String,
}
