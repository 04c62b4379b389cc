use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub avatar: String,
    pub bio: String,
    #[serde(rename = "nativelanguage")]
    pub native_language: String,
    #[serde(rename = "learninglanguage")]
    pub learning_language: String,
    pub location: String,
    #[serde(rename = "isOnboarded")]
    pub is_onboarded: bool,
    pub friends: Vec<Uuid>,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Fields required to insert a fresh account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
}

/// Profile fields written by onboarding.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub fullname: String,
    pub bio: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
        }
    }
}

#[derive(Debug, FromRow)]
pub struct FriendRequestRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequest {
    pub id: Uuid,
    pub sender: Uuid,
    pub recipient: Uuid,
    pub status: RequestStatus,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "updatedAt", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<FriendRequestRow> for FriendRequest {
    fn from(r: FriendRequestRow) -> Self {
        let status = match r.status.as_str() {
            "accepted" => RequestStatus::Accepted,
            _ => RequestStatus::Pending,
        };
        Self {
            id: r.id,
            sender: r.sender_id,
            recipient: r.recipient_id,
            status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
