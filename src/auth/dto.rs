use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::User;

/// Request body for signup. Absent fields deserialize as empty.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for onboarding.
#[derive(Debug, Default, Deserialize)]
pub struct OnboardRequest {
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub nativelanguage: String,
    #[serde(default)]
    pub learninglanguage: String,
    #[serde(default)]
    pub location: String,
}

/// Identity returned right after signup.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub avatar: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            fullname: user.fullname.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub success: bool,
    pub user: User,
}

impl UserEnvelope {
    pub fn ok(user: User) -> Self {
        Self {
            success: true,
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
