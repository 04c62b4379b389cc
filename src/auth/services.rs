use std::fmt;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, OnboardRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password},
};
use crate::{
    error::AppError,
    presence::PresenceProfile,
    state::AppState,
    users::repo_types::{NewUser, ProfileUpdate, User},
};

pub const MIN_PASSWORD_LEN: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

lazy_static! {
    /// Verified against on unknown-email logins so both failure paths cost one Argon2 run.
    static ref DUMMY_HASH: Option<String> = hash_password("lingomate-dummy-password").ok();
}

fn burn_password_check(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Placeholder avatar derived from the display name; same name, same URL.
pub(crate) fn avatar_for(fullname: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/adventurer/svg?seed={}&size=128",
        urlencoding::encode(fullname)
    )
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A freshly signed session for `user`.
pub struct Session {
    pub user: User,
    pub token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

fn issue_session(state: &AppState, user: User) -> Result<Session, AppError> {
    let token = JwtKeys::from_ref(state).sign(user.id)?;
    Ok(Session { user, token })
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> Result<Session, AppError> {
    let fullname = payload.fullname.trim().to_string();
    let email = normalize_email(&payload.email);

    if fullname.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Please fill all required fields"));
    }

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::bad_request(
            "Password must be at least 6 characters",
        ));
    }

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Please enter a valid email address"));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::bad_request("This email already exists"));
    }

    let password_hash = hash_password(&payload.password)?;
    let avatar = avatar_for(&fullname);

    // A concurrent signup that wins the race surfaces here as DuplicateEmail.
    let user = state
        .users
        .create(NewUser {
            fullname,
            email,
            password_hash,
            avatar,
        })
        .await?;

    state.presence.dispatch(PresenceProfile::from(&user));

    info!(user_id = %user.id, email = %user.email, "user registered");
    issue_session(state, user)
}

pub async fn login(state: &AppState, payload: LoginRequest) -> Result<Session, AppError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Please provide email and password"));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        burn_password_check(&payload.password);
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    issue_session(state, user)
}

/// Collects every empty onboarding field, in request order.
pub(crate) fn missing_profile_fields(payload: &OnboardRequest) -> Vec<&'static str> {
    [
        ("fullname", &payload.fullname),
        ("bio", &payload.bio),
        ("nativelanguage", &payload.nativelanguage),
        ("learninglanguage", &payload.learninglanguage),
        ("location", &payload.location),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect()
}

pub async fn onboard(
    state: &AppState,
    user_id: Uuid,
    payload: OnboardRequest,
) -> Result<User, AppError> {
    let missing_fields = missing_profile_fields(&payload);
    if !missing_fields.is_empty() {
        warn!(user_id = %user_id, missing = ?missing_fields, "onboarding fields missing");
        return Err(AppError::Validation {
            message: "Please fill all required fields".into(),
            missing_fields,
        });
    }

    let profile = ProfileUpdate {
        fullname: payload.fullname.trim().to_string(),
        bio: payload.bio.trim().to_string(),
        native_language: payload.nativelanguage.trim().to_string(),
        learning_language: payload.learninglanguage.trim().to_string(),
        location: payload.location.trim().to_string(),
    };

    let user = state
        .users
        .update_profile(user_id, profile)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    state.presence.dispatch(PresenceProfile::from(&user));

    info!(user_id = %user.id, "user onboarded");
    Ok(user)
}

pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
