use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::{
    FriendRequest, FriendRequestRow, NewUser, ProfileUpdate, RequestStatus, User,
};

const USER_COLUMNS: &str = "id, fullname, email, password_hash, avatar, bio, native_language, \
     learning_language, location, is_onboarded, friends, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, sender_id, recipient_id, status, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("friend request already exists for this pair")]
    DuplicateRequest,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>>;
    /// Fails with [`RepoError::DuplicateEmail`] when the email is taken.
    async fn create(&self, user: NewUser) -> RepoResult<User>;
    /// Writes the profile and marks the user onboarded. `None` if the id is unknown.
    async fn update_profile(&self, id: Uuid, profile: ProfileUpdate) -> RepoResult<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>>;
    /// Onboarded users outside `exclude`, newest first.
    async fn list_recommended(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<User>>;
}

/// Storage for friend requests.
#[async_trait]
pub trait FriendRequestRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> RepoResult<Option<FriendRequest>>;
    /// Any request between the two users, in either direction.
    async fn find_between(&self, a: Uuid, b: Uuid) -> RepoResult<Option<FriendRequest>>;
    /// Fails with [`RepoError::DuplicateRequest`] when the pair already has a request.
    async fn create(&self, sender: Uuid, recipient: Uuid) -> RepoResult<FriendRequest>;
    /// Marks a pending request accepted and links both users as friends, atomically.
    /// `None` if the request is unknown or no longer pending.
    async fn accept_and_link(&self, id: Uuid) -> RepoResult<Option<FriendRequest>>;
    async fn list_received(&self, recipient: Uuid, status: RequestStatus)
        -> RepoResult<Vec<FriendRequest>>;
    async fn list_sent(&self, sender: Uuid, status: RequestStatus)
        -> RepoResult<Vec<FriendRequest>>;
}

#[derive(Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_unique_violation(e: sqlx::Error, conflict: RepoError) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict,
        _ => RepoError::Database(e),
    }
}

async fn link_friends(tx: &mut sqlx::PgConnection, a: Uuid, b: Uuid) -> Result<(), sqlx::Error> {
    for (owner, friend) in [(a, b), (b, a)] {
        sqlx::query(
            r#"
            UPDATE users
               SET friends = array_append(friends, $2), updated_at = now()
             WHERE id = $1 AND NOT ($2 = ANY(friends))
            "#,
        )
        .bind(owner)
        .bind(friend)
        .execute(&mut *tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (fullname, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, RepoError::DuplicateEmail))
    }

    async fn update_profile(&self, id: Uuid, profile: ProfileUpdate) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET fullname = $2, bio = $3, native_language = $4,
                   learning_language = $5, location = $6,
                   is_onboarded = TRUE, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&profile.fullname)
        .bind(&profile.bio)
        .bind(&profile.native_language)
        .bind(&profile.learning_language)
        .bind(&profile.location)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) ORDER BY created_at ASC"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn list_recommended(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE is_onboarded = TRUE
               AND NOT (id = ANY($1))
             ORDER BY created_at DESC
             LIMIT $2
            "#
        ))
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }
}

#[async_trait]
impl FriendRequestRepository for PgRepository {
    async fn find(&self, id: Uuid) -> RepoResult<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> RepoResult<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM friend_requests
             WHERE (sender_id = $1 AND recipient_id = $2)
                OR (sender_id = $2 AND recipient_id = $1)
             LIMIT 1
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, sender: Uuid, recipient: Uuid) -> RepoResult<FriendRequest> {
        let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
            r#"
            INSERT INTO friend_requests (sender_id, recipient_id)
            VALUES ($1, $2)
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(sender)
        .bind(recipient)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique_violation(e, RepoError::DuplicateRequest))?;
        Ok(row.into())
    }

    async fn accept_and_link(&self, id: Uuid) -> RepoResult<Option<FriendRequest>> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, FriendRequestRow>(&format!(
            r#"
            UPDATE friend_requests
               SET status = $2, updated_at = now()
             WHERE id = $1 AND status = $3
            RETURNING {REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(RequestStatus::Accepted.as_str())
        .bind(RequestStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        link_friends(&mut *tx, row.sender_id, row.recipient_id).await?;
        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn list_received(
        &self,
        recipient: Uuid,
        status: RequestStatus,
    ) -> RepoResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM friend_requests
             WHERE recipient_id = $1 AND status = $2
             ORDER BY created_at DESC
            "#
        ))
        .bind(recipient)
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_sent(&self, sender: Uuid, status: RequestStatus) -> RepoResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS}
              FROM friend_requests
             WHERE sender_id = $1 AND status = $2
             ORDER BY created_at DESC
            "#
        ))
        .bind(sender)
        .bind(status.as_str())
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
