use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::repo::{FriendRequestRepository, RepoError, RepoResult, UserRepository};
use crate::users::repo_types::{FriendRequest, NewUser, ProfileUpdate, RequestStatus, User};

/// Process-local stand-in for Postgres, enforcing the same email uniqueness.
#[derive(Default)]
pub struct MemoryRepository {
    users: RwLock<Vec<User>>,
    requests: RwLock<Vec<FriendRequest>>,
    fail_next_link: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Makes the next friend-linking write fail as a lost connection would.
    pub fn fail_next_link(&self) {
        self.fail_next_link.store(true, Ordering::SeqCst);
    }

    fn take_link_failure(&self) -> RepoResult<()> {
        if self.fail_next_link.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

fn link(users: &mut [User], a: Uuid, b: Uuid) {
    for (owner, friend) in [(a, b), (b, a)] {
        if let Some(user) = users.iter_mut().find(|u| u.id == owner) {
            if !user.friends.contains(&friend) {
                user.friends.push(friend);
                user.updated_at = OffsetDateTime::now_utc();
            }
        }
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> RepoResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            fullname: user.fullname,
            email: user.email,
            password_hash: user.password_hash,
            avatar: user.avatar,
            bio: String::new(),
            native_language: String::new(),
            learning_language: String::new(),
            location: String::new(),
            is_onboarded: false,
            friends: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn update_profile(&self, id: Uuid, profile: ProfileUpdate) -> RepoResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.fullname = profile.fullname;
        user.bio = profile.bio;
        user.native_language = profile.native_language;
        user.learning_language = profile.learning_language;
        user.location = profile.location;
        user.is_onboarded = true;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn find_many(&self, ids: &[Uuid]) -> RepoResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| ids.contains(&u.id)).cloned().collect())
    }

    async fn list_recommended(&self, exclude: &[Uuid], limit: i64) -> RepoResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .rev()
            .filter(|u| u.is_onboarded && !exclude.contains(&u.id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FriendRequestRepository for MemoryRepository {
    async fn find(&self, id: Uuid) -> RepoResult<Option<FriendRequest>> {
        let requests = self.requests.read().await;
        Ok(requests.iter().find(|r| r.id == id).cloned())
    }

    async fn find_between(&self, a: Uuid, b: Uuid) -> RepoResult<Option<FriendRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .find(|r| (r.sender == a && r.recipient == b) || (r.sender == b && r.recipient == a))
            .cloned())
    }

    async fn create(&self, sender: Uuid, recipient: Uuid) -> RepoResult<FriendRequest> {
        let mut requests = self.requests.write().await;
        if requests.iter().any(|r| {
            (r.sender == sender && r.recipient == recipient)
                || (r.sender == recipient && r.recipient == sender)
        }) {
            return Err(RepoError::DuplicateRequest);
        }
        let now = OffsetDateTime::now_utc();
        let request = FriendRequest {
            id: Uuid::new_v4(),
            sender,
            recipient,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        requests.push(request.clone());
        Ok(request)
    }

    async fn accept_and_link(&self, id: Uuid) -> RepoResult<Option<FriendRequest>> {
        let mut requests = self.requests.write().await;
        let mut users = self.users.write().await;
        let Some(request) = requests
            .iter_mut()
            .find(|r| r.id == id && r.status == RequestStatus::Pending)
        else {
            return Ok(None);
        };
        // Nothing is written until every step is known to succeed.
        self.take_link_failure()?;
        link(&mut users, request.sender, request.recipient);
        request.status = RequestStatus::Accepted;
        request.updated_at = OffsetDateTime::now_utc();
        Ok(Some(request.clone()))
    }

    async fn list_received(
        &self,
        recipient: Uuid,
        status: RequestStatus,
    ) -> RepoResult<Vec<FriendRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .rev()
            .filter(|r| r.recipient == recipient && r.status == status)
            .cloned()
            .collect())
    }

    async fn list_sent(&self, sender: Uuid, status: RequestStatus) -> RepoResult<Vec<FriendRequest>> {
        let requests = self.requests.read().await;
        Ok(requests
            .iter()
            .rev()
            .filter(|r| r.sender == sender && r.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            fullname: "Ana".into(),
            email: email.into(),
            password_hash: "hash".into(),
            avatar: String::new(),
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let repo = MemoryRepository::new();
        UserRepository::create(&repo, new_user("ana@x.com")).await.unwrap();
        let err = UserRepository::create(&repo, new_user("ana@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::DuplicateEmail));
        assert_eq!(repo.user_count().await, 1);
    }

    #[test]
    fn link_is_symmetric_and_idempotent() {
        let now = OffsetDateTime::now_utc();
        let user = |email: &str| User {
            id: Uuid::new_v4(),
            fullname: "Ana".into(),
            email: email.into(),
            password_hash: String::new(),
            avatar: String::new(),
            bio: String::new(),
            native_language: String::new(),
            learning_language: String::new(),
            location: String::new(),
            is_onboarded: false,
            friends: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let mut users = vec![user("a@x.com"), user("b@x.com")];
        let (a, b) = (users[0].id, users[1].id);
        link(&mut users, a, b);
        link(&mut users, b, a);
        assert_eq!(users[0].friends, vec![b]);
        assert_eq!(users[1].friends, vec![a]);
    }

    #[tokio::test]
    async fn find_between_ignores_direction() {
        let repo = MemoryRepository::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        FriendRequestRepository::create(&repo, a, b).await.unwrap();
        assert!(repo.find_between(b, a).await.unwrap().is_some());
        assert!(repo.find_between(a, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_rejects_second_request_for_same_pair() {
        let repo = MemoryRepository::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        FriendRequestRepository::create(&repo, a, b).await.unwrap();
        for (from, to) in [(a, b), (b, a)] {
            let err = FriendRequestRepository::create(&repo, from, to)
                .await
                .unwrap_err();
            assert!(matches!(err, RepoError::DuplicateRequest));
        }
    }

    #[tokio::test]
    async fn failed_accept_leaves_request_pending() {
        let repo = MemoryRepository::new();
        let a = UserRepository::create(&repo, new_user("a@x.com")).await.unwrap();
        let b = UserRepository::create(&repo, new_user("b@x.com")).await.unwrap();
        let req = FriendRequestRepository::create(&repo, a.id, b.id).await.unwrap();

        repo.fail_next_link();
        assert!(repo.accept_and_link(req.id).await.is_err());
        let stored = repo.find(req.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Pending);
        assert!(repo.find_by_id(a.id).await.unwrap().unwrap().friends.is_empty());

        let accepted = repo.accept_and_link(req.id).await.unwrap().unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert_eq!(repo.find_by_id(a.id).await.unwrap().unwrap().friends, vec![b.id]);
        assert!(repo.accept_and_link(req.id).await.unwrap().is_none());
    }
}
