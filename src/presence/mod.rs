//! Best-effort mirroring of user identity into the chat-presence service.
//!
//! Flows hand a [`PresenceProfile`] to [`PresenceDispatcher::dispatch`], which
//! runs the upsert on its own task. The outcome is logged there and never
//! reaches the request that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use crate::users::repo_types::User;

pub mod stream;

/// Identity fields mirrored to the presence service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: String,
}

impl From<&User> for PresenceProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.fullname.clone(),
            email: user.email.clone(),
            image: user.avatar.clone(),
        }
    }
}

#[async_trait]
pub trait PresenceSync: Send + Sync {
    async fn upsert_user(&self, profile: &PresenceProfile) -> anyhow::Result<()>;
}

/// Used when no presence credentials are configured.
pub struct NoopPresence;

#[async_trait]
impl PresenceSync for NoopPresence {
    async fn upsert_user(&self, profile: &PresenceProfile) -> anyhow::Result<()> {
        debug!(user_id = %profile.id, "presence sync disabled; skipping upsert");
        Ok(())
    }
}

#[derive(Clone)]
pub struct PresenceDispatcher {
    client: Arc<dyn PresenceSync>,
}

impl PresenceDispatcher {
    pub fn new(client: Arc<dyn PresenceSync>) -> Self {
        Self { client }
    }

    /// Spawns the upsert detached from the caller.
    pub fn dispatch(&self, profile: PresenceProfile) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        let span = tracing::info_span!("presence_sync", user_id = %profile.id);
        tokio::spawn(
            async move {
                match client.upsert_user(&profile).await {
                    Ok(()) => info!(email = %profile.email, "presence user upserted"),
                    Err(e) => warn!(error = %e, "presence upsert failed"),
                }
            }
            .instrument(span),
        )
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingPresence;
    use super::*;

    fn profile() -> PresenceProfile {
        PresenceProfile {
            id: "42".into(),
            name: "Ana".into(),
            email: "ana@x.com".into(),
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn dispatch_delivers_profile() {
        let recorder = Arc::new(RecordingPresence::new(false));
        let dispatcher = PresenceDispatcher::new(recorder.clone());
        dispatcher.dispatch(profile()).await.unwrap();
        assert_eq!(recorder.next().await, profile());
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let recorder = Arc::new(RecordingPresence::new(true));
        let dispatcher = PresenceDispatcher::new(recorder.clone());
        // The task completes normally even though the upsert failed.
        dispatcher.dispatch(profile()).await.unwrap();
        assert_eq!(recorder.next().await.id, "42");
    }

    #[tokio::test]
    async fn noop_presence_succeeds() {
        assert!(NoopPresence.upsert_user(&profile()).await.is_ok());
    }
}
