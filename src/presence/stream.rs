use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

use super::{PresenceProfile, PresenceSync};
use crate::config::StreamConfig;

#[derive(Debug, Serialize)]
struct ServerClaims {
    server: bool,
}

#[derive(Debug, Serialize)]
struct UpsertUsers<'a> {
    users: HashMap<&'a str, &'a PresenceProfile>,
}

/// Stream Chat server-side client for the `users` upsert endpoint.
pub struct StreamPresence {
    http: reqwest::Client,
    config: StreamConfig,
    server_token: String,
}

impl StreamPresence {
    pub fn new(config: StreamConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let server_token = server_token(&config.api_secret)?;
        Ok(Self {
            http,
            config,
            server_token,
        })
    }

    fn users_url(&self) -> String {
        format!("{}/users", self.config.base_url.trim_end_matches('/'))
    }
}

/// HS256 token carrying `{"server": true}`, as Stream expects for backend calls.
fn server_token(secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        &ServerClaims { server: true },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("sign stream server token")?;
    Ok(token)
}

#[async_trait]
impl PresenceSync for StreamPresence {
    async fn upsert_user(&self, profile: &PresenceProfile) -> anyhow::Result<()> {
        let body = UpsertUsers {
            users: HashMap::from([(profile.id.as_str(), profile)]),
        };
        self.http
            .post(self.users_url())
            .query(&[("api_key", self.config.api_key.as_str())])
            .header("Authorization", &self.server_token)
            .header("stream-auth-type", "jwt")
            .json(&body)
            .send()
            .await
            .context("stream upsert request")?
            .error_for_status()
            .context("stream upsert status")?;
        Ok(())
    }
}
