use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

/// Credentials for the Stream Chat server-side API.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Marks the session cookie `Secure`; on in production only.
    pub cookie_secure: bool,
    pub stream: Option<StreamConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "lingomate".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "lingomate-users".into()),
            ttl_days: std::env::var("JWT_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
        };
        let cookie_secure = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let stream = stream_from_env();
        Ok(Self {
            database_url,
            jwt,
            cookie_secure,
            stream,
        })
    }
}

fn stream_from_env() -> Option<StreamConfig> {
    let api_key = std::env::var("STREAM_API_KEY").ok()?;
    let api_secret = std::env::var("STREAM_API_SECRET").ok()?;
    if api_key.is_empty() || api_secret.is_empty() {
        return None;
    }
    Some(StreamConfig {
        api_key,
        api_secret,
        base_url: std::env::var("STREAM_BASE_URL")
            .unwrap_or_else(|_| "https://chat.stream-io-api.com".into()),
    })
}
