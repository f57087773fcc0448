use anyhow::{Context, Result};
use uuid::Uuid;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    /// Ambient caller identity; the backend scopes every call by it.
    pub user_id: Uuid,
    pub page_size: u32,
    pub timeout_secs: u64,
    /// Visible fraction of the tail sentinel that counts as "reached the end".
    pub scroll_threshold: f32,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            api_url: api_url.into(),
            user_id,
            page_size: 20,
            timeout_secs: 30,
            scroll_threshold: 0.1,
        }
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let user_id = require_env("REFRACTY_USER_ID")?;
        let mut config = ClientConfig::new(
            require_env("REFRACTY_API_URL")?,
            Uuid::parse_str(&user_id).context("REFRACTY_USER_ID must be a UUID")?,
        );

        if let Ok(v) = std::env::var("REFRACTY_PAGE_SIZE") {
            config.page_size = v
                .parse::<u32>()
                .context("REFRACTY_PAGE_SIZE must be a positive integer")?
                .max(1);
        }
        if let Ok(v) = std::env::var("REFRACTY_TIMEOUT_SECS") {
            config.timeout_secs = v
                .parse::<u64>()
                .context("REFRACTY_TIMEOUT_SECS must be a number of seconds")?;
        }
        if let Ok(v) = std::env::var("REFRACTY_SCROLL_THRESHOLD") {
            config.scroll_threshold = v
                .parse::<f32>()
                .context("REFRACTY_SCROLL_THRESHOLD must be a number")?
                .clamp(0.0, 1.0);
        }

        Ok(config)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
