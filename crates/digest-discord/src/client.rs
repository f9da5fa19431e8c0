use std::time::Duration;

use digest_core::config::{DiscordConfig, ThrottleConfig};

/// Thin REST client for the Discord HTTP API, authenticated as a bot.
///
/// Holds the fixed pause applied between consecutive page requests.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    pub(crate) http: reqwest::Client,
    api_base: String,
    authorization: String,
    pub(crate) request_delay: Duration,
}

impl DiscordClient {
    pub fn new(token: &str, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            authorization: authorization_header(token),
            request_delay: Duration::from_millis(digest_core::config::DEFAULT_REQUEST_DELAY_MS),
        }
    }

    pub fn from_config(discord: &DiscordConfig, throttle: &ThrottleConfig) -> Self {
        Self::new(&discord.token, discord.api_base.clone())
            .with_request_delay(throttle.request_delay())
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}{}", self.api_base, path))
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
    }
}

/// Bot tokens need the `Bot ` scheme; tokens that already carry a scheme are
/// passed through untouched.
fn authorization_header(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("Bot ") || token.starts_with("Bearer ") {
        token.to_string()
    } else {
        format!("Bot {token}")
    }
}
