use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "./digest.toml";
pub const DEFAULT_DISCORD_API: &str = "https://discord.com/api/v10";
pub const DEFAULT_SUMMARIZER_BASE_URL: &str = "https://openrouter.ai/api";
pub const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "x-ai/grok-4.1-fast";
pub const DEFAULT_PROMPT_PATH: &str = "./prompts/digest.md";
pub const DEFAULT_NO_ACCESS_PATH: &str = "./no-access-channels.json";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_TITLE: &str = "\u{1f4ca} **Daily Digest**";

/// Plain env var names accepted alongside the `DIGEST_*` ones, mapped onto
/// their config keys.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("DISCORD_TOKEN", "discord.token"),
    ("GUILD_ID", "discord.guild_id"),
    ("DISCORD_WEBHOOK_URL", "discord.webhook_url"),
    ("OPENROUTER_API_KEY", "summarizer.api_key"),
];

/// Top-level config (digest.toml + DIGEST_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub discord: DiscordConfig,
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub digest: DigestOutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token. Sent as `Bot <token>` unless it already carries a scheme.
    pub token: String,
    /// Guild (workspace) whose channels are scanned.
    pub guild_id: String,
    /// Webhook the finished digest is posted to.
    pub webhook_url: String,
    #[serde(default = "default_discord_api")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Base URL of an OpenAI-compatible API (without trailing slash).
    #[serde(default = "default_summarizer_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Instructional prompt prepended to the collected messages.
    #[serde(default = "default_prompt_path")]
    pub prompt_path: String,
    /// Completion length cap; the provider's default when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Static exclusion rules applied to the channel directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    #[serde(default)]
    pub ignored_names: Vec<String>,
    #[serde(default)]
    pub ignored_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_no_access_path")]
    pub no_access_path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            no_access_path: default_no_access_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Fixed pause between consecutive requests to the same backend.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
        }
    }
}

impl ThrottleConfig {
    pub fn request_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestOutputConfig {
    /// First line of the posted digest.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for DigestOutputConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

fn default_discord_api() -> String {
    DEFAULT_DISCORD_API.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_summarizer_base_url() -> String {
    DEFAULT_SUMMARIZER_BASE_URL.to_string()
}
fn default_chat_path() -> String {
    DEFAULT_CHAT_PATH.to_string()
}
fn default_prompt_path() -> String {
    DEFAULT_PROMPT_PATH.to_string()
}
fn default_no_access_path() -> String {
    DEFAULT_NO_ACCESS_PATH.to_string()
}
fn default_request_delay_ms() -> u64 {
    DEFAULT_REQUEST_DELAY_MS
}
fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl DigestConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Precedence, lowest first:
    ///   1. TOML file (explicit path, else `./digest.toml`; a missing file is fine)
    ///   2. plain `DISCORD_TOKEN`, `GUILD_ID`, `DISCORD_WEBHOOK_URL`, `OPENROUTER_API_KEY`
    ///   3. `DIGEST_*` env vars, nested with `__` (`DIGEST_DISCORD__TOKEN`)
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let mut figment = Figment::new().merge(Toml::file(path));

        for (var, key) in LEGACY_ENV_KEYS {
            if let Ok(value) = std::env::var(var) {
                let prefixed = format!("DIGEST_{}", key.replace('.', "__").to_uppercase());
                if std::env::var_os(&prefixed).is_some() {
                    debug!(plain = var, prefixed = %prefixed, "both env names set, using the prefixed one");
                }
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        let figment = figment.merge(Env::prefixed("DIGEST_").split("__"));

        let config: DigestConfig = figment
            .extract()
            .map_err(|e| crate::error::DigestError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        let required = [
            ("discord.token", &self.discord.token),
            ("discord.guild_id", &self.discord.guild_id),
            ("discord.webhook_url", &self.discord.webhook_url),
            ("summarizer.api_key", &self.summarizer.api_key),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(crate::error::DigestError::Config(format!(
                    "{key} must not be empty"
                )));
            }
        }
        Ok(())
    }
}
