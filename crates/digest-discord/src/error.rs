/// Errors produced by the Discord REST client.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch channels: status {status}")]
    DirectoryFetch { status: u16 },

    #[error("access forbidden")]
    Forbidden,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}
