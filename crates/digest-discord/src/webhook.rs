use std::time::Duration;

use tracing::{debug, info, warn};

use digest_core::config::{DiscordConfig, ThrottleConfig};

use crate::error::DiscordError;

/// Hard per-message limit of a Discord webhook, in characters.
pub const CHUNK_MAX: usize = 2000;

/// A newline earlier than this in the window is ignored in favor of a hard
/// break, so chunks don't come out tiny.
pub const MIN_NEWLINE_BREAK: usize = 1500;

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, preferring
/// to break at the last newline of each window.
///
/// Nothing is trimmed: concatenating the chunks gives back `text`.
pub fn split_chunks(text: &str) -> Vec<String> {
    split_chunks_with(text, CHUNK_MAX, MIN_NEWLINE_BREAK)
}

pub fn split_chunks_with(text: &str, max_chars: usize, min_break: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the first character past a full chunk.
        let Some((hard_break, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let newline = remaining
            .char_indices()
            .take(max_chars + 1)
            .enumerate()
            .filter(|(_, (_, c))| *c == '\n')
            .last()
            .map(|(char_idx, (byte_idx, _))| (char_idx, byte_idx));

        let split_at = match newline {
            Some((char_idx, byte_idx)) if char_idx > 0 && char_idx >= min_break => byte_idx,
            _ => hard_break,
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }

    chunks
}

/// Outcome of a chunked delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.sent + self.failed
    }
}

/// Posts text to a Discord webhook.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    url: String,
    request_delay: Duration,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            request_delay: Duration::from_millis(digest_core::config::DEFAULT_REQUEST_DELAY_MS),
        }
    }

    pub fn from_config(discord: &DiscordConfig, throttle: &ThrottleConfig) -> Self {
        Self::new(discord.webhook_url.clone()).with_request_delay(throttle.request_delay())
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Post a single message. `content` must already fit in one message.
    pub async fn post(&self, content: &str) -> Result<(), DiscordError> {
        let resp = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(DiscordError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Send `text` in ≤2000-char chunks, one request at a time.
    ///
    /// A failed chunk is logged and skipped; later chunks are still sent.
    pub async fn send_chunked(&self, text: &str) -> DeliveryReport {
        let chunks = split_chunks(text);
        let count = chunks.len();
        let mut report = DeliveryReport::default();

        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.request_delay).await;
            }

            match self.post(chunk).await {
                Ok(()) => {
                    debug!(chunk = i + 1, of = count, len = chunk.chars().count(), "webhook chunk sent");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(chunk = i + 1, of = count, error = %e, "webhook chunk delivery FAILED");
                    report.failed += 1;
                }
            }
        }

        info!(sent = report.sent, failed = report.failed, "webhook delivery finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn assert_well_formed(text: &str, chunks: &[String]) {
        assert_eq!(chunks.concat(), text);
        for c in chunks {
            assert!(c.chars().count() <= CHUNK_MAX, "chunk too large: {}", c.chars().count());
            assert!(!c.is_empty());
        }
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_chunks("").is_empty());
    }

    #[test]
    fn exactly_the_limit_is_one_chunk() {
        let text = "x".repeat(CHUNK_MAX);
        assert_eq!(split_chunks(&text).len(), 1);
    }

    #[test]
    fn late_newline_is_used_as_break() {
        let text = format!("{}\n{}", "a".repeat(1800), "b".repeat(1000));
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "a".repeat(1800));
        assert!(chunks[1].starts_with('\n'));
        assert_well_formed(&text, &chunks);
    }

    #[test]
    fn early_newline_falls_back_to_hard_break() {
        let text = format!("{}\n{}", "a".repeat(1000), "b".repeat(2500));
        let chunks = split_chunks(&text);
        assert_eq!(chunks[0].chars().count(), CHUNK_MAX);
        assert_well_formed(&text, &chunks);
    }

    #[test]
    fn newline_right_at_the_limit() {
        let text = format!("{}\n{}", "a".repeat(CHUNK_MAX), "b".repeat(10));
        let chunks = split_chunks(&text);
        assert_eq!(chunks[0], "a".repeat(CHUNK_MAX));
        assert_eq!(chunks[1], format!("\n{}", "b".repeat(10)));
    }

    #[test]
    fn very_long_word_still_splits() {
        let text = "x".repeat(4500);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        assert_well_formed(&text, &chunks);
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let text = "\u{1f4ca}é".repeat(1500);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), CHUNK_MAX);
        assert_well_formed(&text, &chunks);
    }

    #[test]
    fn mixed_lines_reassemble_exactly() {
        let text: String = (0..400)
            .map(|i| format!("- line {i}: {}\n", "word ".repeat(i % 17)))
            .collect();
        let chunks = split_chunks(&text);
        assert!(chunks.len() > 1);
        assert_well_formed(&text, &chunks);
    }

    #[tokio::test]
    async fn failed_chunk_does_not_stop_the_rest() {
        let mut server = mockito::Server::new_async().await;
        let first = "a".repeat(CHUNK_MAX);
        let second = "b".repeat(CHUNK_MAX);
        let third = "c".repeat(10);

        let m1 = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(serde_json::json!({ "content": first })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let m2 = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(serde_json::json!({ "content": second })))
            .with_status(500)
            .expect(1)
            .create_async()
            .await;
        let m3 = server
            .mock("POST", "/hook")
            .match_body(Matcher::Json(serde_json::json!({ "content": third })))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let webhook = WebhookClient::new(format!("{}/hook", server.url()))
            .with_request_delay(Duration::ZERO);
        let report = webhook
            .send_chunked(&format!("{first}{second}{third}"))
            .await;

        assert_eq!(report, DeliveryReport { sent: 2, failed: 1 });
        assert_eq!(report.total(), 3);
        m1.assert_async().await;
        m2.assert_async().await;
        m3.assert_async().await;
    }

    // Real clock: a paused clock auto-advances to reqwest's pool timers while
    // a request is in flight, so elapsed time would not be meaningful.
    #[tokio::test]
    async fn chunks_are_paced_with_no_trailing_delay() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/hook")
            .with_status(204)
            .expect(3)
            .create_async()
            .await;

        let delay = Duration::from_millis(100);
        let webhook = WebhookClient::new(format!("{}/hook", server.url())).with_request_delay(delay);
        let text = format!("{}{}{}", "a".repeat(CHUNK_MAX), "b".repeat(CHUNK_MAX), "c");

        let started = tokio::time::Instant::now();
        let report = webhook.send_chunked(&text).await;
        let elapsed = started.elapsed();

        assert_eq!(report, DeliveryReport { sent: 3, failed: 0 });
        assert!(elapsed >= delay * 2, "chunks sent too fast: {elapsed:?}");
        assert!(elapsed < delay * 3, "extra delay after last chunk: {elapsed:?}");
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn post_surfaces_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/hook")
            .with_status(404)
            .with_body(r#"{"message": "Unknown Webhook"}"#)
            .create_async()
            .await;

        let webhook = WebhookClient::new(format!("{}/hook", server.url()));
        let err = webhook.post("hi").await.unwrap_err();
        assert!(matches!(err, DiscordError::Api { status: 404, .. }));
    }
}
