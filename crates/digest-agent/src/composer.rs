//! Builds the summarization prompt from per-channel batches and asks the
//! provider for the digest.

use tracing::{info, warn};

use digest_core::ChannelMessageBatch;

use crate::prompt::PromptTemplate;
use crate::provider::{ChatRequest, LlmProvider, Message};

/// Heading placed between the instructions and the transcript.
const TRANSCRIPT_HEADING: &str = "**Today's Discord Messages:**";

pub struct DigestComposer {
    provider: Box<dyn LlmProvider>,
    prompt: PromptTemplate,
    model: String,
    max_tokens: Option<u32>,
}

impl DigestComposer {
    pub fn new(provider: Box<dyn LlmProvider>, prompt: PromptTemplate, model: String) -> Self {
        Self {
            provider,
            prompt,
            model,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Summarize `batches`. Returns `None` when there is nothing to summarize
    /// (no request is made) or when the provider fails or returns no text.
    pub async fn compose(&self, batches: &[ChannelMessageBatch]) -> Option<String> {
        let transcript = format_batches(batches)?;
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(self.full_prompt(&transcript))],
            max_tokens: self.max_tokens,
        };

        info!(provider = %self.provider.name(), model = %self.model, "requesting digest");
        let resp = match self.provider.send(&request).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "summarization failed");
                return None;
            }
        };

        info!(
            model = %resp.model,
            tokens_in = resp.tokens_in,
            tokens_out = resp.tokens_out,
            stop_reason = %resp.stop_reason,
            "digest generated"
        );

        match resp.content {
            Some(text) if !text.trim().is_empty() => Some(text),
            _ => {
                warn!(provider = %self.provider.name(), "summarization response had no content");
                None
            }
        }
    }

    fn full_prompt(&self, transcript: &str) -> String {
        format!(
            "{}\n\n---\n\n{TRANSCRIPT_HEADING}\n\n{transcript}",
            self.prompt.as_str()
        )
    }
}

/// Render non-empty batches as labeled sections, oldest message first.
/// Returns `None` when every batch is empty.
pub fn format_batches(batches: &[ChannelMessageBatch]) -> Option<String> {
    let sections: Vec<String> = batches
        .iter()
        .filter(|b| !b.is_empty())
        .map(|b| {
            let lines: Vec<String> = b
                .chronological()
                .map(|m| format!("[{}]: {}", m.author.username, m.content))
                .collect();
            format!("=== #{} ===\n{}", b.channel_name, lines.join("\n"))
        })
        .collect();

    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}
