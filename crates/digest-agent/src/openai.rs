use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use digest_core::config::SummarizerConfig;

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// Client for any OpenAI-compatible chat completion endpoint (OpenRouter,
/// OpenAI, local servers).
pub struct OpenAiProvider {
    client: reqwest::Client,
    name: String,
    api_key: String,
    base_url: String,
    chat_path: String,
}

impl OpenAiProvider {
    pub fn with_path(name: String, api_key: String, base_url: String, chat_path: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            name,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_path,
        }
    }

    pub fn from_config(config: &SummarizerConfig) -> Self {
        let name = if config.base_url.contains("openrouter.ai") {
            "openrouter"
        } else {
            "openai-compat"
        };
        Self::with_path(
            name.to_string(),
            config.api_key.clone(),
            config.base_url.clone(),
            config.chat_path.clone(),
        )
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}{}", self.base_url, self.chat_path);

        debug!(provider = %self.name, model = %req.model, "sending chat completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %text, "chat completion API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(parse_response(api_resp, &req.model))
    }
}

fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = req
        .messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "role": m.role,
                "content": m.content,
            })
        })
        .collect();

    let mut body = serde_json::json!({
        "model": req.model,
        "messages": messages,
    });
    if let Some(max_tokens) = req.max_tokens {
        body["max_tokens"] = serde_json::json!(max_tokens);
    }
    body
}

fn parse_response(resp: ApiResponse, requested_model: &str) -> ChatResponse {
    let choice = resp.choices.into_iter().next();
    let content = choice.as_ref().and_then(|c| c.message.as_ref()?.content.clone());
    let stop_reason = choice.and_then(|c| c.finish_reason).unwrap_or_default();

    ChatResponse {
        content,
        model: resp.model.unwrap_or_else(|| requested_model.to_string()),
        tokens_in: resp.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
        tokens_out: resp
            .usage
            .as_ref()
            .map(|u| u.completion_tokens)
            .unwrap_or(0),
        stop_reason,
    }
}

// API response types (private, deserialization only). Every field is optional
// so a malformed body degrades to "no content" instead of a parse error.

#[derive(Deserialize)]
struct ApiResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChatMessage>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Message;
    use digest_core::config::DEFAULT_CHAT_PATH;
    use mockito::Matcher;

    fn request() -> ChatRequest {
        ChatRequest {
            model: "x-ai/grok-4.1-fast".to_string(),
            messages: vec![Message::user("summarize this")],
            max_tokens: None,
        }
    }

    #[test]
    fn body_has_model_and_user_message_only() {
        let body = build_request_body(&request());
        assert_eq!(
            body,
            serde_json::json!({
                "model": "x-ai/grok-4.1-fast",
                "messages": [{"role": "user", "content": "summarize this"}],
            })
        );
    }

    #[test]
    fn body_includes_max_tokens_when_set() {
        let mut req = request();
        req.max_tokens = Some(512);
        let body = build_request_body(&req);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 512);
    }

    #[tokio::test]
    async fn send_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "x-ai/grok-4.1-fast"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "id": "gen-1",
                    "model": "x-ai/grok-4.1-fast",
                    "choices": [
                        {"index": 0, "message": {"role": "assistant", "content": "digest text"}, "finish_reason": "stop"},
                        {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
                    ],
                    "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = OpenAiProvider::with_path(
            "openrouter".to_string(),
            "sk-test".to_string(),
            format!("{}/api/", server.url()),
            "/v1/chat/completions".to_string(),
        );
        let resp = provider.send(&request()).await.unwrap();

        assert_eq!(resp.content.as_deref(), Some("digest text"));
        assert_eq!(resp.tokens_in, 120);
        assert_eq!(resp.tokens_out, 30);
        assert_eq!(resp.stop_reason, "stop");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_choices_yield_no_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"error": null}"#)
            .create_async()
            .await;

        let provider = OpenAiProvider::with_path(
            "openai-compat".to_string(),
            "k".to_string(),
            server.url(),
            DEFAULT_CHAT_PATH.to_string(),
        );
        let resp = provider.send(&request()).await.unwrap();
        assert!(resp.content.is_none());
        assert_eq!(resp.model, "x-ai/grok-4.1-fast");
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(402)
            .with_body(r#"{"error": {"message": "Insufficient credits"}}"#)
            .create_async()
            .await;

        let provider = OpenAiProvider::with_path(
            "openai-compat".to_string(),
            "k".to_string(),
            server.url(),
            DEFAULT_CHAT_PATH.to_string(),
        );
        let err = provider.send(&request()).await.unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 402);
                assert!(message.contains("Insufficient credits"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn from_config_names_openrouter() {
        let config = SummarizerConfig {
            api_key: "k".to_string(),
            model: "m".to_string(),
            base_url: "https://openrouter.ai/api".to_string(),
            chat_path: "/v1/chat/completions".to_string(),
            prompt_path: "p.md".to_string(),
            max_tokens: None,
        };
        assert_eq!(OpenAiProvider::from_config(&config).name(), "openrouter");
    }
}
