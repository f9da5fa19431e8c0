//! `digest-agent`: turns a day of collected channel messages into a digest
//! through an OpenAI-compatible chat completion API.

pub mod composer;
pub mod openai;
pub mod prompt;
pub mod provider;

pub use composer::DigestComposer;
pub use openai::OpenAiProvider;
pub use prompt::PromptTemplate;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
