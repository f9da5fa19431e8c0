use std::path::Path;

use tracing::{info, warn};

use digest_core::{DigestError, Result};

/// Instructional prompt that precedes the collected messages.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read the template from `path`. A missing or unreadable file is an error:
    /// the digest is meaningless without its instructions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "failed to read prompt template");
            DigestError::PromptTemplate {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        if text.trim().is_empty() {
            warn!(path = %path.display(), "prompt template is empty");
        }
        info!(path = %path.display(), chars = text.len(), "prompt template loaded");
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
