//! Completion providers — the text-generation collaborator
//!
//! Case enumeration and input synthesis only need
//! `complete(prompt, choice_count) -> candidates`. Providers are passed in
//! as `Arc<dyn CompletionProvider>` handles; nothing here is global.

mod azure;
mod scripted;

pub use azure::{AzureOpenAiProvider, SYSTEM_MESSAGE};
pub use scripted::{ScriptRule, ScriptedProvider};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a completion provider
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion provider is not configured: {0}")]
    NotConfigured(String),

    #[error("missing API key: set the `{0}` environment variable")]
    MissingApiKey(String),

    #[error("completion request failed: {0}")]
    Transport(String),

    #[error("completion service answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("invalid completion script: {0}")]
    Script(String),
}

/// Source of candidate completions for a prompt
///
/// Callers never assume how many usable candidates come back; they try
/// them in order until one parses.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, choice_count: u32)
        -> Result<Vec<String>, CompletionError>;
}
