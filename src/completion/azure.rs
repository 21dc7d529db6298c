//! Azure OpenAI chat completions over HTTP

use super::{CompletionError, CompletionProvider};
use crate::config::CompletionConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SYSTEM_MESSAGE: &str = "You are an excellent C# code analyzer.";

/// Floor applied to `max_tokens`; shorter answers truncate case lists
const MIN_MAX_TOKENS: u32 = 390;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for an Azure OpenAI deployment
#[derive(Clone)]
pub struct AzureOpenAiProvider {
    client: Client,
    url: String,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("url", &self.url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AzureOpenAiProvider {
    pub fn new(config: &CompletionConfig, api_key: String) -> Result<Self, CompletionError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| CompletionError::NotConfigured("completion.endpoint".into()))?;
        let deployment = config
            .deployment
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| CompletionError::NotConfigured("completion.deployment".into()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                deployment,
                config.api_version
            ),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens.max(MIN_MAX_TOKENS),
        })
    }

    /// Build from config, reading the key from `completion.api_key_env`
    pub fn from_env(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(
        &self,
        prompt: &str,
        choice_count: u32,
    ) -> Result<Vec<String>, CompletionError> {
        let body = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            n: choice_count.max(1),
        };

        tracing::debug!(url = %self.url, choices = body.n, "requesting completions");
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .filter_map(|c| c.message.and_then(|m| m.content))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CompletionConfig {
        CompletionConfig {
            endpoint: Some("https://example.openai.azure.com/".into()),
            deployment: Some("gpt-35".into()),
            max_tokens: 100,
            ..CompletionConfig::default()
        }
    }

    #[test]
    fn test_url_and_token_floor() {
        let provider = AzureOpenAiProvider::new(&config(), "key".into()).unwrap();
        assert_eq!(
            provider.url,
            "https://example.openai.azure.com/openai/deployments/gpt-35/chat/completions?api-version=2023-06-01-preview"
        );
        assert_eq!(provider.max_tokens, MIN_MAX_TOKENS);
    }

    #[test]
    fn test_requires_endpoint() {
        let cfg = CompletionConfig {
            endpoint: None,
            ..config()
        };
        assert!(matches!(
            AzureOpenAiProvider::new(&cfg, "key".into()),
            Err(CompletionError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_missing_key_names_variable() {
        let cfg = CompletionConfig {
            api_key_env: "UTSYNTH_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..config()
        };
        let err = AzureOpenAiProvider::from_env(&cfg).unwrap_err();
        assert!(err.to_string().contains("UTSYNTH_TEST_KEY_THAT_IS_NOT_SET"));
    }

    #[test]
    fn test_response_shape() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "a"}}, {"message": {}}, {"message": {"content": "b"}}]}"#,
        )
        .unwrap();
        let contents: Vec<String> = parsed
            .choices
            .into_iter()
            .filter_map(|c| c.message.and_then(|m| m.content))
            .collect();
        assert_eq!(contents, vec!["a", "b"]);
    }
}
