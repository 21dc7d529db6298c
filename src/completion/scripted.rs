//! Deterministic provider answering from a YAML script
//!
//! ```yaml
//! rules:
//!   - when_contains: "boundary cases"
//!     choices:
//!       - "[throws] [unrelatedToMock] [NegativeInput] 1. a is negative"
//! fallback:
//!   - "[]"
//! ```
//!
//! The first rule whose `when_contains` text occurs in the prompt answers;
//! otherwise `fallback` does. Used for offline runs and tests.

use super::{CompletionError, CompletionProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

/// One scripted answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRule {
    /// Text the prompt must contain
    pub when_contains: String,
    /// Candidates returned, in order
    pub choices: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Script {
    #[serde(default)]
    rules: Vec<ScriptRule>,
    #[serde(default)]
    fallback: Vec<String>,
}

/// Provider replaying scripted candidates
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(rules: Vec<ScriptRule>, fallback: Vec<String>) -> Self {
        Self {
            script: Script { rules, fallback },
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, CompletionError> {
        let script: Script =
            serde_norway::from_str(content).map_err(|e| CompletionError::Script(e.to_string()))?;
        Ok(Self {
            script,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn load(path: &Path) -> Result<Self, CompletionError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompletionError::Script(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        prompt: &str,
        choice_count: u32,
    ) -> Result<Vec<String>, CompletionError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let choices = self
            .script
            .rules
            .iter()
            .find(|rule| prompt.contains(&rule.when_contains))
            .map(|rule| &rule.choices)
            .unwrap_or(&self.script.fallback);

        Ok(choices
            .iter()
            .take(choice_count.max(1) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
rules:
  - when_contains: "enumerate"
    choices: ["one", "two", "three"]
  - when_contains: "Case description: [a]"
    choices: ["[]"]
fallback: ["none"]
"#;

    #[tokio::test]
    async fn test_first_matching_rule_answers() {
        let provider = ScriptedProvider::from_yaml(SCRIPT).unwrap();
        assert_eq!(provider.complete("please enumerate", 2).await.unwrap(), vec!["one", "two"]);
        assert_eq!(provider.complete("Case description: [a] x", 3).await.unwrap(), vec!["[]"]);
        assert_eq!(provider.complete("other", 3).await.unwrap(), vec!["none"]);
        assert_eq!(provider.prompts().len(), 3);
    }

    #[test]
    fn test_invalid_script() {
        assert!(matches!(
            ScriptedProvider::from_yaml("rules: 5"),
            Err(CompletionError::Script(_))
        ));
    }
}
