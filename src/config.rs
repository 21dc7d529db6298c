//! utsynth configuration
//!
//! Handles loading of `utsynth.yaml`, discovered by walking up from the
//! working directory. Every section and field has a default, so an empty
//! file (or no file at all) is a valid configuration.

use crate::emit::{SeamStrategy, TestFramework};
use crate::error::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name searched for during discovery
pub const CONFIG_FILE_NAME: &str = "utsynth.yaml";

/// Root configuration (`utsynth.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SynthConfig {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Completion service settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Shape of the generated tests
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Where traces are read and artifacts written
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// External build/run command
    #[serde(default)]
    pub runner: RunnerConfig,
}

fn default_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            completion: CompletionConfig::default(),
            generation: GenerationConfig::default(),
            workspace: WorkspaceConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

/// Azure OpenAI chat completion settings
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompletionConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Deployment name of the chat model
    #[serde(default)]
    pub deployment: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Raised to 390 when lower
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Candidate completions requested per prompt
    #[serde(default = "default_choices")]
    pub choices: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Scripted answers file; replaces the remote service when set
    #[serde(default)]
    pub script: Option<PathBuf>,
}

fn default_api_version() -> String {
    "2023-06-01-preview".to_string()
}

fn default_api_key_env() -> String {
    "UTSYNTH_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    800
}

fn default_choices() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            deployment: None,
            api_version: default_api_version(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            choices: default_choices(),
            timeout_secs: default_timeout_secs(),
            script: None,
        }
    }
}

/// Shape of the generated test code
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationConfig {
    #[serde(default)]
    pub framework: TestFramework,

    /// Namespace of the test class; derived from the unit's first
    /// namespace when absent
    #[serde(default)]
    pub namespace: Option<String>,

    /// Company named in the copyright header; no header when absent
    #[serde(default)]
    pub copyright: Option<String>,

    /// Emit the trace fingerprint header
    #[serde(default = "default_true")]
    pub provenance: bool,

    /// Directory overriding the embedded templates
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Per-field injection seams, keyed `Type.field`
    #[serde(default)]
    pub seams: BTreeMap<String, SeamStrategy>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            framework: TestFramework::default(),
            namespace: None,
            copyright: None,
            provenance: true,
            template_dir: None,
            seams: BTreeMap::new(),
        }
    }
}

/// Trace and output locations, relative to the solution directory
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceConfig {
    /// Generated suite directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Throwaway output-calculation project directory
    #[serde(default = "default_harness_dir")]
    pub harness_dir: PathBuf,

    /// Trace file name looked for during discovery
    #[serde(default = "default_trace_file")]
    pub trace_file: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".CSharpUTGen")
}

fn default_harness_dir() -> PathBuf {
    PathBuf::from(".CSharpUTGenOutputCalcProj")
}

fn default_trace_file() -> String {
    crate::trace::TRACE_FILE_NAME.to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            harness_dir: default_harness_dir(),
            trace_file: default_trace_file(),
        }
    }
}

/// External build/run command
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunnerConfig {
    #[serde(default = "default_command")]
    pub command: String,

    /// Arguments placed before the project path
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Kill the run after this many seconds; unbounded when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Run the assembled suite after writing it
    #[serde(default = "default_true")]
    pub run_suite: bool,
}

fn default_command() -> String {
    "dotnet".to_string()
}

fn default_args() -> Vec<String> {
    vec!["test".to_string()]
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: None,
            run_suite: true,
        }
    }
}

impl SynthConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: SynthConfig = serde_norway::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Find `utsynth.yaml` in `start_dir` or the nearest ancestor
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>> {
        let mut current = Some(start_dir);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                tracing::debug!(path = %candidate.display(), "loaded configuration");
                return Ok(Some((candidate, config)));
            }
            current = dir.parent();
        }
        Ok(None)
    }

    /// Discovered configuration, or defaults when none exists
    pub fn discover_or_default(start_dir: &Path) -> Result<Self> {
        Ok(Self::discover(start_dir)?
            .map(|(_, config)| config)
            .unwrap_or_default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported {} version: {}",
                CONFIG_FILE_NAME, self.version
            )));
        }
        if self.completion.choices == 0 {
            return Err(Error::Config("completion.choices must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(Error::Config(format!(
                "completion.temperature must be within 0..=2, got {}",
                self.completion.temperature
            )));
        }
        if self.runner.command.trim().is_empty() {
            return Err(Error::Config("runner.command must not be empty".into()));
        }
        for key in self.generation.seams.keys() {
            if !key.contains('.') {
                return Err(Error::Config(format!(
                    "generation.seams key `{}` must have the form Type.field",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Commented default file written by `utsynth init`
    pub fn default_yaml() -> Result<String> {
        let mut content = String::from(
            "# utsynth configuration\n\
             # Every field is optional; see `utsynth schema config`.\n\n",
        );
        content.push_str(&serde_norway::to_string(&Self::default())?);
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = SynthConfig::from_yaml("{}").unwrap();
        assert_eq!(config.completion.choices, 3);
        assert_eq!(config.completion.api_version, "2023-06-01-preview");
        assert_eq!(config.workspace.output_dir, PathBuf::from(".CSharpUTGen"));
        assert_eq!(config.runner.args, vec!["test".to_string()]);
        assert_eq!(config.runner.timeout_secs, None);
        assert!(config.generation.provenance);
    }

    #[test]
    fn test_sections_parse() {
        let config = SynthConfig::from_yaml(
            r#"
completion:
  endpoint: https://example.openai.azure.com
  deployment: gpt-35
  choices: 5
generation:
  framework: xunit
  copyright: Contoso
  seams:
    Calculator._divider: property
runner:
  timeout_secs: 600
"#,
        )
        .unwrap();
        assert_eq!(config.completion.choices, 5);
        assert_eq!(config.generation.framework, TestFramework::XUnit);
        assert_eq!(
            config.generation.seams.get("Calculator._divider"),
            Some(&SeamStrategy::Property)
        );
        assert_eq!(config.runner.timeout_secs, Some(600));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            SynthConfig::from_yaml("version: 2"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SynthConfig::from_yaml("completion: { choices: 0 }"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            SynthConfig::from_yaml("generation: { seams: { nodot: accessor } }"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src").join("Calc");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "generation: { framework: nunit }",
        )
        .unwrap();

        let (path, config) = SynthConfig::discover(&nested).unwrap().unwrap();
        assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
        assert_eq!(config.generation.framework, TestFramework::NUnit);
    }

    #[test]
    fn test_default_yaml_round_trips() {
        let text = SynthConfig::default_yaml().unwrap();
        assert!(text.starts_with("# utsynth configuration"));
        let parsed = SynthConfig::from_yaml(&text).unwrap();
        assert_eq!(parsed.completion.api_key_env, "UTSYNTH_API_KEY");
    }
}
