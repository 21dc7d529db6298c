//! Build/run collaborator — compiles and runs a generated test project

use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Output of one build+run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Builds and runs a project file
///
/// An `Err` means the run could not happen at all (the command is missing,
/// timed out); a failing build or failing tests are an `Ok` outcome with
/// `success == false`.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn run(&self, project: &Path) -> Result<RunOutcome>;
}

/// Runs `dotnet test <project>` (or the configured command) in the
/// project's directory
#[derive(Debug, Clone)]
pub struct DotnetRunner {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl DotnetRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }
}

impl Default for DotnetRunner {
    fn default() -> Self {
        Self::new(&RunnerConfig::default())
    }
}

#[async_trait]
impl BuildRunner for DotnetRunner {
    async fn run(&self, project: &Path) -> Result<RunOutcome> {
        let workdir: PathBuf = project
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        // runs inside the project directory, so only the file name is passed
        let project_arg = project.file_name().unwrap_or(project.as_os_str());
        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(project_arg)
            .current_dir(&workdir)
            .kill_on_drop(true);

        tracing::info!(
            command = %self.command,
            project = %project.display(),
            "running build"
        );

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    Error::Run(format!(
                        "`{}` on {} timed out after {}s",
                        self.command,
                        project.display(),
                        limit.as_secs()
                    ))
                })?,
            None => command.output().await,
        }
        .map_err(|e| Error::Run(format!("failed to start `{}`: {}", self.command, e)))?;

        let outcome = RunOutcome {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(success = outcome.success, code = ?outcome.exit_code, "build finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_command_is_run_error() {
        let runner = DotnetRunner::new(&RunnerConfig {
            command: "utsynth-command-that-does-not-exist".into(),
            ..RunnerConfig::default()
        });
        let err = runner.run(Path::new("Demo.csproj")).await.unwrap_err();
        assert!(matches!(err, Error::Run(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_command_in_project_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join("Demo.csproj");
        std::fs::write(&project, "<Project />").unwrap();

        let runner = DotnetRunner::new(&RunnerConfig {
            command: "ls".into(),
            args: vec![],
            timeout_secs: Some(30),
            run_suite: true,
        });
        let outcome = runner.run(&project).await.unwrap();
        assert!(outcome.success);
        assert!(outcome.stdout.contains("Demo.csproj"));
    }
}
