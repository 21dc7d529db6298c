//! Output calculation — ground truth for synthesized inputs
//!
//! Cases that are not pre-marked throwing get one harness method each in a
//! throwaway project. A single build+run executes all of them; each method
//! writes `outputJsons/{case index}.json` holding `Exception`,
//! `NoException` or the JSON-serialized return value. Missing or
//! unreadable result files, and a run that could not start at all, count
//! as `Exception`.

use crate::case::BoundaryCase;
use crate::codec;
use crate::emit::{self, Expectation, HarnessMethod, MethodContext, TestFile, EXCEPTION_MARKER, NO_EXCEPTION_MARKER};
use crate::error::Result;
use crate::project::{self, SourceProject};
use crate::runner::{BuildRunner, RunOutcome};
use crate::templates::Templates;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory of per-case result files inside the harness workspace
pub const RESULTS_DIR: &str = "outputJsons";
/// Base name of the harness source and project files
pub const HARNESS_NAME: &str = "OutputCalc";

/// Layout of the harness project directory
#[derive(Debug, Clone)]
pub struct HarnessWorkspace {
    root: PathBuf,
}

impl HarnessWorkspace {
    /// Workspace at `root`, made absolute so harness code can write results
    /// regardless of the runner's working directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            root: std::path::absolute(root.as_ref())?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    pub fn result_path(&self, index: usize) -> PathBuf {
        self.results_dir().join(format!("{}.json", index))
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.join(format!("{}.cs", HARNESS_NAME))
    }

    pub fn project_path(&self) -> PathBuf {
        self.root.join(format!("{}.csproj", HARNESS_NAME))
    }

    /// Create the workspace and empty the results directory
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let results = self.results_dir();
        if tokio::fs::try_exists(&results).await? {
            tokio::fs::remove_dir_all(&results).await?;
        }
        tokio::fs::create_dir_all(&results).await?;
        Ok(())
    }
}

/// Interpret one result file's content for a unit returning `return_type`
pub fn decode_result(content: &str, return_type: &str) -> Expectation {
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed == EXCEPTION_MARKER {
        return Expectation::Throws;
    }
    if trimmed == NO_EXCEPTION_MARKER {
        return Expectation::Completes;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Null) => Expectation::Returns(None),
        Ok(serde_json::Value::String(s)) if codec::is_string_type(return_type) => {
            Expectation::Returns(Some(s))
        }
        _ => Expectation::Returns(Some(trimmed.to_string())),
    }
}

/// What an output-calculation pass did
#[derive(Debug, Clone, Default)]
pub struct CalculationReport {
    /// Cases that went through the harness
    pub calculated: usize,
    /// Cases whose "does not throw" the harness contradicted
    pub reclassified: Vec<String>,
    pub run: Option<RunOutcome>,
    /// Why the harness could not run, when it could not
    pub run_error: Option<String>,
}

/// Runs the harness for every case that needs an output
pub struct OutputCalculator {
    runner: Arc<dyn BuildRunner>,
    templates: Templates,
    workspace: HarnessWorkspace,
}

impl OutputCalculator {
    pub fn new(runner: Arc<dyn BuildRunner>, templates: Templates, workspace: HarnessWorkspace) -> Self {
        Self {
            runner,
            templates,
            workspace,
        }
    }

    pub fn workspace(&self) -> &HarnessWorkspace {
        &self.workspace
    }

    /// Harness source for the given cases
    pub fn harness_file(&self, ctx: &MethodContext<'_>, cases: &[&BoundaryCase]) -> TestFile {
        let methods = cases
            .iter()
            .map(|case| {
                let result_path = self.workspace.result_path(case.index).display().to_string();
                emit::harness_case(
                    ctx,
                    &HarnessMethod {
                        case_name: &case.name,
                        inputs: &case.inputs,
                        mock_exception: case.mock_exception,
                        result_path: &result_path,
                    },
                )
            })
            .collect();

        TestFile {
            class_name: HARNESS_NAME.to_string(),
            namespace: format!("{}Harness", HARNESS_NAME),
            framework: ctx.framework,
            usings: ctx.namespaces(),
            methods,
            needs_accessor: ctx.instance.needs_accessor(),
            copyright: None,
            provenance: None,
        }
    }

    /// Calculate outputs and move every pending case to `OutputAssigned`
    pub async fn calculate(
        &self,
        ctx: &MethodContext<'_>,
        source_project: &SourceProject,
        cases: &mut [BoundaryCase],
    ) -> Result<CalculationReport> {
        let mut report = CalculationReport::default();
        let pending: Vec<usize> = cases
            .iter()
            .enumerate()
            .filter(|(_, c)| c.needs_output())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            tracing::info!("no cases need output calculation");
            return Ok(report);
        }

        self.workspace.prepare().await?;
        let harness = {
            let refs: Vec<&BoundaryCase> = pending.iter().map(|&i| &cases[i]).collect();
            self.harness_file(ctx, &refs)
        };
        tokio::fs::write(self.workspace.source_path(), harness.render()).await?;
        let project_path = self.workspace.project_path();
        let csproj = project::render_test_project(
            &self.templates,
            source_project,
            ctx.framework,
            &project_path,
        )?;
        tokio::fs::write(&project_path, csproj).await?;
        tracing::info!(
            cases = pending.len(),
            workspace = %self.workspace.root().display(),
            "output calculation harness written"
        );

        let ran = match self.runner.run(&project_path).await {
            Ok(outcome) => {
                if !outcome.success {
                    tracing::warn!(
                        code = ?outcome.exit_code,
                        "output calculation run failed, missing results count as exceptions"
                    );
                }
                report.run = Some(outcome);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "output calculation could not run, all pending cases throw");
                report.run_error = Some(e.to_string());
                false
            }
        };

        let return_type = ctx.unit.output.type_name.clone();
        for i in pending {
            let case = &mut cases[i];
            let observed = if ran {
                match tokio::fs::read_to_string(self.workspace.result_path(case.index)).await {
                    Ok(content) => decode_result(&content, &return_type),
                    Err(e) => {
                        tracing::debug!(case = %case.name, error = %e, "no result file");
                        Expectation::Throws
                    }
                }
            } else {
                Expectation::Throws
            };
            case.assign_output(observed)?;
            if case.reclassified {
                report.reclassified.push(case.name.clone());
            }
            report.calculated += 1;
        }

        tracing::info!(
            calculated = report.calculated,
            reclassified = report.reclassified.len(),
            "outputs calculated"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Exception", "int", Expectation::Throws)]
    #[case("  Exception\n", "int", Expectation::Throws)]
    #[case("", "int", Expectation::Throws)]
    #[case("NoException", "void", Expectation::Completes)]
    #[case("5", "int", Expectation::Returns(Some("5".into())))]
    #[case("null", "Order", Expectation::Returns(None))]
    #[case("\"Exception\"", "string", Expectation::Returns(Some("Exception".into())))]
    #[case("\"a\\nb\"", "string", Expectation::Returns(Some("a\nb".into())))]
    #[case("\"2020-01-01T00:00:00\"", "DateTime", Expectation::Returns(Some("\"2020-01-01T00:00:00\"".into())))]
    #[case("{\"Id\":1}", "Order", Expectation::Returns(Some("{\"Id\":1}".into())))]
    fn test_decode_result(#[case] content: &str, #[case] return_type: &str, #[case] expected: Expectation) {
        assert_eq!(decode_result(content, return_type), expected);
    }

    #[test]
    fn test_workspace_layout() {
        let ws = HarnessWorkspace::new("/tmp/harness").unwrap();
        assert_eq!(ws.result_path(3), PathBuf::from("/tmp/harness/outputJsons/3.json"));
        assert_eq!(ws.project_path(), PathBuf::from("/tmp/harness/OutputCalc.csproj"));
    }

    #[tokio::test]
    async fn test_prepare_clears_stale_results() {
        let dir = tempfile::TempDir::new().unwrap();
        let ws = HarnessWorkspace::new(dir.path().join("calc")).unwrap();
        ws.prepare().await.unwrap();
        std::fs::write(ws.result_path(0), "5").unwrap();
        ws.prepare().await.unwrap();
        assert!(!ws.result_path(0).exists());
        assert!(ws.results_dir().is_dir());
    }
}
