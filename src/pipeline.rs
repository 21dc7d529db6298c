//! Pipeline orchestration
//!
//! ```text
//! load trace -> select root -> unit + mock plan + instance plan -> method source
//!   -> enumerate cases -> synthesize inputs -> calculate outputs -> finalize
//!   -> assemble + write -> run suite
//! ```
//!
//! Every collaborator (completion provider, build runner, seam provider,
//! templates) is a handle owned by the [`Pipeline`]; nothing is global.
//! A failing stage aborts the run with its error. Files written by earlier
//! stages stay on disk.

use crate::assemble::{self, SuiteOptions, WrittenSuite};
use crate::calculate::{HarnessWorkspace, OutputCalculator};
use crate::case::BoundaryCase;
use crate::completion::{AzureOpenAiProvider, CompletionError, CompletionProvider, ScriptedProvider};
use crate::config::{CompletionConfig, SynthConfig};
use crate::emit::{ConfiguredSeams, InstancePlan, MethodContext, SeamProvider};
use crate::enumerate::CaseEnumerator;
use crate::error::{Error, Result};
use crate::meta::{GenerationRecord, Provenance};
use crate::project::SourceProject;
use crate::runner::{BuildRunner, DotnetRunner, RunOutcome};
use crate::source::{self, FunctionSource};
use crate::synthesize::{InputSource, InputSynthesizer};
use crate::templates::Templates;
use crate::trace::{CallTrace, CallTraceNode, MockPlan, NodeId, TestableUnit, UnresolvedCall};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which recorded root is the method under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// The root whose recorded range covers `file:line`
    At { file: String, line: u32 },
    /// The trace's only root
    SoleRoot,
}

impl TargetSelector {
    /// Parse `path/to/File.cs:42`
    pub fn parse_location(location: &str) -> Result<Self> {
        let (file, line) = location
            .rsplit_once(':')
            .ok_or_else(|| Error::Config(format!("expected FILE:LINE, got `{}`", location)))?;
        let line = line
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid line number in `{}`", location)))?;
        Ok(TargetSelector::At {
            file: file.to_string(),
            line,
        })
    }

    /// The selected root of `trace`
    pub fn select<'t>(&self, trace: &'t CallTrace) -> Result<&'t CallTraceNode> {
        match self {
            TargetSelector::At { file, line } => trace.find_root(file, *line),
            TargetSelector::SoleRoot => {
                let mut roots = trace.roots();
                match (roots.next(), roots.next()) {
                    (Some(root), None) => Ok(root),
                    (None, _) => Err(Error::Trace("the trace records no calls".into())),
                    (Some(_), Some(_)) => Err(Error::Trace(format!(
                        "the trace records {} calls; choose one with --at FILE:LINE",
                        trace.roots().count()
                    ))),
                }
            }
        }
    }
}

/// What to generate a suite for
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub trace_path: PathBuf,
    pub target: TargetSelector,
    /// Root for relative output paths and source lookup
    pub solution_dir: PathBuf,
    /// Project under test; found next to the traced source when absent
    pub project: Option<PathBuf>,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// `Type.Method` of the unit under test
    pub target: String,
    /// Boundary case names in suite order
    pub cases: Vec<String>,
    pub reclassified: Vec<String>,
    /// Cases whose inputs fell back to the normal case
    pub fallback_inputs: Vec<String>,
    pub unresolved_calls: Vec<UnresolvedCall>,
    pub written: WrittenSuite,
    pub suite_run: Option<RunOutcome>,
    pub suite_run_error: Option<String>,
}

/// Everything derived from the trace before any completion request
#[derive(Debug, Clone)]
pub struct Prepared {
    pub trace_name: String,
    pub trace_content: String,
    pub root: NodeId,
    pub unit: TestableUnit,
    pub mocks: MockPlan,
    pub instance: InstancePlan,
    pub function: FunctionSource,
    pub source_project: SourceProject,
}

impl Prepared {
    pub fn context(&self, framework: crate::emit::TestFramework) -> MethodContext<'_> {
        MethodContext {
            unit: &self.unit,
            mocks: &self.mocks,
            instance: &self.instance,
            framework,
        }
    }

    pub fn provenance(&self) -> Provenance {
        Provenance::new(
            self.trace_name.clone(),
            format!("{}.{}", self.unit.type_name, self.unit.method_name),
            self.trace_content.as_bytes(),
        )
    }
}

/// Test synthesis pipeline with its collaborators
pub struct Pipeline {
    config: SynthConfig,
    templates: Templates,
    completion: Option<Arc<dyn CompletionProvider>>,
    runner: Arc<dyn BuildRunner>,
    seams: Arc<dyn SeamProvider>,
}

impl Pipeline {
    /// Pipeline with the configured templates, seams and `dotnet` runner
    /// and no completion provider
    pub fn new(config: SynthConfig) -> Result<Self> {
        let templates = Templates::load(config.generation.template_dir.as_deref())?;
        let runner = Arc::new(DotnetRunner::new(&config.runner));
        let seams = Arc::new(ConfiguredSeams::new(config.generation.seams.clone()));
        Ok(Self {
            config,
            templates,
            completion: None,
            runner,
            seams,
        })
    }

    pub fn with_completion(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(provider);
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn BuildRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_seams(mut self, seams: Arc<dyn SeamProvider>) -> Self {
        self.seams = seams;
        self
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    fn output_dir(&self, request: &GenerateRequest) -> PathBuf {
        request.solution_dir.join(&self.config.workspace.output_dir)
    }

    /// Load the trace and derive everything the generators need
    pub fn prepare(&self, request: &GenerateRequest) -> Result<Prepared> {
        let trace_content = std::fs::read_to_string(&request.trace_path).map_err(|e| {
            Error::Trace(format!(
                "cannot read trace {}: {}",
                request.trace_path.display(),
                e
            ))
        })?;
        let trace = CallTrace::from_json(&trace_content)?;
        let root = request.target.select(&trace)?;
        tracing::info!(unit = %root.label(), location = %root.location, "target selected");

        let unit = TestableUnit::from_node(root);
        let mocks = MockPlan::derive(&trace, root.id);
        let instance = InstancePlan::build(
            &root.type_name,
            &root.constructor_parameters,
            &root.fields,
            &mocks,
            self.seams.as_ref(),
        );

        let source_path = source::resolve_source_path(&root.location.file, &request.solution_dir);
        let function = match &source_path {
            Some(path) => source::load_function(path, &root.location).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "cannot extract method source, using its signature");
                signature_only(&unit, root)
            }),
            None => {
                tracing::warn!(file = %root.location.file, "traced source file not found, using the method signature");
                signature_only(&unit, root)
            }
        };

        let project_path = match (&request.project, &source_path) {
            (Some(project), _) => project.clone(),
            (None, Some(path)) => SourceProject::find_for_source(path)?,
            (None, None) => {
                return Err(Error::Project(format!(
                    "cannot locate {} to find its project; pass --project",
                    root.location.file
                )))
            }
        };
        let source_project = SourceProject::load(&project_path)?;

        tracing::info!(
            mocks = mocks.requirements.len(),
            unresolved = mocks.unresolved.len(),
            project = %project_path.display(),
            "trace prepared"
        );

        Ok(Prepared {
            trace_name: request
                .trace_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| request.trace_path.display().to_string()),
            trace_content,
            root: root.id,
            unit,
            mocks,
            instance,
            function,
            source_project,
        })
    }

    fn suite_options(&self, prepared: &Prepared) -> SuiteOptions {
        let generation = &self.config.generation;
        SuiteOptions {
            namespace: generation
                .namespace
                .clone()
                .unwrap_or_else(|| assemble::default_namespace(&prepared.unit.namespaces)),
            copyright: generation.copyright.clone(),
            provenance: generation.provenance.then(|| prepared.provenance()),
        }
    }

    /// Full run: normal case plus completion-driven boundary cases
    pub async fn run(&self, request: &GenerateRequest) -> Result<PipelineReport> {
        let provider = self
            .completion
            .clone()
            .ok_or_else(|| CompletionError::NotConfigured("no completion provider".into()))?;
        let choices = self.config.completion.choices;

        let prepared = self.prepare(request)?;
        let ctx = prepared.context(self.config.generation.framework);

        let descriptors = CaseEnumerator::new(Arc::clone(&provider), self.templates.clone(), choices)
            .enumerate(&prepared.function.text, &prepared.mocks.mockable_functions())
            .await?;

        let inputs = InputSynthesizer::new(Arc::clone(&provider), self.templates.clone(), choices)
            .synthesize(&prepared.function.text, &prepared.unit, &descriptors)
            .await?;

        let mut cases: Vec<BoundaryCase> = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| BoundaryCase::from_descriptor(i, d))
            .collect();
        for (case, case_inputs) in cases.iter_mut().zip(inputs) {
            case.assign_inputs(case_inputs)?;
        }

        let workspace = HarnessWorkspace::new(
            request
                .solution_dir
                .join(&self.config.workspace.harness_dir),
        )?;
        let calculation = OutputCalculator::new(Arc::clone(&self.runner), self.templates.clone(), workspace)
            .calculate(&ctx, &prepared.source_project, &mut cases)
            .await?;

        for case in cases.iter_mut() {
            case.finalize()?;
        }
        tracing::info!(cases = cases.len(), "cases finalized");

        let fallback_inputs = cases
            .iter()
            .filter(|c| c.input_source == Some(InputSource::Fallback))
            .map(|c| c.name.clone())
            .collect();
        let case_names: Vec<String> = cases.iter().map(|c| c.name.clone()).collect();

        let file = assemble::assemble_suite(&ctx, &cases, &self.suite_options(&prepared))?;
        let (written, suite_run, suite_run_error) =
            self.write_and_run(request, &prepared, &file, case_names.clone()).await?;

        Ok(PipelineReport {
            target: format!("{}.{}", prepared.unit.type_name, prepared.unit.method_name),
            cases: case_names,
            reclassified: calculation.reclassified,
            fallback_inputs,
            unresolved_calls: prepared.mocks.unresolved.clone(),
            written,
            suite_run,
            suite_run_error,
        })
    }

    /// Suite containing only the normal-case test; no completion provider
    /// is involved
    pub async fn generate_normal_only(&self, request: &GenerateRequest) -> Result<PipelineReport> {
        let prepared = self.prepare(request)?;
        let ctx = prepared.context(self.config.generation.framework);
        let file = assemble::assemble_suite(&ctx, &[], &self.suite_options(&prepared))?;
        let (written, suite_run, suite_run_error) =
            self.write_and_run(request, &prepared, &file, Vec::new()).await?;

        Ok(PipelineReport {
            target: format!("{}.{}", prepared.unit.type_name, prepared.unit.method_name),
            cases: Vec::new(),
            reclassified: Vec::new(),
            fallback_inputs: Vec::new(),
            unresolved_calls: prepared.mocks.unresolved.clone(),
            written,
            suite_run,
            suite_run_error,
        })
    }

    async fn write_and_run(
        &self,
        request: &GenerateRequest,
        prepared: &Prepared,
        file: &crate::emit::TestFile,
        case_names: Vec<String>,
    ) -> Result<(WrittenSuite, Option<RunOutcome>, Option<String>)> {
        let mut record = GenerationRecord::new(&prepared.provenance());
        record.cases = case_names;
        let written = assemble::write_suite(
            &self.templates,
            file,
            &prepared.source_project,
            &self.output_dir(request),
            record,
        )
        .await?;

        if !self.config.runner.run_suite {
            return Ok((written, None, None));
        }
        match self.runner.run(&written.project_path).await {
            Ok(outcome) => {
                if outcome.success {
                    tracing::info!("generated suite passed");
                } else {
                    tracing::warn!(code = ?outcome.exit_code, "generated suite failed");
                }
                Ok((written, Some(outcome), None))
            }
            Err(e) => {
                tracing::warn!(error = %e, "generated suite could not run");
                Ok((written, None, Some(e.to_string())))
            }
        }
    }
}

/// Completion provider named by the configuration: the scripted one when a
/// script is configured, otherwise the Azure OpenAI service
pub fn completion_provider(config: &CompletionConfig) -> Result<Arc<dyn CompletionProvider>> {
    match &config.script {
        Some(script) => {
            tracing::info!(script = %script.display(), "using scripted completions");
            Ok(Arc::new(ScriptedProvider::load(script)?))
        }
        None => Ok(Arc::new(AzureOpenAiProvider::from_env(config)?)),
    }
}

/// Stand-in prompt text when the method's source is unavailable
fn signature_only(unit: &TestableUnit, node: &CallTraceNode) -> FunctionSource {
    let params: Vec<String> = unit
        .parameters
        .iter()
        .map(|p| format!("{} {}", p.type_name, p.name))
        .collect();
    FunctionSource {
        text: format!(
            "public {} {}({})",
            unit.output.type_name,
            unit.method_name,
            params.join(", ")
        ),
        start_line: node.location.start_line,
        end_line: node.location.end_line,
        from_syntax: false,
    }
}

/// Find the single trace file below `solution_dir`
///
/// Directories named in `skip` (generated output) and `.git` are not
/// searched. Zero or several matches are errors.
pub fn discover_trace(solution_dir: &Path, file_name: &str, skip: &[&Path]) -> Result<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![solution_dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name();
            if path.is_dir() {
                let skipped = name == ".git" || skip.iter().any(|s| path.ends_with(s));
                if !skipped {
                    pending.push(path);
                }
            } else if name.to_string_lossy().eq_ignore_ascii_case(file_name) {
                found.push(path);
            }
        }
    }

    match found.len() {
        0 => Err(Error::Trace(format!(
            "no {} found under {}",
            file_name,
            solution_dir.display()
        ))),
        1 => Ok(found.remove(0)),
        n => {
            found.sort();
            Err(Error::Trace(format!(
                "{} {} files found under {}, pass --trace: {}",
                n,
                file_name,
                solution_dir.display(),
                found
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_location() {
        assert_eq!(
            TargetSelector::parse_location(r"C:\src\Calc.cs:12").unwrap(),
            TargetSelector::At {
                file: r"C:\src\Calc.cs".into(),
                line: 12
            }
        );
        assert!(TargetSelector::parse_location("Calc.cs").is_err());
        assert!(TargetSelector::parse_location("Calc.cs:x").is_err());
    }

    #[test]
    fn test_discover_trace_skips_output() {
        let dir = TempDir::new().unwrap();
        let generated = dir.path().join(".CSharpUTGen");
        let nested = dir.path().join("src").join("bin");
        std::fs::create_dir_all(&generated).unwrap();
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(generated.join("funcIORec.json"), "[]").unwrap();
        std::fs::write(nested.join("funcIORec.json"), "[]").unwrap();

        let found = discover_trace(dir.path(), "funcIORec.json", &[Path::new(".CSharpUTGen")]).unwrap();
        assert_eq!(found, nested.join("funcIORec.json"));
    }

    #[test]
    fn test_discover_trace_rejects_ambiguity() {
        let dir = TempDir::new().unwrap();
        for sub in ["a", "b"] {
            let d = dir.path().join(sub);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join("funcIORec.json"), "[]").unwrap();
        }
        let err = discover_trace(dir.path(), "funcIORec.json", &[]).unwrap_err();
        assert!(err.to_string().contains("2 funcIORec.json files"));

        let empty = TempDir::new().unwrap();
        assert!(discover_trace(empty.path(), "funcIORec.json", &[]).is_err());
    }
}
