//! CLI utility helpers

use clap::Args;
use std::path::{Path, PathBuf};
use utsynth::{discover_trace, GenerateRequest, Result, SynthConfig, TargetSelector, TestFramework};

/// Which recorded call to work on and where the solution lives
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Trace file (default: the single funcIORec.json below the solution directory)
    #[arg(short, long)]
    pub trace: Option<PathBuf>,

    /// Method under test as FILE:LINE (default: the trace's only call)
    #[arg(short, long, value_name = "FILE:LINE")]
    pub at: Option<String>,

    /// Solution directory; output directories are created here
    #[arg(short, long, default_value = ".")]
    pub solution_dir: PathBuf,

    /// Project under test (default: nearest .csproj above the traced source)
    #[arg(short, long)]
    pub project: Option<PathBuf>,

    /// Configuration file (default: utsynth.yaml found from the solution directory upwards)
    #[arg(short, long, env = "UTSYNTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Test framework of the generated code
    #[arg(short, long)]
    pub framework: Option<TestFramework>,

    /// Directory with template overrides
    #[arg(long)]
    pub template_dir: Option<PathBuf>,
}

impl TargetArgs {
    /// Configuration file merged with command-line overrides
    pub fn load_config(&self) -> Result<SynthConfig> {
        let mut config = match &self.config {
            Some(path) => SynthConfig::load(path)?,
            None => SynthConfig::discover_or_default(&self.solution_dir)?,
        };
        if let Some(framework) = self.framework {
            config.generation.framework = framework;
        }
        if let Some(dir) = &self.template_dir {
            config.generation.template_dir = Some(dir.clone());
        }
        Ok(config)
    }

    pub fn request(&self, config: &SynthConfig) -> Result<GenerateRequest> {
        let target = match &self.at {
            Some(location) => TargetSelector::parse_location(location)?,
            None => TargetSelector::SoleRoot,
        };
        let trace_path = match &self.trace {
            Some(path) => path.clone(),
            None => {
                let workspace = &config.workspace;
                let skip: [&Path; 2] = [&workspace.output_dir, &workspace.harness_dir];
                discover_trace(&self.solution_dir, &workspace.trace_file, &skip)?
            }
        };
        Ok(GenerateRequest {
            trace_path,
            target,
            solution_dir: self.solution_dir.clone(),
            project: self.project.clone(),
        })
    }
}
