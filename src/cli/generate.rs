//! Suite generation commands: generate, normal

use super::util::TargetArgs;
use clap::Args;
use std::path::PathBuf;
use utsynth::{completion_provider, Pipeline, PipelineReport, Result};

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Scripted completions (YAML) instead of the completion service
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Write the suite without running it
    #[arg(long)]
    pub no_run: bool,
}

impl GenerateArgs {
    fn pipeline_config(&self) -> Result<utsynth::SynthConfig> {
        let mut config = self.target.load_config()?;
        if let Some(script) = &self.script {
            config.completion.script = Some(script.clone());
        }
        if self.no_run {
            config.runner.run_suite = false;
        }
        Ok(config)
    }
}

pub async fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let config = args.pipeline_config()?;
    let request = args.target.request(&config)?;
    let provider = completion_provider(&config.completion)?;
    let pipeline = Pipeline::new(config)?.with_completion(provider);

    let report = pipeline.run(&request).await?;
    print_report(&report);
    Ok(())
}

pub async fn cmd_normal(args: GenerateArgs) -> Result<()> {
    let config = args.pipeline_config()?;
    let request = args.target.request(&config)?;
    let report = Pipeline::new(config)?.generate_normal_only(&request).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!("✓ Generated tests for {}", report.target);
    println!("  Source:  {}", report.written.source_path.display());
    println!("  Project: {}", report.written.project_path.display());

    if !report.cases.is_empty() {
        println!("\nBoundary cases ({}):", report.cases.len());
        for name in &report.cases {
            let mut notes = Vec::new();
            if report.reclassified.contains(name) {
                notes.push("throws when run");
            }
            if report.fallback_inputs.contains(name) {
                notes.push("normal-case inputs");
            }
            if notes.is_empty() {
                println!("  • {}", name);
            } else {
                println!("  • {} ({})", name, notes.join(", "));
            }
        }
    }

    if !report.unresolved_calls.is_empty() {
        println!("\n⚠ Calls not attributed to a mock ({}):", report.unresolved_calls.len());
        for call in &report.unresolved_calls {
            println!(
                "  {}.{} {}: {}",
                call.type_name, call.method_name, call.correlation, call.reason
            );
        }
    }

    match (&report.suite_run, &report.suite_run_error) {
        (Some(outcome), _) if outcome.success => println!("\n✓ Generated suite passed"),
        (Some(outcome), _) => {
            println!("\n✗ Generated suite failed (exit code {:?})", outcome.exit_code);
            if !outcome.stdout.trim().is_empty() {
                println!("{}", outcome.stdout.trim_end());
            }
        }
        (None, Some(error)) => println!("\n⚠ Generated suite was not run: {}", error),
        (None, None) => {}
    }
}
