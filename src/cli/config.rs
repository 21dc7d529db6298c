//! Config and schema CLI commands

use clap::{Args, ValueEnum};
use std::path::PathBuf;
use utsynth::config::CONFIG_FILE_NAME;
use utsynth::{Error, RecordedCall, Result, SynthConfig};

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Directory to write utsynth.yaml into
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn cmd_init(args: InitArgs) -> Result<()> {
    let path = args.dir.join(CONFIG_FILE_NAME);
    if path.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }

    std::fs::create_dir_all(&args.dir).map_err(Error::Io)?;
    std::fs::write(&path, SynthConfig::default_yaml()?).map_err(Error::Io)?;
    println!("✓ Created: {}", path.display());
    println!("  Set completion.endpoint and completion.deployment, then export the API key variable.");
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SchemaKind {
    /// Trace file (funcIORec.json)
    Trace,
    /// utsynth.yaml
    Config,
}

pub fn cmd_schema(kind: SchemaKind) -> Result<()> {
    match kind {
        SchemaKind::Trace => print_schema::<Vec<RecordedCall>>(),
        SchemaKind::Config => print_schema::<SynthConfig>(),
    }
}

fn print_schema<T: schemars::JsonSchema>() -> Result<()> {
    let schema = schemars::schema_for!(T);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
