//! CLI command implementations
//!
//! - `generate`: full and normal-only suite generation
//! - `inspect`: what a recorded call turns into, without generating
//! - `config`: init and schema commands
//! - `util`: shared arguments and configuration loading

pub mod config;
pub mod generate;
pub mod inspect;
pub mod util;

pub use config::{cmd_init, cmd_schema, InitArgs, SchemaKind};
pub use generate::{cmd_generate, cmd_normal, GenerateArgs};
pub use inspect::cmd_inspect;
pub use util::TargetArgs;
