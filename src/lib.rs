// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # utsynth — trace-driven unit test synthesis
//!
//! Turns one recorded C# method invocation into a compilable unit-test
//! suite.
//!
//! ## Core Concept
//!
//! A capture session records a call tree: the method under test, its
//! inputs, its receiver's fields and every call it made on injected
//! dependencies. From that single recording utsynth produces:
//!
//! - a **normal-case test** that replays the recording with Moq mocks and
//!   asserts the recorded result
//! - **boundary-case tests** enumerated by a completion model, whose inputs
//!   are synthesized by the model and whose expected outputs are measured by
//!   actually running the code in a throwaway harness project
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use utsynth::{GenerateRequest, Pipeline, ScriptedProvider, SynthConfig, TargetSelector};
//!
//! let pipeline = Pipeline::new(SynthConfig::default())?
//!     .with_completion(Arc::new(ScriptedProvider::load("script.yaml".as_ref())?));
//!
//! let report = pipeline
//!     .run(&GenerateRequest {
//!         trace_path: "funcIORec.json".into(),
//!         target: TargetSelector::parse_location("src/Calculator.cs:12")?,
//!         solution_dir: ".".into(),
//!         project: None,
//!     })
//!     .await?;
//! println!("wrote {}", report.written.source_path.display());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                                                                  │
//! │  funcIORec.json ──► CallTrace ──► TestableUnit + MockPlan        │
//! │                                        │                         │
//! │        source.rs (tree-sitter) ────────┤                         │
//! │                                        ▼                         │
//! │   normal_case ◄──────────────── MethodContext                    │
//! │                                        │                         │
//! │   CaseEnumerator ──► InputSynthesizer ──► OutputCalculator       │
//! │     (completion)       (completion)        (harness + runner)    │
//! │                                        │                         │
//! │                                        ▼                         │
//! │                 assemble_suite ──► {Class}Tests.cs + .csproj     │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

// Data model
pub mod codec;
pub mod error;
pub mod trace;
pub mod util;

// Code generation
pub mod emit;
pub mod templates;

// Project management
pub mod config;
pub mod meta;
pub mod project;
pub mod source;

// Collaborators
pub mod completion;
pub mod runner;

// Stages
pub mod assemble;
pub mod calculate;
pub mod case;
pub mod enumerate;
pub mod pipeline;
pub mod synthesize;

// Re-exports
pub use assemble::{assemble_suite, write_suite, SuiteOptions, WrittenSuite};
pub use calculate::{decode_result, CalculationReport, HarnessWorkspace, OutputCalculator};
pub use case::{BoundaryCase, CaseState};
pub use completion::{AzureOpenAiProvider, CompletionError, CompletionProvider, ScriptRule, ScriptedProvider};
pub use config::{CompletionConfig, GenerationConfig, RunnerConfig, SynthConfig, WorkspaceConfig};
pub use emit::{
    boundary_case, harness_case, normal_case, ConfiguredSeams, Expectation, InstancePlan,
    MethodContext, SeamProvider, SeamStrategy, TestFile, TestFramework,
};
pub use enumerate::{parse_candidate, parse_descriptor, CaseDescriptor, CaseEnumerator};
pub use error::{Error, Result};
pub use meta::{GenerationRecord, Provenance};
pub use pipeline::{
    completion_provider, discover_trace, GenerateRequest, Pipeline, PipelineReport, Prepared,
    TargetSelector,
};
pub use project::SourceProject;
pub use runner::{BuildRunner, DotnetRunner, RunOutcome};
pub use source::{extract_function, FunctionSource};
pub use synthesize::{parse_inputs, CaseInputs, InputSource, InputSynthesizer};
pub use templates::Templates;
pub use trace::{
    CallTrace, CallTraceNode, MockPlan, MockRequirement, NamedValue, RecordedCall, TestableUnit,
    UnresolvedCall,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
