//! Persisted trace format
//!
//! A trace file (conventionally `funcIORec.json`) is a JSON array of
//! [`RecordedCall`] trees written by the capture side.

use super::node::{CapturedOutput, ConstructorParam, CorrelationId, NamedValue, SourceLocation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// File name the capture side writes traces to
pub const TRACE_FILE_NAME: &str = "funcIORec.json";

/// One recorded invocation with its nested calls
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(title = "Recorded call", description = "One captured invocation and its nested calls")]
pub struct RecordedCall {
    /// Identity of the receiver at capture time
    pub correlation: CorrelationId,

    /// Owning type name
    pub type_name: String,

    /// Invoked method name
    pub method_name: String,

    /// Module (assembly) the type was loaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Namespaces the generated test must import
    #[serde(default)]
    pub namespaces: Vec<String>,

    pub location: SourceLocation,

    /// Parameters in declaration order
    #[serde(default)]
    pub inputs: Vec<NamedValue>,

    /// Receiver field state at capture time
    #[serde(default)]
    pub fields: Vec<NamedValue>,

    /// First constructor's parameter types; `"default"` marks value types
    #[serde(default)]
    #[schemars(with = "Vec<String>")]
    pub constructor_parameters: Vec<ConstructorParam>,

    /// Absent for methods returning nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<CapturedOutput>,

    /// Calls recorded while this one was executing
    #[serde(default)]
    pub children: Vec<RecordedCall>,
}
