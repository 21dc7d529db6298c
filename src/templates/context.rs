//! Template context structures
//!
//! Plain serializable views handed to the prompt and project templates.

use serde::Serialize;

/// Context for the case enumeration prompt
#[derive(Debug, Clone, Serialize)]
pub struct EnumerateContext {
    /// Source text of the method under test
    pub function_body: String,
    /// `Interface.Method` names the test may mock
    pub mockable_functions: Vec<String>,
}

/// Context for the per-case input synthesis prompt
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizeContext {
    pub function_body: String,
    /// `type name` declarations in parameter order
    pub parameters: Vec<String>,
    /// Normal-case inputs as a JSON array of `{name, type, value}`
    pub normal_inputs_json: String,
    /// The full descriptor line, tags included
    pub case_description: String,
}

/// One NuGet package reference
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PackageView {
    pub id: String,
    pub version: String,
}

impl PackageView {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

/// Context for the generated test project file
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectContext {
    pub sdk: String,
    pub target_framework: String,
    pub packages: Vec<PackageView>,
    /// Paths relative to the generated project's directory
    pub project_references: Vec<String>,
}
