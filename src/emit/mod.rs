//! Code emitter — C# test methods and files from trace data
//!
//! Three generators share one skeleton (doc comment, attribute, signature,
//! body) and the same arrange pieces:
//!
//! - [`normal_case`]: exact-argument mock setups, expected value from the trace
//! - [`boundary_case`]: any-argument setups, optional throwing mocks
//! - [`harness_case`]: runs the unit and writes the outcome to a result file
//!
//! Everything is built as a [`Stmt`] tree and rendered by [`tree::render`].

mod file;
mod method;
pub mod seams;
pub mod tree;

pub use file::{TestFile, SYSTEM_USINGS};
pub use method::{boundary_case, harness_case, normal_case, BoundaryMethod, HarnessMethod, TestMethod};
pub use seams::{ConfiguredSeams, InstancePlan, SeamKind, SeamProvider, SeamStrategy};
pub use tree::{CodeWriter, Stmt};

use crate::trace::{MockPlan, TestableUnit};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Result token the harness writes when the unit threw
pub const EXCEPTION_MARKER: &str = "Exception";
/// Result token the harness writes when a void unit completed
pub const NO_EXCEPTION_MARKER: &str = "NoException";

/// Unit test framework of the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TestFramework {
    #[default]
    MsTest,
    NUnit,
    XUnit,
}

impl TestFramework {
    pub fn namespace(self) -> &'static str {
        match self {
            TestFramework::MsTest => "Microsoft.VisualStudio.TestTools.UnitTesting",
            TestFramework::NUnit => "NUnit.Framework",
            TestFramework::XUnit => "Xunit",
        }
    }

    pub fn class_attribute(self) -> Option<&'static str> {
        match self {
            TestFramework::MsTest => Some("TestClass"),
            TestFramework::NUnit => Some("TestFixture"),
            TestFramework::XUnit => None,
        }
    }

    pub fn method_attribute(self) -> &'static str {
        match self {
            TestFramework::MsTest => "TestMethod",
            TestFramework::NUnit => "Test",
            TestFramework::XUnit => "Fact",
        }
    }

    /// NuGet packages the framework needs, as (id, version)
    pub fn packages(self) -> &'static [(&'static str, &'static str)] {
        match self {
            TestFramework::MsTest => &[
                ("MSTest.TestFramework", "2.1.1"),
                ("MSTest.TestAdapter", "2.1.1"),
            ],
            TestFramework::NUnit => &[("NUnit", "3.12.0"), ("NUnit3TestAdapter", "3.17.0")],
            TestFramework::XUnit => &[
                ("xunit", "2.4.1"),
                ("xunit.runner.visualstudio", "2.4.3"),
            ],
        }
    }
}

impl std::str::FromStr for TestFramework {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mstest" | "visualstudio" => Ok(TestFramework::MsTest),
            "nunit" => Ok(TestFramework::NUnit),
            "xunit" => Ok(TestFramework::XUnit),
            other => Err(format!("unknown test framework `{}`", other)),
        }
    }
}

/// What a generated test asserts about the call under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// The call throws
    Throws,
    /// The call returns this payload (`None` is the type's default)
    Returns(Option<String>),
    /// A void call completes without throwing
    Completes,
}

/// Everything the generators read about the unit under test
#[derive(Debug, Clone, Copy)]
pub struct MethodContext<'a> {
    pub unit: &'a TestableUnit,
    pub mocks: &'a MockPlan,
    pub instance: &'a InstancePlan,
    pub framework: TestFramework,
}

impl<'a> MethodContext<'a> {
    /// Namespaces the file must import for this unit and its mocks
    pub fn namespaces(&self) -> Vec<String> {
        let mut out: Vec<String> = self.unit.namespaces.clone();
        for ns in self.mocks.namespaces() {
            if !out.contains(ns) {
                out.push(ns.clone());
            }
        }
        out
    }
}
