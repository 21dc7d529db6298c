//! Suite rendering for each test framework from the fixture trace

use rstest::rstest;
use std::path::Path;
use utsynth::assemble::{assemble_suite, SuiteOptions};
use utsynth::emit::{ConfiguredSeams, InstancePlan, MethodContext, SeamStrategy, TestFramework};
use utsynth::trace::{CallTrace, MockPlan, TestableUnit};

fn trace() -> CallTrace {
    CallTrace::load(
        &Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/traces/calculator.json"),
    )
    .unwrap()
}

fn render(framework: TestFramework, seams: &ConfiguredSeams, line: u32) -> String {
    let trace = trace();
    let root = trace.find_root("Demo/Calculator.cs", line).unwrap();
    let unit = TestableUnit::from_node(root);
    let mocks = MockPlan::derive(&trace, root.id);
    let instance = InstancePlan::build(
        &root.type_name,
        &root.constructor_parameters,
        &root.fields,
        &mocks,
        seams,
    );
    let ctx = MethodContext {
        unit: &unit,
        mocks: &mocks,
        instance: &instance,
        framework,
    };
    assemble_suite(
        &ctx,
        &[],
        &SuiteOptions {
            namespace: "Demo.Tests".into(),
            copyright: Some("Contoso".into()),
            provenance: None,
        },
    )
    .unwrap()
    .render()
}

#[rstest]
#[case(TestFramework::MsTest, Some("[TestClass]"), "[TestMethod]", "using Microsoft.VisualStudio.TestTools.UnitTesting;")]
#[case(TestFramework::NUnit, Some("[TestFixture]"), "[Test]", "using NUnit.Framework;")]
#[case(TestFramework::XUnit, None, "[Fact]", "using Xunit;")]
fn test_framework_shapes_file(
    #[case] framework: TestFramework,
    #[case] class_attribute: Option<&str>,
    #[case] method_attribute: &str,
    #[case] using: &str,
) {
    let file = render(framework, &ConfiguredSeams::default(), 15);

    assert!(file.starts_with("// <copyright file=\"CalculatorTests.cs\" company=\"Contoso\">"));
    assert!(file.contains(using));
    assert!(file.contains(method_attribute));
    match class_attribute {
        Some(attribute) => assert!(file.contains(attribute)),
        None => assert!(!file.contains("[TestClass]") && !file.contains("[TestFixture]")),
    }
    assert!(file.contains("using FluentAssertions;"));
    assert!(file.contains("using Moq;"));
}

#[test]
fn test_braces_balance() {
    let file = render(TestFramework::MsTest, &ConfiguredSeams::default(), 22);
    assert_eq!(file.matches('{').count(), file.matches('}').count());
    assert!(file.ends_with("}\n"));
}

#[test]
fn test_accessor_seam_emits_helper_once() {
    let seams = ConfiguredSeams::new(
        [("Calculator._divider".to_string(), SeamStrategy::Accessor)]
            .into_iter()
            .collect(),
    );
    let file = render(TestFramework::MsTest, &seams, 22);

    assert!(file.contains("var instance = new Calculator(new Mock<IDivider>().Object);"));
    assert!(file.contains(r#"TestSeams.SetField(instance, "_divider", field__divider.Object);"#));
    assert_eq!(file.matches("class TestSeams").count(), 1);
}

#[test]
fn test_property_seam() {
    let seams = ConfiguredSeams::new(
        [("Calculator._divider".to_string(), SeamStrategy::Property)]
            .into_iter()
            .collect(),
    );
    let file = render(TestFramework::MsTest, &seams, 22);
    assert!(file.contains("instance._divider = field__divider.Object;"));
    assert!(!file.contains("TestSeams"));
}
