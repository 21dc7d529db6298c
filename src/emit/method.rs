//! Test method generators

use super::tree::{CodeWriter, Stmt};
use super::{Expectation, MethodContext, EXCEPTION_MARKER, NO_EXCEPTION_MARKER};
use crate::codec;
use crate::trace::{MockRequirement, MockedCall, NamedValue, TestableUnit};
use std::collections::HashSet;

/// A rendered-ready test method
#[derive(Debug, Clone, PartialEq)]
pub struct TestMethod {
    pub name: String,
    pub stmts: Vec<Stmt>,
}

/// One boundary case as the generator needs it
#[derive(Debug, Clone)]
pub struct BoundaryMethod<'a> {
    /// Identifier-safe case name
    pub case_name: &'a str,
    pub inputs: &'a [NamedValue],
    pub expectation: &'a Expectation,
    /// Mocked dependencies are set up to throw
    pub mock_exception: bool,
}

/// One harness case: inputs plus where to write the outcome
#[derive(Debug, Clone)]
pub struct HarnessMethod<'a> {
    pub case_name: &'a str,
    pub inputs: &'a [NamedValue],
    pub mock_exception: bool,
    pub result_path: &'a str,
}

/// How mocked calls are matched in `Setup`
#[derive(Clone, Copy, PartialEq, Eq)]
enum Matcher {
    Exact,
    Any,
}

/// How the mocked calls answer
#[derive(Clone, Copy, PartialEq, Eq)]
enum MockAnswer {
    Recorded,
    Throw,
}

/// Test of the recorded invocation itself
pub fn normal_case(ctx: &MethodContext<'_>) -> TestMethod {
    let unit = ctx.unit;
    let name = format!("Test{}InNormalCase", unit.method_name);
    let expectation = if unit.is_void() {
        Expectation::Completes
    } else {
        Expectation::Returns(unit.output.value.clone())
    };

    let mut body = CodeWriter::new();
    body.line("// Arrange");
    body.extend(mock_declarations(ctx));
    expected_line(&mut body, unit, &expectation);
    body.extend(setups(ctx, Matcher::Exact, MockAnswer::Recorded));
    body.extend(ctx.instance.statements());
    body.blank();
    act_and_assert(&mut body, ctx, unit, &expectation);

    skeleton(ctx, name, &format!("{}_NormalCase", unit.method_name), body)
}

/// Test of a synthesized boundary case
pub fn boundary_case(ctx: &MethodContext<'_>, case: &BoundaryMethod<'_>) -> TestMethod {
    let unit = ctx.unit.with_case_inputs(case.inputs);
    let name = format!("Test{}{}", unit.method_name, case.case_name);
    let answer = if case.mock_exception {
        MockAnswer::Throw
    } else {
        MockAnswer::Recorded
    };

    let mut body = CodeWriter::new();
    body.line("// Arrange");
    body.extend(mock_declarations(ctx));
    expected_line(&mut body, &unit, case.expectation);
    body.extend(setups(ctx, Matcher::Any, answer));
    body.extend(ctx.instance.statements());
    body.blank();
    act_and_assert(&mut body, ctx, &unit, case.expectation);

    skeleton(
        ctx,
        name,
        &format!("{}_{}", unit.method_name, case.case_name),
        body,
    )
}

/// Harness method recording the actual outcome of a boundary case
pub fn harness_case(ctx: &MethodContext<'_>, case: &HarnessMethod<'_>) -> TestMethod {
    let unit = ctx.unit.with_case_inputs(case.inputs);
    let name = format!("Test{}{}", unit.method_name, case.case_name);
    let answer = if case.mock_exception {
        MockAnswer::Throw
    } else {
        MockAnswer::Recorded
    };
    let call = invocation(ctx, &unit);

    let mut body = CodeWriter::new();
    body.line("// Arrange");
    body.extend(mock_declarations(ctx));
    body.extend(setups(ctx, Matcher::Any, answer));
    body.extend(ctx.instance.statements());
    body.blank();
    body.line("// Act");
    body.line("var jsonContent = string.Empty;");
    body.block("try", |w| {
        if unit.is_void() {
            w.line(format!("{};", call));
            w.line(format!("jsonContent = \"{}\";", NO_EXCEPTION_MARKER));
        } else {
            w.line(format!("var actual = {};", call));
            w.line("jsonContent = JsonConvert.SerializeObject(actual);");
        }
    });
    body.block("catch", |w| {
        w.line(format!("jsonContent = \"{}\";", EXCEPTION_MARKER));
    });
    body.blank();
    body.line(format!(
        "var resultPath = {};",
        codec::verbatim_literal(case.result_path)
    ));
    body.line("Directory.CreateDirectory(Path.GetDirectoryName(resultPath));");
    body.line("File.WriteAllText(resultPath, jsonContent);");

    skeleton(
        ctx,
        name,
        &format!("{}_{}", unit.method_name, case.case_name),
        body,
    )
}

fn skeleton(ctx: &MethodContext<'_>, name: String, summary: &str, body: CodeWriter) -> TestMethod {
    let mut w = CodeWriter::new();
    w.line("/// <summary>");
    w.line(format!("/// {}", summary));
    w.line("/// </summary>");
    w.line(format!("[{}]", ctx.framework.method_attribute()));
    w.push(Stmt::Block {
        head: format!("public void {}()", name),
        body: body.finish(),
        tail: String::new(),
    });
    TestMethod {
        name,
        stmts: w.finish(),
    }
}

fn mock_declarations(ctx: &MethodContext<'_>) -> Vec<Stmt> {
    ctx.mocks
        .requirements
        .iter()
        .map(|r| Stmt::line(format!("var {} = new Mock<{}>();", r.variable, r.interface_type)))
        .collect()
}

fn expected_line(w: &mut CodeWriter, unit: &TestableUnit, expectation: &Expectation) {
    if let Expectation::Returns(value) = expectation {
        if !unit.is_void() {
            w.line(format!(
                "var expected = {};",
                codec::encode(&unit.output.type_name, value.as_deref())
            ));
        }
    }
}

/// `Setup` statements for every observed call; identical setups collapse
fn setups(ctx: &MethodContext<'_>, matcher: Matcher, answer: MockAnswer) -> Vec<Stmt> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for requirement in &ctx.mocks.requirements {
        for call in &requirement.calls {
            let key = match matcher {
                Matcher::Exact => format!("{}|{}", requirement.variable, exact_call(call)),
                Matcher::Any => format!("{}|{}", requirement.variable, call.signature()),
            };
            if seen.insert(key) {
                out.extend(setup(requirement, call, matcher, answer));
            }
        }
    }
    out
}

fn exact_call(call: &MockedCall) -> String {
    let args: Vec<String> = call
        .arguments
        .iter()
        .map(|a| {
            if a.is_interface() {
                format!("It.IsAny<{}>()", a.type_name)
            } else {
                codec::encode(&a.type_name, a.value.as_deref())
            }
        })
        .collect();
    format!("x.{}({})", call.method_name, args.join(", "))
}

fn any_call(call: &MockedCall) -> String {
    let args: Vec<String> = call
        .arguments
        .iter()
        .map(|a| format!("It.IsAny<{}>()", a.type_name))
        .collect();
    format!("x.{}({})", call.method_name, args.join(", "))
}

fn setup(
    requirement: &MockRequirement,
    call: &MockedCall,
    matcher: Matcher,
    answer: MockAnswer,
) -> Vec<Stmt> {
    let target = match matcher {
        Matcher::Exact => exact_call(call),
        Matcher::Any => any_call(call),
    };
    let head = format!("{}.Setup(x => {})", requirement.variable, target);
    let tail = match answer {
        MockAnswer::Throw => Some(".Throws<Exception>();".to_string()),
        MockAnswer::Recorded if call.returns.is_void() => None,
        MockAnswer::Recorded => Some(format!(
            ".Returns({});",
            codec::encode(&call.returns.type_name, call.returns.value.as_deref())
        )),
    };

    match tail {
        Some(tail) => vec![Stmt::Line(head), Stmt::Indented(vec![Stmt::Line(tail)])],
        None => vec![Stmt::Line(format!("{};", head))],
    }
}

/// `instance.Method(args)` with mocks for interface-typed parameters
fn invocation(ctx: &MethodContext<'_>, unit: &TestableUnit) -> String {
    let args: Vec<String> = unit
        .parameters
        .iter()
        .map(|p| match (p.is_interface(), ctx.mocks.arg(&p.name)) {
            (true, Some(mock)) => format!("{}.Object", mock.variable),
            (true, None) => format!("new Mock<{}>().Object", p.type_name),
            (false, _) => codec::encode(&p.type_name, p.value.as_deref()),
        })
        .collect();
    format!("instance.{}({})", unit.method_name, args.join(", "))
}

fn act_and_assert(
    w: &mut CodeWriter,
    ctx: &MethodContext<'_>,
    unit: &TestableUnit,
    expectation: &Expectation,
) {
    let call = invocation(ctx, unit);
    let returns_value = matches!(expectation, Expectation::Returns(_)) && !unit.is_void();

    w.line("// Act");
    if returns_value {
        w.line(format!("var actual = {};", call));
    } else {
        w.line(format!("Action act = () => {};", call));
    }
    w.blank();
    w.line("// Assert");
    match expectation {
        Expectation::Throws => {
            w.line("act.Should().Throw<Exception>();");
        }
        _ if !returns_value => {
            w.line("act.Should().NotThrow();");
        }
        _ if codec::is_simple_type(&unit.output.type_name) => {
            w.line("actual.Should().Be(expected);");
        }
        _ => {
            w.line("actual.Should().BeEquivalentTo(expected);");
        }
    }
}
