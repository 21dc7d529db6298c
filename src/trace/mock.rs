//! Mock requirements — interface-typed dependencies and their observed calls
//!
//! A nested call belongs to a dependency only when its receiver token equals
//! exactly one interface binding recorded on the parent call. Calls matching
//! no binding, or more than one, are kept aside as [`UnresolvedCall`]s so
//! they can be reported instead of disappearing.

use super::node::{CallTraceNode, CapturedOutput, CorrelationId, NamedValue, NodeId};
use super::CallTrace;
use crate::util::sanitize_identifier;
use std::fmt;

/// Whether a dependency reaches the unit through a field or a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOwner {
    Field,
    Arg,
}

impl MockOwner {
    fn prefix(self) -> &'static str {
        match self {
            MockOwner::Field => "field",
            MockOwner::Arg => "arg",
        }
    }
}

/// One call observed on a mocked dependency
#[derive(Debug, Clone, PartialEq)]
pub struct MockedCall {
    pub method_name: String,
    pub arguments: Vec<NamedValue>,
    pub returns: CapturedOutput,
}

impl MockedCall {
    fn from_node(node: &CallTraceNode) -> Self {
        Self {
            method_name: node.method_name.clone(),
            arguments: node.inputs.clone(),
            returns: node.output.clone(),
        }
    }

    /// Key used to collapse setups that only differ by argument values
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.arguments.iter().map(|a| a.type_name.as_str()).collect();
        format!("{}({})", self.method_name, types.join(","))
    }
}

/// An interface-typed field or input that must be mocked
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequirement {
    pub owner: MockOwner,
    /// Field or parameter name as recorded
    pub member_name: String,
    /// Synthetic variable name (`field_X` / `arg_X`)
    pub variable: String,
    pub interface_type: String,
    pub runtime_type: String,
    pub correlation: CorrelationId,
    pub calls: Vec<MockedCall>,
    pub namespaces: Vec<String>,
}

/// Why a nested call could not be attached to a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    NoMatchingDependency,
    /// Several bindings carry the same token
    AmbiguousDependency(Vec<String>),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::NoMatchingDependency => write!(f, "no matching dependency"),
            UnresolvedReason::AmbiguousDependency(names) => {
                write!(f, "ambiguous between {}", names.join(", "))
            }
        }
    }
}

/// Nested call that is not mocked
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedCall {
    pub type_name: String,
    pub method_name: String,
    pub correlation: CorrelationId,
    pub reason: UnresolvedReason,
}

/// Every mock the unit needs plus the calls that could not be attributed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockPlan {
    pub requirements: Vec<MockRequirement>,
    pub unresolved: Vec<UnresolvedCall>,
}

impl MockPlan {
    /// Derive the plan for the calls nested under `parent`
    pub fn derive(trace: &CallTrace, parent: NodeId) -> Self {
        let node = trace.node(parent);
        let mut plan = MockPlan {
            requirements: requirements_for(node),
            unresolved: Vec::new(),
        };

        for child in trace.children(parent) {
            let matches: Vec<usize> = plan
                .requirements
                .iter()
                .enumerate()
                .filter(|(_, r)| r.correlation == child.correlation)
                .map(|(i, _)| i)
                .collect();

            match matches.as_slice() {
                [single] => {
                    let requirement = &mut plan.requirements[*single];
                    requirement.calls.push(MockedCall::from_node(child));
                    for ns in child.namespaces.iter().filter(|ns| !ns.trim().is_empty()) {
                        if !requirement.namespaces.contains(ns) {
                            requirement.namespaces.push(ns.clone());
                        }
                    }
                }
                [] => plan.push_unresolved(node, child, UnresolvedReason::NoMatchingDependency),
                many => {
                    let names = many
                        .iter()
                        .map(|i| plan.requirements[*i].variable.clone())
                        .collect();
                    plan.push_unresolved(node, child, UnresolvedReason::AmbiguousDependency(names));
                }
            }
        }

        plan
    }

    fn push_unresolved(&mut self, parent: &CallTraceNode, child: &CallTraceNode, reason: UnresolvedReason) {
        tracing::warn!(
            parent = %parent.label(),
            call = %child.label(),
            correlation = %child.correlation,
            %reason,
            "nested call left unmocked"
        );
        self.unresolved.push(UnresolvedCall {
            type_name: child.type_name.clone(),
            method_name: child.method_name.clone(),
            correlation: child.correlation,
            reason,
        });
    }

    pub fn field(&self, name: &str) -> Option<&MockRequirement> {
        self.requirements
            .iter()
            .find(|r| r.owner == MockOwner::Field && r.member_name == name)
    }

    pub fn arg(&self, name: &str) -> Option<&MockRequirement> {
        self.requirements
            .iter()
            .find(|r| r.owner == MockOwner::Arg && r.member_name == name)
    }

    /// Names of every mocked method, for the enumeration prompt
    pub fn mockable_functions(&self) -> Vec<String> {
        let mut names = Vec::new();
        for requirement in &self.requirements {
            for call in &requirement.calls {
                let name = format!("{}.{}", requirement.interface_type, call.method_name);
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &String> {
        self.requirements.iter().flat_map(|r| r.namespaces.iter())
    }
}

fn requirements_for(node: &CallTraceNode) -> Vec<MockRequirement> {
    let fields = node.fields.iter().map(|f| (MockOwner::Field, f));
    let inputs = node.inputs.iter().map(|i| (MockOwner::Arg, i));

    fields
        .chain(inputs)
        .filter_map(|(owner, value)| {
            let binding = value.interface.as_ref()?;
            Some(MockRequirement {
                owner,
                member_name: value.name.clone(),
                variable: format!("{}_{}", owner.prefix(), sanitize_identifier(&value.name)),
                interface_type: binding.interface_type.clone(),
                runtime_type: binding.runtime_type.clone(),
                correlation: binding.correlation,
                calls: Vec::new(),
                namespaces: Vec::new(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn trace(children: &str, second_field_token: u64) -> CallTrace {
        let json = format!(
            r#"[{{
                "correlation": 1,
                "type_name": "Calculator",
                "method_name": "Div",
                "location": {{"file": "Calculator.cs", "start_line": 1, "end_line": 20}},
                "inputs": [
                    {{"name": "a", "type": "int", "value": "6"}},
                    {{"name": "log", "type": "ILog", "value": null,
                      "interface": {{"interface_type": "ILog", "runtime_type": "ConsoleLog", "correlation": 30}}}}
                ],
                "fields": [
                    {{"name": "_divider", "type": "IDivider", "value": null,
                      "interface": {{"interface_type": "IDivider", "runtime_type": "Divider", "correlation": 10}}}},
                    {{"name": "_backup", "type": "IDivider", "value": null,
                      "interface": {{"interface_type": "IDivider", "runtime_type": "Divider", "correlation": {second}}}}},
                    {{"name": "_scale", "type": "int", "value": "2"}}
                ],
                "output": {{"type": "int", "value": "3"}},
                "children": [{children}]
            }}]"#,
            children = children,
            second = second_field_token
        );
        CallTrace::from_json(&json).unwrap()
    }

    fn child(token: u64, method: &str) -> String {
        format!(
            r#"{{"correlation": {token}, "type_name": "Divider", "method_name": "{method}",
                "namespaces": ["Demo.Math"],
                "location": {{"file": "Divider.cs", "start_line": 1, "end_line": 3}},
                "inputs": [{{"name": "x", "type": "int", "value": "6"}}, {{"name": "y", "type": "int", "value": "2"}}],
                "output": {{"type": "int", "value": "3"}}}}"#
        )
    }

    #[test]
    fn test_requirement_per_interface_member() {
        let trace = trace("", 11);
        let plan = MockPlan::derive(&trace, trace.roots().next().unwrap().id);
        let vars: Vec<&str> = plan.requirements.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(vars, vec!["field__divider", "field__backup", "arg_log"]);
        assert!(plan.requirements.iter().all(|r| r.calls.is_empty()));
        assert!(plan.field("_scale").is_none());
        assert_eq!(plan.arg("log").unwrap().interface_type, "ILog");
    }

    #[test]
    fn test_child_attaches_to_exact_token() {
        let children = format!("{},{}", child(10, "Divide"), child(11, "Divide"));
        let trace = trace(&children, 11);
        let plan = MockPlan::derive(&trace, trace.roots().next().unwrap().id);

        let divider = plan.field("_divider").unwrap();
        assert_eq!(divider.calls.len(), 1);
        assert_eq!(divider.calls[0].signature(), "Divide(int,int)");
        assert_eq!(divider.namespaces, vec!["Demo.Math".to_string()]);
        assert_eq!(plan.field("_backup").unwrap().calls.len(), 1);
        assert!(plan.unresolved.is_empty());
        assert_eq!(plan.mockable_functions(), vec!["IDivider.Divide".to_string()]);
    }

    #[test]
    fn test_unmatched_and_colliding_tokens_are_reported() {
        let children = format!("{},{}", child(10, "Divide"), child(99, "Reset"));
        let trace = trace(&children, 10);
        let plan = MockPlan::derive(&trace, trace.roots().next().unwrap().id);

        assert!(plan.requirements.iter().all(|r| r.calls.is_empty()));
        assert_eq!(plan.unresolved.len(), 2);
        assert_eq!(
            plan.unresolved[0].reason,
            UnresolvedReason::AmbiguousDependency(vec![
                "field__divider".to_string(),
                "field__backup".to_string()
            ])
        );
        assert_eq!(plan.unresolved[1].reason, UnresolvedReason::NoMatchingDependency);
        assert_eq!(plan.unresolved[1].method_name, "Reset");
    }
}
