//! The method under test, reduced to what code generation needs

use super::node::{CallTraceNode, CapturedOutput, NamedValue};

/// Method under test derived from a root [`CallTraceNode`]
///
/// Boundary cases work on value copies (see [`with_case_inputs`](Self::with_case_inputs));
/// the unit derived from the trace is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct TestableUnit {
    pub method_name: String,
    pub type_name: String,
    /// Parameters in declaration order, carrying the recorded values
    pub parameters: Vec<NamedValue>,
    pub output: CapturedOutput,
    pub namespaces: Vec<String>,
}

impl TestableUnit {
    pub fn from_node(node: &CallTraceNode) -> Self {
        Self {
            method_name: node.method_name.clone(),
            type_name: node.type_name.clone(),
            parameters: node.inputs.clone(),
            output: node.output.clone(),
            namespaces: node
                .namespaces
                .iter()
                .filter(|ns| !ns.trim().is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn is_void(&self) -> bool {
        self.output.is_void()
    }

    /// Copy carrying per-case input values
    ///
    /// Overrides match by parameter name. Interface-typed parameters keep
    /// their binding because they are always fed from mocks.
    pub fn with_case_inputs(&self, inputs: &[NamedValue]) -> Self {
        let mut copy = self.clone();
        for param in copy.parameters.iter_mut().filter(|p| !p.is_interface()) {
            if let Some(over) = inputs.iter().find(|i| i.name == param.name) {
                param.value = over.value.clone();
            }
        }
        copy
    }

    /// Copy carrying a different expected return payload
    pub fn with_output_value(&self, value: Option<String>) -> Self {
        let mut copy = self.clone();
        copy.output.value = value;
        copy
    }

    /// Plain (non-mock) parameters, the ones boundary cases vary
    pub fn value_parameters(&self) -> impl Iterator<Item = &NamedValue> {
        self.parameters.iter().filter(|p| !p.is_interface())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::CallTrace;

    fn unit() -> TestableUnit {
        let trace = CallTrace::from_json(
            r#"[{
                "correlation": 1,
                "type_name": "Greeter",
                "method_name": "Greet",
                "namespaces": ["Demo", ""],
                "location": {"file": "Greeter.cs", "start_line": 3, "end_line": 9},
                "inputs": [
                    {"name": "name", "type": "string", "value": "Ada"},
                    {"name": "log", "type": "ILog", "value": null,
                     "interface": {"interface_type": "ILog", "runtime_type": "ConsoleLog", "correlation": 9}}
                ],
                "output": {"type": "string", "value": "Hello Ada"}
            }]"#,
        )
        .unwrap();
        let unit = TestableUnit::from_node(trace.roots().next().unwrap());
        unit
    }

    #[test]
    fn test_from_node() {
        let unit = unit();
        assert_eq!(unit.method_name, "Greet");
        assert_eq!(unit.namespaces, vec!["Demo".to_string()]);
        assert_eq!(unit.parameters.len(), 2);
        assert_eq!(unit.value_parameters().count(), 1);
        assert!(!unit.is_void());
    }

    #[test]
    fn test_case_copy_leaves_original_untouched() {
        let unit = unit();
        let case = unit.with_case_inputs(&[
            NamedValue::new("name", "string", None),
            NamedValue::new("log", "ILog", Some("ignored")),
        ]);
        assert_eq!(case.parameters[0].value, None);
        assert_eq!(case.parameters[1].value, None);
        assert_eq!(unit.parameters[0].value.as_deref(), Some("Ada"));

        let with_output = unit.with_output_value(Some("Hi".into()));
        assert_eq!(with_output.output.value.as_deref(), Some("Hi"));
        assert_eq!(unit.output.value.as_deref(), Some("Hello Ada"));
    }
}
