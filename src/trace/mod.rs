//! Trace model — the recorded call tree and its derived views
//!
//! A capture session writes nested [`RecordedCall`] trees. Loading flattens
//! them into a read-only arena ([`CallTrace`]) where nodes point at their
//! parent and children by [`NodeId`]. From a root node the pipeline derives:
//!
//! - a [`TestableUnit`] — the method under test reduced to name, owner,
//!   parameters, return and namespaces
//! - a [`MockPlan`] — one [`MockRequirement`] per interface-typed field or
//!   input, with the calls observed on it

mod mock;
mod node;
mod record;
mod unit;

pub use mock::{MockOwner, MockPlan, MockRequirement, MockedCall, UnresolvedCall, UnresolvedReason};
pub use node::{
    CallTraceNode, CapturedOutput, ConstructorParam, CorrelationId, CorrelationIssuer,
    InterfaceBinding, NamedValue, NodeId, SourceLocation, DEFAULT_SENTINEL,
};
pub use record::{RecordedCall, TRACE_FILE_NAME};
pub use unit::TestableUnit;

use crate::error::{Error, Result};
use crate::util::normalize_path_key;
use std::path::Path;

/// Arena holding every recorded call of a trace file
#[derive(Debug, Clone, Default)]
pub struct CallTrace {
    nodes: Vec<CallTraceNode>,
    roots: Vec<NodeId>,
}

impl CallTrace {
    /// Parse a trace file's JSON content
    pub fn from_json(content: &str) -> Result<Self> {
        let records: Vec<RecordedCall> = serde_json::from_str(content)
            .map_err(|e| Error::Trace(format!("invalid trace JSON: {}", e)))?;
        Self::from_records(records)
    }

    /// Load a trace file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Trace(format!("cannot read trace {}: {}", path.display(), e))
        })?;
        let trace = Self::from_json(&content)?;
        tracing::debug!(
            path = %path.display(),
            roots = trace.roots.len(),
            nodes = trace.nodes.len(),
            "loaded call trace"
        );
        Ok(trace)
    }

    /// Flatten recorded trees into the arena, validating each record
    pub fn from_records(records: Vec<RecordedCall>) -> Result<Self> {
        let mut trace = CallTrace::default();
        for record in records {
            let id = trace.insert(record, None)?;
            trace.roots.push(id);
        }
        Ok(trace)
    }

    fn insert(&mut self, record: RecordedCall, parent: Option<NodeId>) -> Result<NodeId> {
        validate_record(&record)?;

        let id = NodeId(self.nodes.len());
        let RecordedCall {
            correlation,
            type_name,
            method_name,
            module,
            namespaces,
            location,
            inputs,
            fields,
            constructor_parameters,
            output,
            children,
        } = record;

        self.nodes.push(CallTraceNode {
            id,
            parent,
            correlation,
            type_name,
            method_name,
            module,
            namespaces,
            location,
            inputs,
            fields,
            constructor_parameters,
            output: output.unwrap_or_else(CapturedOutput::void),
            children: Vec::new(),
        });

        for child in children {
            let child_id = self.insert(child, Some(id))?;
            self.nodes[id.0].children.push(child_id);
        }

        Ok(id)
    }

    /// Node by id; ids are only minted by this arena
    pub fn node(&self, id: NodeId) -> &CallTraceNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&CallTraceNode> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> impl Iterator<Item = &CallTraceNode> {
        self.roots.iter().map(move |id| self.node(*id))
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &CallTraceNode> {
        self.node(id).children.iter().map(move |c| self.node(*c))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Select the root whose recorded location covers `file:line`
    ///
    /// Paths compare case-insensitively with either separator. When several
    /// roots match, the most recently recorded one wins.
    pub fn find_root(&self, file: &str, line: u32) -> Result<&CallTraceNode> {
        let wanted = normalize_path_key(file);
        self.roots()
            .filter(|node| {
                paths_match(&normalize_path_key(&node.location.file), &wanted)
                    && node.location.contains_line(line)
            })
            .last()
            .ok_or_else(|| Error::TargetNotFound {
                file: file.to_string(),
                line,
            })
    }
}

/// Either path may be relative; a suffix match on a `/` boundary counts
fn paths_match(recorded: &str, wanted: &str) -> bool {
    recorded == wanted
        || recorded.ends_with(&format!("/{}", wanted))
        || wanted.ends_with(&format!("/{}", recorded))
}

fn validate_record(record: &RecordedCall) -> Result<()> {
    if record.type_name.trim().is_empty() {
        return Err(Error::Trace(format!(
            "record {} has an empty type name",
            record.correlation
        )));
    }
    if record.method_name.trim().is_empty() {
        return Err(Error::Trace(format!(
            "record {} ({}) has an empty method name",
            record.correlation, record.type_name
        )));
    }
    if record.location.start_line > record.location.end_line {
        return Err(Error::Trace(format!(
            "record {}.{} has an inverted line range {}",
            record.type_name, record.method_name, record.location
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACE: &str = r#"[
        {
            "correlation": 1,
            "type_name": "Calculator",
            "method_name": "Add",
            "location": { "file": "C:\\src\\Demo\\Calculator.cs", "start_line": 10, "end_line": 14 },
            "inputs": [
                { "name": "a", "type": "int", "value": "2" },
                { "name": "b", "type": "int", "value": "3" }
            ],
            "output": { "type": "int", "value": "5" }
        },
        {
            "correlation": 2,
            "type_name": "Calculator",
            "method_name": "Div",
            "location": { "file": "C:\\src\\Demo\\Calculator.cs", "start_line": 16, "end_line": 22 },
            "children": [
                {
                    "correlation": 3,
                    "type_name": "Divider",
                    "method_name": "Divide",
                    "location": { "file": "C:\\src\\Demo\\Divider.cs", "start_line": 5, "end_line": 8 }
                }
            ]
        }
    ]"#;

    #[test]
    fn test_flattens_into_arena() {
        let trace = CallTrace::from_json(TRACE).unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.roots().count(), 2);

        let div = trace.roots().nth(1).unwrap();
        let children: Vec<_> = trace.children(div.id).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].parent, Some(div.id));
        assert_eq!(children[0].method_name, "Divide");
        assert!(children[0].output.is_void());
    }

    #[test]
    fn test_find_root_by_location() {
        let trace = CallTrace::from_json(TRACE).unwrap();
        let add = trace.find_root("c:/src/demo/calculator.cs", 12).unwrap();
        assert_eq!(add.method_name, "Add");

        let div = trace.find_root("Demo/Calculator.cs", 16).unwrap();
        assert_eq!(div.method_name, "Div");

        assert!(matches!(
            trace.find_root("Calculator.cs", 40),
            Err(Error::TargetNotFound { line: 40, .. })
        ));
    }

    #[test]
    fn test_find_root_prefers_latest_recording() {
        let doubled = format!(
            "[{},{}]",
            r#"{"correlation": 1, "type_name": "A", "method_name": "Run", "location": {"file": "a.cs", "start_line": 1, "end_line": 9}, "output": {"type": "int", "value": "1"}}"#,
            r#"{"correlation": 2, "type_name": "A", "method_name": "Run", "location": {"file": "a.cs", "start_line": 1, "end_line": 9}, "output": {"type": "int", "value": "2"}}"#
        );
        let trace = CallTrace::from_json(&doubled).unwrap();
        let root = trace.find_root("a.cs", 3).unwrap();
        assert_eq!(root.output.value.as_deref(), Some("2"));
    }

    #[test]
    fn test_rejects_invalid_records() {
        let empty_method = r#"[{"correlation": 1, "type_name": "A", "method_name": " ",
            "location": {"file": "a.cs", "start_line": 1, "end_line": 2}}]"#;
        assert!(matches!(
            CallTrace::from_json(empty_method),
            Err(Error::Trace(_))
        ));

        let inverted = r#"[{"correlation": 1, "type_name": "A", "method_name": "M",
            "location": {"file": "a.cs", "start_line": 5, "end_line": 2}}]"#;
        assert!(matches!(CallTrace::from_json(inverted), Err(Error::Trace(_))));

        assert!(matches!(CallTrace::from_json("{"), Err(Error::Trace(_))));
    }
}
