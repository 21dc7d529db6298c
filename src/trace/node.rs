//! Recorded call values and the arena node type

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Constructor parameter sentinel meaning "value type, use `default`"
pub const DEFAULT_SENTINEL: &str = "default";

/// Runtime identity token issued at capture time
///
/// Tokens are handed out monotonically by a [`CorrelationIssuer`]; two
/// distinct live objects never share one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic source of [`CorrelationId`]s
#[derive(Debug)]
pub struct CorrelationIssuer {
    next: AtomicU64,
}

impl CorrelationIssuer {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Issue the next token
    pub fn issue(&self) -> CorrelationId {
        CorrelationId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CorrelationIssuer {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of a node inside a [`CallTrace`](super::CallTrace) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where the recorded invocation lives in the source tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceLocation {
    /// Source file path as recorded
    pub file: String,
    /// First line of the method (1-based)
    pub start_line: u32,
    /// Last line of the method (1-based, inclusive)
    pub end_line: u32,
}

impl SourceLocation {
    pub fn contains_line(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.file, self.start_line, self.end_line)
    }
}

/// Interface type, substituted runtime type and runtime identity of an
/// interface-typed input or field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InterfaceBinding {
    pub interface_type: String,
    pub runtime_type: String,
    /// Identity of the value held at capture time, not of its owner
    pub correlation: CorrelationId,
}

/// A named, typed, serialized value (parameter, field or mocked argument)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NamedValue {
    pub name: String,

    /// Declared or runtime type name
    #[serde(rename = "type")]
    pub type_name: String,

    /// Serialized payload; `None` when the value was null
    #[serde(default)]
    pub value: Option<String>,

    /// Present when the value is interface-typed and must be mocked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<InterfaceBinding>,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            value: value.map(str::to_string),
            interface: None,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.interface.is_some()
    }
}

/// Serialized return value of a recorded call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CapturedOutput {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub value: Option<String>,
}

impl CapturedOutput {
    pub fn void() -> Self {
        Self {
            type_name: "void".into(),
            value: None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.type_name.as_str(), "void" | "System.Void" | "Void" | "")
    }
}

/// One entry of the receiver's first constructor signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConstructorParam {
    /// Value type: pass `default`
    Default,
    /// Reference type: pass a mock of this type
    Mock(String),
}

impl From<String> for ConstructorParam {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed == DEFAULT_SENTINEL {
            ConstructorParam::Default
        } else {
            ConstructorParam::Mock(trimmed.to_string())
        }
    }
}

impl From<ConstructorParam> for String {
    fn from(p: ConstructorParam) -> Self {
        match p {
            ConstructorParam::Default => DEFAULT_SENTINEL.to_string(),
            ConstructorParam::Mock(t) => t,
        }
    }
}

/// A recorded invocation stored in the trace arena
#[derive(Debug, Clone)]
pub struct CallTraceNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Identity of the receiver at capture time
    pub correlation: CorrelationId,
    pub type_name: String,
    pub method_name: String,
    pub module: Option<String>,
    pub namespaces: Vec<String>,
    pub location: SourceLocation,
    pub inputs: Vec<NamedValue>,
    pub fields: Vec<NamedValue>,
    pub constructor_parameters: Vec<ConstructorParam>,
    pub output: CapturedOutput,
    pub children: Vec<NodeId>,
}

impl CallTraceNode {
    /// `Type.Method` label used in logs and reports
    pub fn label(&self) -> String {
        format!("{}.{}", self.type_name, self.method_name)
    }

    pub fn interface_fields(&self) -> impl Iterator<Item = &NamedValue> {
        self.fields.iter().filter(|f| f.is_interface())
    }

    pub fn interface_inputs(&self) -> impl Iterator<Item = &NamedValue> {
        self.inputs.iter().filter(|i| i.is_interface())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_is_monotonic() {
        let issuer = CorrelationIssuer::new();
        let a = issuer.issue();
        let b = issuer.issue();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constructor_param_sentinel() {
        let params: Vec<ConstructorParam> =
            serde_json::from_str(r#"["IDivider", "default", " ILogger "]"#).unwrap();
        assert_eq!(
            params,
            vec![
                ConstructorParam::Mock("IDivider".into()),
                ConstructorParam::Default,
                ConstructorParam::Mock("ILogger".into()),
            ]
        );
        let back = serde_json::to_string(&params).unwrap();
        assert_eq!(back, r#"["IDivider","default","ILogger"]"#);
    }

    #[test]
    fn test_void_output() {
        assert!(CapturedOutput::void().is_void());
        assert!(CapturedOutput {
            type_name: "System.Void".into(),
            value: None
        }
        .is_void());
        assert!(!CapturedOutput {
            type_name: "int".into(),
            value: Some("5".into())
        }
        .is_void());
    }
}
