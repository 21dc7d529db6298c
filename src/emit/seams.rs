//! Injection seams — how captured state reaches the instance under test
//!
//! Every captured field is assigned one [`SeamKind`]:
//!
//! - `Constructor`: the value is passed as the matching constructor argument
//! - `Property`: `instance.Name = value;`
//! - `Accessor`: `TestSeams.SetField(instance, "name", value);` through a
//!   helper class emitted once into the test file
//!
//! The decision belongs to a [`SeamProvider`] so callers can shape it per
//! project without touching the generators.

use crate::codec;
use crate::trace::{ConstructorParam, MockPlan, NamedValue};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tree::{CodeWriter, Stmt};

/// Name of the helper class behind [`SeamKind::Accessor`]
pub const ACCESSOR_CLASS: &str = "TestSeams";

/// Resolved seam for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeamKind {
    Constructor,
    Property,
    Accessor,
}

/// Configured seam for a field; `Auto` lets the provider decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SeamStrategy {
    #[default]
    Auto,
    Constructor,
    Property,
    Accessor,
}

/// Decides the seam of each captured field
pub trait SeamProvider: Send + Sync {
    fn seam_for(
        &self,
        owner_type: &str,
        field: &NamedValue,
        constructor: &[ConstructorParam],
        fields: &[NamedValue],
    ) -> SeamKind;
}

/// Default provider with per-field overrides keyed `Type.field`
#[derive(Debug, Clone, Default)]
pub struct ConfiguredSeams {
    overrides: BTreeMap<String, SeamStrategy>,
}

impl ConfiguredSeams {
    pub fn new(overrides: BTreeMap<String, SeamStrategy>) -> Self {
        Self { overrides }
    }

    fn auto(field: &NamedValue, constructor: &[ConstructorParam], fields: &[NamedValue]) -> SeamKind {
        let Some(binding) = &field.interface else {
            return SeamKind::Accessor;
        };
        let in_constructor = constructor
            .iter()
            .any(|p| matches!(p, ConstructorParam::Mock(t) if *t == binding.interface_type));
        let same_typed = fields
            .iter()
            .filter_map(|f| f.interface.as_ref())
            .filter(|b| b.interface_type == binding.interface_type)
            .count();
        if in_constructor && same_typed == 1 {
            SeamKind::Constructor
        } else {
            SeamKind::Accessor
        }
    }
}

impl SeamProvider for ConfiguredSeams {
    fn seam_for(
        &self,
        owner_type: &str,
        field: &NamedValue,
        constructor: &[ConstructorParam],
        fields: &[NamedValue],
    ) -> SeamKind {
        let key = format!("{}.{}", owner_type, field.name);
        match self.overrides.get(&key).copied().unwrap_or_default() {
            SeamStrategy::Auto => Self::auto(field, constructor, fields),
            SeamStrategy::Constructor => SeamKind::Constructor,
            SeamStrategy::Property => SeamKind::Property,
            SeamStrategy::Accessor => SeamKind::Accessor,
        }
    }
}

/// Value written through a seam
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedValue {
    /// Variable of a declared mock; its `.Object` is injected
    Mock(String),
    /// A recorded value, encoded by the codec at render time
    Literal {
        type_name: String,
        value: Option<String>,
    },
}

impl InjectedValue {
    fn expression(&self) -> String {
        match self {
            InjectedValue::Mock(var) => format!("{}.Object", var),
            InjectedValue::Literal { type_name, value } => codec::encode(type_name, value.as_deref()),
        }
    }
}

/// Post-construction assignment of one field
#[derive(Debug, Clone, PartialEq)]
pub struct Injection {
    pub seam: SeamKind,
    pub member: String,
    pub value: InjectedValue,
}

/// How the instance under test is created and populated
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePlan {
    pub type_name: String,
    pub constructor_args: Vec<String>,
    pub injections: Vec<Injection>,
}

impl InstancePlan {
    /// Resolve constructor arguments and field injections for `owner_type`
    ///
    /// A constructor parameter of reference type receives the mock of the
    /// field whose seam is `Constructor` and whose interface matches, or a
    /// fresh throwaway mock when no such field exists. Value-type parameters
    /// receive `default`.
    pub fn build(
        owner_type: &str,
        constructor: &[ConstructorParam],
        fields: &[NamedValue],
        mocks: &MockPlan,
        seams: &dyn SeamProvider,
    ) -> Self {
        // (interface type, mock variable, field name)
        let mut constructor_fed: Vec<(String, String, String)> = Vec::new();
        let mut injections = Vec::new();

        for field in fields {
            let seam = seams.seam_for(owner_type, field, constructor, fields);
            let value = match (&field.interface, mocks.field(&field.name)) {
                (Some(_), Some(mock)) => InjectedValue::Mock(mock.variable.clone()),
                _ => InjectedValue::Literal {
                    type_name: field.type_name.clone(),
                    value: field.value.clone(),
                },
            };

            match (seam, &value, &field.interface) {
                (SeamKind::Constructor, InjectedValue::Mock(var), Some(binding)) => {
                    constructor_fed.push((
                        binding.interface_type.clone(),
                        var.clone(),
                        field.name.clone(),
                    ));
                }
                (SeamKind::Constructor, _, _) => {
                    tracing::debug!(
                        field = %field.name,
                        "constructor seam needs an interface-typed field, using accessor"
                    );
                    injections.push(Injection {
                        seam: SeamKind::Accessor,
                        member: field.name.clone(),
                        value,
                    });
                }
                _ => injections.push(Injection {
                    seam,
                    member: field.name.clone(),
                    value,
                }),
            }
        }

        let constructor_args = constructor
            .iter()
            .map(|param| match param {
                ConstructorParam::Default => "default".to_string(),
                ConstructorParam::Mock(type_name) => {
                    match constructor_fed.iter().position(|(t, _, _)| t == type_name) {
                        Some(pos) => format!("{}.Object", constructor_fed.remove(pos).1),
                        None => format!("new Mock<{}>().Object", type_name),
                    }
                }
            })
            .collect();

        // No constructor parameter took these mocks
        for (_, var, member) in constructor_fed {
            injections.push(Injection {
                seam: SeamKind::Accessor,
                member,
                value: InjectedValue::Mock(var),
            });
        }

        Self {
            type_name: owner_type.to_string(),
            constructor_args,
            injections,
        }
    }

    pub fn needs_accessor(&self) -> bool {
        self.injections.iter().any(|i| i.seam == SeamKind::Accessor)
    }

    /// Construction plus injection statements
    pub fn statements(&self) -> Vec<Stmt> {
        let mut w = CodeWriter::new();
        w.line(format!(
            "var instance = new {}({});",
            self.type_name,
            self.constructor_args.join(", ")
        ));
        for injection in &self.injections {
            let value = injection.value.expression();
            match injection.seam {
                SeamKind::Property => {
                    w.line(format!("instance.{} = {};", injection.member, value));
                }
                _ => {
                    w.line(format!(
                        "{}.SetField(instance, {}, {});",
                        ACCESSOR_CLASS,
                        codec::escape_csharp_string(&injection.member),
                        value
                    ));
                }
            }
        }
        w.finish()
    }
}

/// The `TestSeams` helper class, emitted once per file when needed
pub fn accessor_class() -> Stmt {
    let mut w = CodeWriter::new();
    w.block(
        "public static void SetField(object instance, string name, object value)",
        |w| {
            w.line("var type = instance.GetType();");
            w.line("const BindingFlags flags = BindingFlags.Public | BindingFlags.NonPublic | BindingFlags.Instance;");
            w.block("while (type != null)", |w| {
                w.line("var field = type.GetField(name, flags);");
                w.block("if (field != null)", |w| {
                    w.line("field.SetValue(instance, value);");
                    w.line("return;");
                });
                w.line("type = type.BaseType;");
            });
            w.line("throw new MissingFieldException(instance.GetType().FullName, name);");
        },
    );
    Stmt::Block {
        head: format!("internal static class {}", ACCESSOR_CLASS),
        body: w.finish(),
        tail: String::new(),
    }
}
