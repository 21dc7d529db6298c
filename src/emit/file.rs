//! Test file rendering

use super::method::TestMethod;
use super::seams;
use super::tree::{self, CodeWriter};
use super::TestFramework;
use crate::meta::Provenance;

/// `System` namespaces every generated file imports
pub const SYSTEM_USINGS: &[&str] = &[
    "System",
    "System.Collections.Generic",
    "System.IO",
    "System.Linq",
    "System.Reflection",
    "System.Text",
    "System.Threading.Tasks",
];

const LIBRARY_USINGS: &[&str] = &["FluentAssertions", "Moq", "Newtonsoft.Json"];

/// A complete C# test file
#[derive(Debug, Clone)]
pub struct TestFile {
    /// Class under test; the test class is `{class_name}Tests`
    pub class_name: String,
    pub namespace: String,
    pub framework: TestFramework,
    /// Namespaces of the unit and its mocks
    pub usings: Vec<String>,
    pub methods: Vec<TestMethod>,
    /// Emit the `TestSeams` helper class
    pub needs_accessor: bool,
    /// Company named in the copyright header; no header when absent
    pub copyright: Option<String>,
    pub provenance: Option<Provenance>,
}

impl TestFile {
    pub fn test_class_name(&self) -> String {
        format!("{}Tests", self.class_name)
    }

    /// Deduplicated usings: the fixed system list, other `System.*`
    /// namespaces sorted, then everything else sorted
    pub fn using_lines(&self) -> Vec<String> {
        let mut system: Vec<String> = Vec::new();
        let mut other: Vec<String> = Vec::new();

        let extra = self
            .usings
            .iter()
            .map(String::as_str)
            .chain(LIBRARY_USINGS.iter().copied())
            .chain(std::iter::once(self.framework.namespace()));

        for ns in extra {
            let ns = ns.trim().trim_start_matches("using ").trim_end_matches(';').trim();
            if ns.is_empty() || SYSTEM_USINGS.contains(&ns) {
                continue;
            }
            let bucket = if ns == "System" || ns.starts_with("System.") {
                &mut system
            } else {
                &mut other
            };
            if !bucket.iter().any(|n| n == ns) {
                bucket.push(ns.to_string());
            }
        }
        system.sort();
        other.sort();

        SYSTEM_USINGS
            .iter()
            .map(|s| s.to_string())
            .chain(system)
            .chain(other)
            .map(|ns| format!("using {};", ns))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut w = CodeWriter::new();
        let class_name = self.test_class_name();

        if let Some(company) = &self.copyright {
            w.line(format!(
                "// <copyright file=\"{}.cs\" company=\"{}\">",
                class_name, company
            ));
            w.line(format!("//     Copyright (c) {}. All rights reserved.", company));
            w.line("// </copyright>");
        }
        if let Some(provenance) = &self.provenance {
            for line in provenance.header_lines() {
                w.line(format!("// {}", line));
            }
        }
        if !w.is_empty() {
            w.blank();
        }

        for line in self.using_lines() {
            w.line(line);
        }
        w.blank();

        let methods = &self.methods;
        let framework = self.framework;
        let needs_accessor = self.needs_accessor;
        w.block(format!("namespace {}", self.namespace), |w| {
            w.line("/// <summary>");
            w.line(format!("/// {}", class_name));
            w.line("/// </summary>");
            if let Some(attribute) = framework.class_attribute() {
                w.line(format!("[{}]", attribute));
            }
            w.block(format!("public class {}", class_name), |w| {
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        w.blank();
                    }
                    w.extend(method.stmts.iter().cloned());
                }
            });
            if needs_accessor {
                w.blank();
                w.push(seams::accessor_class());
            }
        });

        tree::render(&w.finish(), 0)
    }
}
