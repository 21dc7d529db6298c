//! Project descriptors
//!
//! Reads the `.csproj` of the project under test and renders the `.csproj`
//! of a generated test project (the final suite or the output-calculation
//! harness) that references the same projects.

use crate::emit::TestFramework;
use crate::error::{Error, Result};
use crate::templates::context::{PackageView, ProjectContext};
use crate::templates::{Templates, TEST_PROJECT};
use crate::util::relative_path;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Newtonsoft.Json version used when the source project has none
pub const DEFAULT_NEWTONSOFT_VERSION: &str = "13.0.1";

/// What the generated projects need from the project under test
#[derive(Debug, Clone, PartialEq)]
pub struct SourceProject {
    pub path: PathBuf,
    pub sdk: String,
    pub target_framework: String,
    pub newtonsoft_version: Option<String>,
    /// Referenced projects, resolved against this project's directory
    pub project_references: Vec<PathBuf>,
}

struct Patterns {
    sdk: Regex,
    target_framework: Regex,
    target_frameworks: Regex,
    package_reference: Regex,
    project_reference: Regex,
    attribute: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        let compile =
            |p: &str| Regex::new(p).map_err(|e| Error::Project(format!("bad pattern {}: {}", p, e)));
        Ok(Self {
            sdk: compile(r#"<Project\b[^>]*\bSdk\s*=\s*"([^"]+)""#)?,
            target_framework: compile(r"<TargetFramework>\s*([^<\s]+)\s*</TargetFramework>")?,
            target_frameworks: compile(r"<TargetFrameworks>\s*([^<]+?)\s*</TargetFrameworks>")?,
            package_reference: compile(r"<PackageReference\b([^>]*)>")?,
            project_reference: compile(r"<ProjectReference\b([^>]*)>")?,
            attribute: compile(r#"(\w+)\s*=\s*"([^"]*)""#)?,
        })
    }

    fn attribute<'t>(&self, attributes: &'t str, name: &str) -> Option<&'t str> {
        self.attribute
            .captures_iter(attributes)
            .find(|c| c[1].eq_ignore_ascii_case(name))
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
    }
}

impl SourceProject {
    /// Parse project file `content` located at `path`
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let patterns = Patterns::new()?;
        let invalid = |what: &str| Error::Project(format!("{}: {}", path.display(), what));

        let sdk = patterns
            .sdk
            .captures(content)
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| invalid("missing Project Sdk attribute"))?;

        let target_framework = match patterns.target_framework.captures(content) {
            Some(c) => c[1].to_string(),
            None => patterns
                .target_frameworks
                .captures(content)
                .and_then(|c| {
                    c[1].split(';')
                        .map(str::trim)
                        .find(|f| !f.is_empty())
                        .map(str::to_string)
                })
                .ok_or_else(|| invalid("missing TargetFramework"))?,
        };

        let newtonsoft_version = patterns
            .package_reference
            .captures_iter(content)
            .filter_map(|c| {
                let attrs = c.get(1)?.as_str();
                let include = patterns.attribute(attrs, "Include")?;
                if include.eq_ignore_ascii_case("Newtonsoft.Json") {
                    patterns.attribute(attrs, "Version").map(str::to_string)
                } else {
                    None
                }
            })
            .next();

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let project_references = patterns
            .project_reference
            .captures_iter(content)
            .filter_map(|c| patterns.attribute(c.get(1)?.as_str(), "Include"))
            .map(|include| normalize(&base.join(include.replace('\\', "/"))))
            .collect();

        Ok(Self {
            path: path.to_path_buf(),
            sdk,
            target_framework,
            newtonsoft_version,
            project_references,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Project(format!("cannot read {}: {}", path.display(), e)))?;
        Self::parse(path, &content)
    }

    /// Nearest `.csproj` in the directory of `source_file` or above
    pub fn find_for_source(source_file: &Path) -> Result<PathBuf> {
        let mut current = source_file.parent();
        while let Some(dir) = current {
            if let Ok(entries) = std::fs::read_dir(dir) {
                let mut projects: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok().map(|e| e.path()))
                    .filter(|p| p.extension().is_some_and(|ext| ext == "csproj"))
                    .collect();
                projects.sort();
                if let Some(first) = projects.into_iter().next() {
                    return Ok(first);
                }
            }
            current = dir.parent();
        }
        Err(Error::Project(format!(
            "no .csproj found above {}",
            source_file.display()
        )))
    }

    /// This project followed by its references, without duplicates
    pub fn reference_closure(&self) -> Vec<PathBuf> {
        let mut out = vec![normalize(&self.path)];
        for reference in &self.project_references {
            if !out.contains(reference) {
                out.push(reference.clone());
            }
        }
        out
    }
}

/// Package references of a generated test project
pub fn test_packages(framework: TestFramework, newtonsoft_version: Option<&str>) -> Vec<PackageView> {
    let mut packages = vec![PackageView::new("Microsoft.NET.Test.Sdk", "16.7.1")];
    packages.extend(
        framework
            .packages()
            .iter()
            .map(|(id, version)| PackageView::new(*id, *version)),
    );
    packages.push(PackageView::new("Moq", "4.16.1"));
    packages.push(PackageView::new("coverlet.collector", "1.3.0"));
    packages.push(PackageView::new(
        "Newtonsoft.Json",
        newtonsoft_version.unwrap_or(DEFAULT_NEWTONSOFT_VERSION),
    ));
    packages.push(PackageView::new("FluentAssertions", "6.7.0"));
    packages
}

/// Render the `.csproj` written to `output_path`
///
/// References point at the source project and its references, relative to
/// the generated project's directory; the generated project never
/// references itself.
pub fn render_test_project(
    templates: &Templates,
    source: &SourceProject,
    framework: TestFramework,
    output_path: &Path,
) -> Result<String> {
    let output_dir = output_path.parent().unwrap_or_else(|| Path::new(""));
    let own = normalize(output_path);
    let project_references = source
        .reference_closure()
        .into_iter()
        .filter(|p| *p != own)
        .map(|p| relative_path(output_dir, &p).display().to_string())
        .collect();

    templates.render(
        TEST_PROJECT,
        &ProjectContext {
            sdk: source.sdk.clone(),
            target_framework: source.target_framework.clone(),
            packages: test_packages(framework, source.newtonsoft_version.as_deref()),
            project_references,
        },
    )
}

/// Resolve `.` and `..` lexically; the path need not exist
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
