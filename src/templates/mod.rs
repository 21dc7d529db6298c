//! Template-based prompt and project generation
//!
//! Uses MiniJinja templates for the completion prompts and the generated
//! test project file. Templates are embedded by default, with optional
//! override via:
//! - `--template-dir` CLI flag
//! - `utsynth.yaml`: `generation.template_dir`
//!
//! An override directory mirrors the embedded layout (`prompts/…`,
//! `project/…`); files it does not contain keep their embedded version.

pub mod context;
pub mod filters;

use crate::error::{Error, Result};
use minijinja::Environment;
use serde::Serialize;
use std::path::Path;

/// Case enumeration prompt
pub const ENUMERATE_PROMPT: &str = "prompts/enumerate.jinja";
/// Per-case input synthesis prompt
pub const SYNTHESIZE_PROMPT: &str = "prompts/synthesize.jinja";
/// Test project file
pub const TEST_PROJECT: &str = "project/test.csproj.jinja";

// Embedded templates (compiled into binary)
mod embedded {
    pub const ENUMERATE: &str = include_str!("../../templates/prompts/enumerate.jinja");
    pub const SYNTHESIZE: &str = include_str!("../../templates/prompts/synthesize.jinja");
    pub const TEST_PROJECT: &str = include_str!("../../templates/project/test.csproj.jinja");
}

const EMBEDDED: &[(&str, &str)] = &[
    (ENUMERATE_PROMPT, embedded::ENUMERATE),
    (SYNTHESIZE_PROMPT, embedded::SYNTHESIZE),
    (TEST_PROJECT, embedded::TEST_PROJECT),
];

/// Template engine handle
///
/// Owned rather than global so a pipeline can carry its own overrides.
#[derive(Debug, Clone)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Engine with the embedded templates only
    pub fn embedded() -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        filters::register_filters(&mut env);
        for &(name, source) in EMBEDDED {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Engine whose templates in `custom_dir` override the embedded ones
    pub fn with_override(custom_dir: &Path) -> Result<Self> {
        let mut templates = Self::embedded()?;
        for &(name, _) in EMBEDDED {
            let path = custom_dir.join(name);
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read template {}: {}", path.display(), e))
            })?;
            tracing::debug!(template = name, path = %path.display(), "using template override");
            templates.env.add_template_owned(name.to_string(), content)?;
        }
        Ok(templates)
    }

    /// Embedded engine, or the override engine when a directory is given
    pub fn load(custom_dir: Option<&Path>) -> Result<Self> {
        match custom_dir {
            Some(dir) => Self::with_override(dir),
            None => Self::embedded(),
        }
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: &S) -> Result<String> {
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use super::context::{EnumerateContext, PackageView, ProjectContext, SynthesizeContext};
    use super::*;
    use tempfile::TempDir;

    fn enumerate_ctx() -> EnumerateContext {
        EnumerateContext {
            function_body: "public int Div(int a, int b) => _divider.Divide(a, b);".into(),
            mockable_functions: vec!["IDivider.Divide".into()],
        }
    }

    #[test]
    fn test_embedded_templates_load() {
        let templates = Templates::embedded().unwrap();
        for (name, _) in EMBEDDED {
            assert!(templates.env.get_template(name).is_ok(), "{} missing", name);
        }
    }

    #[test]
    fn test_render_enumerate_prompt() {
        let templates = Templates::embedded().unwrap();
        let prompt = templates.render(ENUMERATE_PROMPT, &enumerate_ctx()).unwrap();
        assert!(prompt.contains("boundary cases"));
        assert!(prompt.contains("_divider.Divide(a, b)"));
        assert!(prompt.contains("IDivider.Divide"));
    }

    #[test]
    fn test_render_synthesize_prompt() {
        let templates = Templates::embedded().unwrap();
        let ctx = SynthesizeContext {
            function_body: "public int Add(int a, int b) => a + b;".into(),
            parameters: vec!["int a".into(), "int b".into()],
            normal_inputs_json: r#"[{"name":"a","type":"int","value":"2"}]"#.into(),
            case_description: "[throws] [unrelatedToMock] [Overflow] int overflow".into(),
        };
        let prompt = templates.render(SYNTHESIZE_PROMPT, &ctx).unwrap();
        assert!(prompt.contains("Case description: [throws] [unrelatedToMock] [Overflow]"));
        assert!(prompt.contains(r#""name":"a""#));
    }

    #[test]
    fn test_render_project_escapes_values() {
        let templates = Templates::embedded().unwrap();
        let ctx = ProjectContext {
            sdk: "Microsoft.NET.Sdk".into(),
            target_framework: "net6.0".into(),
            packages: vec![PackageView {
                id: "Moq".into(),
                version: "4.16.1".into(),
            }],
            project_references: vec![r"..\src\A&B\A&B.csproj".into()],
        };
        let text = templates.render(TEST_PROJECT, &ctx).unwrap();
        assert!(text.contains(r#"<Project Sdk="Microsoft.NET.Sdk">"#));
        assert!(text.contains("<TargetFramework>net6.0</TargetFramework>"));
        assert!(text.contains(r#"<PackageReference Include="Moq" Version="4.16.1" />"#));
        assert!(text.contains(r#"<ProjectReference Include="..\src\A&amp;B\A&amp;B.csproj" />"#));
    }

    #[test]
    fn test_override_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(
            dir.path().join(ENUMERATE_PROMPT),
            "custom {{ mockable_functions | join(\", \") }}",
        )
        .unwrap();

        let templates = Templates::with_override(dir.path()).unwrap();
        assert_eq!(
            templates.render(ENUMERATE_PROMPT, &enumerate_ctx()).unwrap(),
            "custom IDivider.Divide"
        );
        // untouched templates stay embedded
        assert!(templates
            .render(TEST_PROJECT, &ProjectContext::default())
            .unwrap()
            .contains("<Project"));
    }
}
