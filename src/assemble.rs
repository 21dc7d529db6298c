//! Test assembler — the final suite file, its project and the record

use crate::case::BoundaryCase;
use crate::emit::{self, MethodContext, TestFile};
use crate::error::Result;
use crate::meta::{GenerationRecord, Provenance};
use crate::project::{self, SourceProject};
use crate::templates::Templates;
use crate::util::sanitize_identifier;
use std::path::{Path, PathBuf};

/// Namespace used when the unit records none
pub const FALLBACK_NAMESPACE: &str = "UnitTestDemo";

/// File-level settings of the assembled suite
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    pub namespace: String,
    pub copyright: Option<String>,
    /// Header naming the trace; omitted when `None`
    pub provenance: Option<Provenance>,
}

/// `{first unit namespace}.Tests`, or the fallback namespace
pub fn default_namespace(unit_namespaces: &[String]) -> String {
    unit_namespaces
        .first()
        .map(|ns| format!("{}.Tests", ns))
        .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string())
}

/// Class name part of a possibly qualified or generic type name
pub fn class_stem(type_name: &str) -> String {
    let unqualified = type_name.rsplit('.').next().unwrap_or(type_name);
    let without_generics = unqualified
        .split(['<', '`'])
        .next()
        .unwrap_or(unqualified);
    sanitize_identifier(without_generics)
}

/// Normal-case method followed by every boundary case, in case order
///
/// Fails when any case has not reached its final state.
pub fn assemble_suite(
    ctx: &MethodContext<'_>,
    cases: &[BoundaryCase],
    options: &SuiteOptions,
) -> Result<TestFile> {
    let mut methods = vec![emit::normal_case(ctx)];
    for case in cases {
        methods.push(emit::boundary_case(ctx, &case.method()?));
    }

    Ok(TestFile {
        class_name: class_stem(&ctx.unit.type_name),
        namespace: options.namespace.clone(),
        framework: ctx.framework,
        usings: ctx.namespaces(),
        methods,
        needs_accessor: ctx.instance.needs_accessor(),
        copyright: options.copyright.clone(),
        provenance: options.provenance.clone(),
    })
}

/// Paths written for one suite
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenSuite {
    pub source_path: PathBuf,
    pub project_path: PathBuf,
}

/// Write `{Class}Tests.cs`, `{Class}Tests.csproj` and the generation
/// record into `output_dir`, overwriting previous output
pub async fn write_suite(
    templates: &Templates,
    file: &TestFile,
    source_project: &SourceProject,
    output_dir: &Path,
    mut record: GenerationRecord,
) -> Result<WrittenSuite> {
    tokio::fs::create_dir_all(output_dir).await?;
    let stem = file.test_class_name();
    let source_path = output_dir.join(format!("{}.cs", stem));
    let project_path = output_dir.join(format!("{}.csproj", stem));

    tokio::fs::write(&source_path, file.render()).await?;
    let csproj = project::render_test_project(templates, source_project, file.framework, &project_path)?;
    tokio::fs::write(&project_path, csproj).await?;

    for path in [&source_path, &project_path] {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            record.track_file(name);
        }
    }
    record.save_to_dir(output_dir)?;

    tracing::info!(
        source = %source_path.display(),
        project = %project_path.display(),
        methods = file.methods.len(),
        "test suite written"
    );
    Ok(WrittenSuite {
        source_path,
        project_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace() {
        assert_eq!(default_namespace(&["Demo.Math".into(), "System".into()]), "Demo.Math.Tests");
        assert_eq!(default_namespace(&[]), FALLBACK_NAMESPACE);
    }

    #[test]
    fn test_class_stem() {
        assert_eq!(class_stem("Calculator"), "Calculator");
        assert_eq!(class_stem("Demo.Math.Calculator"), "Calculator");
        assert_eq!(class_stem("Repository`1"), "Repository");
        assert_eq!(class_stem("Cache<string>"), "Cache");
    }
}
