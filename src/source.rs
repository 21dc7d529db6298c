//! Source locator — the traced method's text for the prompts

use crate::error::{Error, Result};
use crate::trace::SourceLocation;
use std::path::{Component, Path, PathBuf};
use tree_sitter::{Node, Parser};

/// Declarations that can be the method under test
const FUNCTION_KINDS: &[&str] = &[
    "method_declaration",
    "constructor_declaration",
    "local_function_statement",
    "operator_declaration",
    "conversion_operator_declaration",
    "destructor_declaration",
];

/// Extracted source of the method under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSource {
    pub text: String,
    /// 1-based, inclusive
    pub start_line: u32,
    pub end_line: u32,
    /// Found by parsing rather than cut from the recorded range
    pub from_syntax: bool,
}

/// Innermost function declaration containing the recorded start line
///
/// Falls back to the recorded line range when parsing finds no
/// declaration there.
pub fn extract_function(source: &str, location: &SourceLocation) -> Result<FunctionSource> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_c_sharp::LANGUAGE.into())
        .map_err(|e| Error::SourceParse(format!("Failed to set language: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::SourceParse("Failed to parse source".into()))?;

    let row = location.start_line.saturating_sub(1) as usize;
    if let Some(node) = innermost_function(tree.root_node(), row) {
        let text = node
            .utf8_text(source.as_bytes())
            .map_err(|e| Error::SourceParse(format!("invalid UTF-8 in declaration: {}", e)))?;
        return Ok(FunctionSource {
            text: text.to_string(),
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            from_syntax: true,
        });
    }

    tracing::debug!(location = %location, "no declaration found, using recorded line range");
    line_range(source, location)
}

fn innermost_function(node: Node<'_>, row: usize) -> Option<Node<'_>> {
    if node.start_position().row > row || node.end_position().row < row {
        return None;
    }
    let mut cursor = node.walk();
    let inner = node
        .children(&mut cursor)
        .find_map(|child| innermost_function(child, row));
    inner.or_else(|| FUNCTION_KINDS.contains(&node.kind()).then_some(node))
}

fn line_range(source: &str, location: &SourceLocation) -> Result<FunctionSource> {
    let lines: Vec<&str> = source.lines().collect();
    let start = location.start_line.max(1) as usize;
    let end = (location.end_line as usize).min(lines.len());
    if start > end {
        return Err(Error::SourceParse(format!(
            "recorded range {} is outside the file ({} lines)",
            location,
            lines.len()
        )));
    }
    Ok(FunctionSource {
        text: lines[start - 1..end].join("\n"),
        start_line: start as u32,
        end_line: end as u32,
        from_syntax: false,
    })
}

/// Read the file and extract the function
pub fn load_function(path: &Path, location: &SourceLocation) -> Result<FunctionSource> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::SourceParse(format!("cannot read {}: {}", path.display(), e)))?;
    extract_function(&source, location)
}

/// Find a recorded source path on this machine
///
/// Tries the path as recorded, then every suffix of it under `solution_dir`
/// (longest first), so traces captured on another machine still resolve.
pub fn resolve_source_path(recorded: &str, solution_dir: &Path) -> Option<PathBuf> {
    let as_recorded = PathBuf::from(recorded);
    if as_recorded.is_file() {
        return Some(as_recorded);
    }

    let portable = recorded.replace('\\', "/");
    let parts: Vec<&str> = Path::new(&portable)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        // drive prefixes such as `C:` survive as normal components off Windows
        .filter(|part| !part.ends_with(':'))
        .collect();

    (0..parts.len()).find_map(|skip| {
        let candidate = parts[skip..]
            .iter()
            .fold(solution_dir.to_path_buf(), |acc, part| acc.join(part));
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CALCULATOR: &str = r#"namespace Demo
{
    public class Calculator
    {
        private readonly IDivider _divider;

        public Calculator(IDivider divider)
        {
            _divider = divider;
        }

        public int Add(int a, int b)
        {
            int Twice(int x) => x * 2;
            return a + b;
        }
    }
}
"#;

    fn at(start: u32, end: u32) -> SourceLocation {
        SourceLocation {
            file: "Calculator.cs".into(),
            start_line: start,
            end_line: end,
        }
    }

    #[test]
    fn test_extracts_method() {
        let f = extract_function(CALCULATOR, &at(12, 16)).unwrap();
        assert!(f.from_syntax);
        assert!(f.text.starts_with("public int Add(int a, int b)"));
        assert!(f.text.ends_with('}'));
        assert_eq!((f.start_line, f.end_line), (12, 16));
    }

    #[test]
    fn test_innermost_declaration_wins() {
        let f = extract_function(CALCULATOR, &at(14, 14)).unwrap();
        assert_eq!(f.text, "int Twice(int x) => x * 2;");
    }

    #[test]
    fn test_constructor() {
        let f = extract_function(CALCULATOR, &at(7, 10)).unwrap();
        assert!(f.text.starts_with("public Calculator(IDivider divider)"));
    }

    #[test]
    fn test_falls_back_to_line_range() {
        let f = extract_function(CALCULATOR, &at(3, 4)).unwrap();
        assert!(!f.from_syntax);
        assert_eq!(f.text, "    public class Calculator\n    {");

        assert!(matches!(
            extract_function(CALCULATOR, &at(80, 90)),
            Err(Error::SourceParse(_))
        ));
    }

    #[test]
    fn test_resolve_source_path_by_suffix() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("src").join("Calculator.cs");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, CALCULATOR).unwrap();

        let found = resolve_source_path(r"D:\work\repo\src\Calculator.cs", dir.path()).unwrap();
        assert_eq!(found, file);
        assert!(resolve_source_path(r"D:\work\repo\src\Missing.cs", dir.path()).is_none());
    }
}
