//! Shared utility functions
//!
//! Identifier shaping, completion text cleanup and path helpers used across
//! the pipeline stages.

use std::path::{Component, Path, PathBuf};

/// Convert a free-form name to PascalCase, splitting on `_`, `-` and whitespace
///
/// # Examples
/// ```
/// use utsynth::util::to_pascal_case;
/// assert_eq!(to_pascal_case("divide_by_zero"), "DivideByZero");
/// assert_eq!(to_pascal_case("NullInput"), "NullInput");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Turn an arbitrary captured name into a valid C# identifier fragment
///
/// Compiler-generated names such as `<Total>k__BackingField` keep their
/// readable parts; every other character outside `[A-Za-z0-9_]` becomes `_`.
///
/// # Examples
/// ```
/// use utsynth::util::sanitize_identifier;
/// assert_eq!(sanitize_identifier("<Total>k__BackingField"), "Total_k__BackingField");
/// assert_eq!(sanitize_identifier("9lives"), "_9lives");
/// ```
pub fn sanitize_identifier(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    let mut result = if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    };
    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Remove a surrounding markdown code fence (with optional language tag)
///
/// Completion services often wrap answers in ```` ``` ```` blocks even when
/// asked not to.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Normalize a recorded path for comparison: forward slashes, lowercase
pub fn normalize_path_key(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}

/// Express `target` relative to the directory `from_dir`
///
/// Both paths are compared component-wise; when they share no root
/// (different drive prefixes) the target is returned unchanged.
pub fn relative_path(from_dir: &Path, target: &Path) -> PathBuf {
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let to: Vec<Component<'_>> = target.components().collect();

    if from.first() != to.first() {
        return target.to_path_buf();
    }

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}
