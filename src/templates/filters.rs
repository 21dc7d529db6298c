//! Custom MiniJinja filters
//!
//! - `pascal_case`: identifier shaping
//! - `xml_escape`: attribute/element values in project files

use crate::util;
use minijinja::Environment;

/// Register all custom filters with the environment
pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("pascal_case", filter_pascal_case);
    env.add_filter("xml_escape", xml_escape);
}

fn filter_pascal_case(value: &str) -> String {
    util::to_pascal_case(value)
}

/// Escape the five XML special characters
fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
