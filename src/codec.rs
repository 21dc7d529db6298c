//! Value codec — recorded payloads to C# source expressions
//!
//! - null payload: `default(T)`
//! - `string`: a regular string literal built by [`escape_csharp_string`]
//! - numeric and boolean payloads that already are valid literals: emitted as-is
//! - anything else: `JsonConvert.DeserializeObject<T>(@"...")`, so structure
//!   is rebuilt at test run time by Newtonsoft.Json

/// Type names rendered as plain string literals
const STRING_TYPES: &[&str] = &["string", "String", "System.String"];

/// Encode a recorded value of type `type_name` as a C# expression
pub fn encode(type_name: &str, value: Option<&str>) -> String {
    let Some(payload) = value else {
        return format!("default({})", type_name);
    };

    if is_string_type(type_name) {
        return escape_csharp_string(payload);
    }

    if let Some(literal) = primitive_literal(type_name, payload) {
        return literal;
    }

    format!(
        "JsonConvert.DeserializeObject<{}>({})",
        type_name,
        verbatim_literal(payload)
    )
}

pub fn is_string_type(type_name: &str) -> bool {
    STRING_TYPES.contains(&type_name.trim())
}

/// Types FluentAssertions compares with `Be` instead of `BeEquivalentTo`
pub fn is_simple_type(type_name: &str) -> bool {
    let t = type_name.trim().trim_end_matches('?');
    let t = t.strip_prefix("System.").unwrap_or(t);
    matches!(
        t,
        "bool"
            | "Boolean"
            | "byte"
            | "Byte"
            | "sbyte"
            | "SByte"
            | "char"
            | "Char"
            | "short"
            | "Int16"
            | "ushort"
            | "UInt16"
            | "int"
            | "Int32"
            | "uint"
            | "UInt32"
            | "long"
            | "Int64"
            | "ulong"
            | "UInt64"
            | "float"
            | "Single"
            | "double"
            | "Double"
            | "decimal"
            | "Decimal"
            | "string"
            | "String"
            | "Guid"
            | "DateTime"
            | "DateTimeOffset"
            | "TimeSpan"
    )
}

/// Numeric or boolean payloads that parse as the declared type
fn primitive_literal(type_name: &str, payload: &str) -> Option<String> {
    let t = type_name.trim();
    let t = t.strip_prefix("System.").unwrap_or(t);
    let p = payload.trim();
    match t {
        "bool" | "Boolean" => match p {
            "true" | "True" => Some("true".into()),
            "false" | "False" => Some("false".into()),
            _ => None,
        },
        "int" | "Int32" => p.parse::<i32>().ok().map(|v| v.to_string()),
        "short" | "Int16" => p.parse::<i16>().ok().map(|v| format!("(short){}", paren_negative(v))),
        "byte" | "Byte" => p.parse::<u8>().ok().map(|v| format!("(byte){}", v)),
        "sbyte" | "SByte" => p.parse::<i8>().ok().map(|v| format!("(sbyte){}", paren_negative(v))),
        "ushort" | "UInt16" => p.parse::<u16>().ok().map(|v| format!("(ushort){}", v)),
        "long" | "Int64" => p.parse::<i64>().ok().map(|v| format!("{}L", v)),
        "uint" | "UInt32" => p.parse::<u32>().ok().map(|v| format!("{}U", v)),
        "ulong" | "UInt64" => p.parse::<u64>().ok().map(|v| format!("{}UL", v)),
        "double" | "Double" => finite_decimal(p).map(|v| format!("{}D", v)),
        "float" | "Single" => finite_decimal(p).map(|v| format!("{}F", v)),
        "decimal" | "Decimal" => finite_decimal(p).map(|v| format!("{}M", v)),
        _ => None,
    }
}

fn paren_negative<T: PartialOrd + Default + std::fmt::Display>(v: T) -> String {
    if v < T::default() {
        format!("({})", v)
    } else {
        v.to_string()
    }
}

/// Plain decimal notation (digits, one dot, optional sign); exponents and
/// NaN/Infinity go through the deserializer instead
fn finite_decimal(p: &str) -> Option<&str> {
    let digits = p.strip_prefix('-').unwrap_or(p);
    let mut parts = digits.splitn(2, '.');
    let int_part = parts.next()?;
    let frac_part = parts.next();
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || frac_part.is_some_and(|f| !all_digits(f)) {
        return None;
    }
    Some(p)
}

/// Regular C# string literal for arbitrary text, quotes included
///
/// # Examples
/// ```
/// use utsynth::codec::escape_csharp_string;
/// assert_eq!(escape_csharp_string("say \"hi\"\n"), r#""say \"hi\"\n""#);
/// ```
pub fn escape_csharp_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            '\u{07}' => out.push_str("\\a"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0B}' => out.push_str("\\v"),
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// C# verbatim literal (`@"..."`); only `"` needs doubling
pub fn verbatim_literal(text: &str) -> String {
    format!("@\"{}\"", text.replace('"', "\"\""))
}

/// Recover the text of a regular or verbatim C# string literal
///
/// Returns `None` when `literal` is not a single well-formed literal.
pub fn decode_literal(literal: &str) -> Option<String> {
    let literal = literal.trim();
    if let Some(body) = literal.strip_prefix("@\"") {
        return decode_verbatim(body);
    }
    let body = literal.strip_prefix('"')?;
    decode_regular(body)
}

fn decode_verbatim(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                out.push('"');
            } else {
                return chars.next().is_none().then_some(out);
            }
        } else {
            out.push(c);
        }
    }
    None
}

fn decode_regular(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return chars.next().is_none().then_some(out),
            '\\' => {
                let escaped = match chars.next()? {
                    '\\' => '\\',
                    '"' => '"',
                    '\'' => '\'',
                    '0' => '\0',
                    'a' => '\u{07}',
                    'b' => '\u{08}',
                    'f' => '\u{0C}',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\u{0B}',
                    'u' => hex_char(&mut chars, 4)?,
                    'U' => hex_char(&mut chars, 8)?,
                    _ => return None,
                };
                out.push(escaped);
            }
            '\n' | '\r' => return None,
            c => out.push(c),
        }
    }
    None
}

fn hex_char(chars: &mut std::str::Chars<'_>, len: usize) -> Option<char> {
    let digits: String = chars.by_ref().take(len).collect();
    if digits.len() != len {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
}

/// Recover the payload an [`encode`]d expression carries
///
/// `Some(None)` is the `default(T)` form. Primitive literals come back
/// without their suffix or cast, in C# spelling (`true`, not `True`).
pub fn decode(expression: &str) -> Option<Option<String>> {
    let e = expression.trim();
    if e.starts_with("default(") && e.ends_with(')') {
        return Some(None);
    }
    if e.starts_with('"') || e.starts_with("@\"") {
        return decode_literal(e).map(Some);
    }
    if let Some(rest) = e.strip_prefix("JsonConvert.DeserializeObject<") {
        let open = rest.find(">(")?;
        let inner = rest[open + 2..].strip_suffix(')')?;
        return decode_literal(inner).map(Some);
    }
    let unparen = |s: &str| s.trim_start_matches('(').trim_end_matches(')').to_string();
    let without_cast = match e.strip_prefix('(') {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_alphabetic()) => {
            &rest[rest.find(')')? + 1..]
        }
        _ => e,
    };
    let trimmed = without_cast.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let value = if trimmed.is_empty() {
        without_cast.to_string()
    } else {
        unparen(trimmed)
    };
    Some(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("int", Some("5"), "5")]
    #[case("int", Some("-5"), "-5")]
    #[case("long", Some("9000000000"), "9000000000L")]
    #[case("short", Some("-3"), "(short)(-3)")]
    #[case("bool", Some("True"), "true")]
    #[case("double", Some("2.5"), "2.5D")]
    #[case("decimal", Some("10"), "10M")]
    #[case("double", Some("1e10"), r#"JsonConvert.DeserializeObject<double>(@"1e10")"#)]
    #[case("int", None, "default(int)")]
    #[case("string", None, "default(string)")]
    #[case("string", Some("Ada"), r#""Ada""#)]
    #[case(
        "List<int>",
        Some("[1,2]"),
        r#"JsonConvert.DeserializeObject<List<int>>(@"[1,2]")"#
    )]
    #[case(
        "Point",
        Some(r#"{"X":1,"Name":"a"}"#),
        r#"JsonConvert.DeserializeObject<Point>(@"{""X"":1,""Name"":""a""}")"#
    )]
    fn test_encode(#[case] ty: &str, #[case] value: Option<&str>, #[case] expected: &str) {
        assert_eq!(encode(ty, value), expected);
    }

    #[test]
    fn test_escape_controls() {
        assert_eq!(escape_csharp_string("a\\b"), r#""a\\b""#);
        assert_eq!(escape_csharp_string("\u{1}\u{2028}"), r#""\u0001\u2028""#);
        assert_eq!(escape_csharp_string("tab\there"), r#""tab\there""#);
    }

    #[test]
    fn test_decode_primitives() {
        assert_eq!(decode("5"), Some(Some("5".into())));
        assert_eq!(decode("(short)(-3)"), Some(Some("-3".into())));
        assert_eq!(decode("9000000000L"), Some(Some("9000000000".into())));
        assert_eq!(decode("true"), Some(Some("true".into())));
        assert_eq!(decode("default(Point)"), Some(None));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_eq!(decode_literal(r#""open"#), None);
        assert_eq!(decode_literal(r#""a" + "b""#), None);
        assert_eq!(decode_literal(r#""bad \q""#), None);
        assert_eq!(decode_literal(r#"@"x"y""#), None);
    }

    proptest! {
        #[test]
        fn prop_string_literal_round_trips(text in any::<String>()) {
            let literal = escape_csharp_string(&text);
            prop_assert!(!literal[1..literal.len() - 1].contains('\n'));
            prop_assert_eq!(decode_literal(&literal), Some(text));
        }

        #[test]
        fn prop_encoded_payload_round_trips(
            ty in prop_oneof![Just("string"), Just("Point"), Just("List<string>")],
            text in any::<String>(),
        ) {
            let expression = encode(ty, Some(&text));
            prop_assert_eq!(decode(&expression), Some(Some(text)));
        }
    }
}
