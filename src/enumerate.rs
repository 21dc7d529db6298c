//! Case enumeration — boundary cases proposed by the completion provider
//!
//! Each answer line has the shape
//!
//! ```text
//! [throws|doesNotThrow] [relatedToMockException|unrelatedToMock] [CaseName] 1. description
//! ```
//!
//! Only the first three bracketed tags are read; fewer than three is a
//! malformed descriptor. A candidate answer is accepted only when every
//! non-blank line parses.

use crate::completion::CompletionProvider;
use crate::error::{Error, Result};
use crate::templates::context::EnumerateContext;
use crate::templates::{Templates, ENUMERATE_PROMPT};
use crate::util::{sanitize_identifier, strip_code_fences, to_pascal_case};
use std::collections::HashSet;
use std::sync::Arc;

/// First-tag values meaning "throws" (compared lowercase)
const THROWS_TAGS: &[&str] = &["throws", "exception", "true"];
/// Second-tag values meaning "a mocked call throws" (compared lowercase)
const MOCK_EXCEPTION_TAGS: &[&str] = &["relatedtomockexception", "mockfuncthrowexception", "true"];

/// Suffix taken by the normal-case method; boundary names must avoid it
const NORMAL_CASE_SUFFIX: &str = "InNormalCase";

/// One parsed case descriptor line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDescriptor {
    pub throws: bool,
    pub mock_exception: bool,
    /// Identifier-safe, unique within the suite
    pub name: String,
    pub description: String,
    /// The line as answered, used as the case description in later prompts
    pub line: String,
}

/// Parse a single descriptor line; the name is shaped but not deduplicated
pub fn parse_descriptor(line: &str) -> Result<CaseDescriptor> {
    let malformed = |reason: &str| Error::CaseDescriptor {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = line.trim();
    let start = trimmed.find('[').ok_or_else(|| malformed("no bracketed tags"))?;
    if !trimmed[..start].chars().all(is_list_marker) {
        return Err(malformed("text before the first tag"));
    }

    let mut rest = &trimmed[start..];
    let mut tags: Vec<&str> = Vec::with_capacity(3);
    while tags.len() < 3 {
        rest = rest.trim_start();
        let Some(body) = rest.strip_prefix('[') else {
            break;
        };
        let end = body.find(']').ok_or_else(|| malformed("unclosed tag"))?;
        tags.push(body[..end].trim());
        rest = &body[end + 1..];
    }
    if tags.len() < 3 {
        return Err(malformed(&format!("expected 3 tags, found {}", tags.len())));
    }

    let name = case_identifier(tags[2]).ok_or_else(|| malformed("empty case name"))?;
    Ok(CaseDescriptor {
        throws: THROWS_TAGS.contains(&tags[0].to_lowercase().as_str()),
        mock_exception: MOCK_EXCEPTION_TAGS.contains(&tags[1].to_lowercase().as_str()),
        name,
        description: strip_numbering(rest.trim()).to_string(),
        line: trimmed.to_string(),
    })
}

/// Parse a whole candidate answer
///
/// Blank lines are skipped. Names are made unique with `_2`, `_3`, ...
/// suffixes in answer order.
pub fn parse_candidate(text: &str) -> Result<Vec<CaseDescriptor>> {
    let mut cases = Vec::new();
    for line in strip_code_fences(text).lines() {
        if line.trim().is_empty() {
            continue;
        }
        cases.push(parse_descriptor(line)?);
    }
    make_names_unique(&mut cases);
    Ok(cases)
}

fn is_list_marker(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*' | '+')
}

fn case_identifier(raw: &str) -> Option<String> {
    let pascal = to_pascal_case(raw);
    if pascal.chars().all(|c| !c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(sanitize_identifier(&pascal))
}

/// Drop a leading `1.` / `2)` style index from a description
fn strip_numbering(text: &str) -> &str {
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return text;
    }
    match text[digits..].strip_prefix(['.', ')']) {
        Some(rest) => rest.trim_start(),
        None => text,
    }
}

fn make_names_unique(cases: &mut [CaseDescriptor]) {
    let mut used: HashSet<String> = HashSet::new();
    used.insert(NORMAL_CASE_SUFFIX.to_string());
    for case in cases.iter_mut() {
        if used.insert(case.name.clone()) {
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{}_{}", case.name, n);
            if !used.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        used.insert(unique.clone());
        case.name = unique;
    }
}

/// Asks the completion provider for boundary cases
pub struct CaseEnumerator {
    provider: Arc<dyn CompletionProvider>,
    templates: Templates,
    choices: u32,
}

impl CaseEnumerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, templates: Templates, choices: u32) -> Self {
        Self {
            provider,
            templates,
            choices,
        }
    }

    /// Case list from the first candidate whose every line parses
    pub async fn enumerate(
        &self,
        function_body: &str,
        mockable_functions: &[String],
    ) -> Result<Vec<CaseDescriptor>> {
        let prompt = self.templates.render(
            ENUMERATE_PROMPT,
            &EnumerateContext {
                function_body: function_body.to_string(),
                mockable_functions: mockable_functions.to_vec(),
            },
        )?;

        let candidates = self.provider.complete(&prompt, self.choices).await?;
        tracing::debug!(
            provider = self.provider.name(),
            candidates = candidates.len(),
            "enumeration candidates received"
        );

        let mut last_error: Option<Error> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            match parse_candidate(candidate) {
                Ok(cases) => {
                    tracing::info!(candidate = i, cases = cases.len(), "boundary cases enumerated");
                    return Ok(cases);
                }
                Err(e) => {
                    tracing::debug!(candidate = i, error = %e, "discarding enumeration candidate");
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Enumeration(match last_error {
            Some(e) => format!("no valid candidate among {}; last: {}", candidates.len(), e),
            None => "the completion provider returned no candidates".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{ScriptRule, ScriptedProvider};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("[throws] [unrelatedToMock] [NegativeInput] 1. a is negative", true, false, "NegativeInput")]
    #[case("[exception][mockFuncThrowException][DividerThrows] divider fails", true, true, "DividerThrows")]
    #[case("[doesNotThrow] [unrelatedToMock] [zero input] 2. a is zero", false, false, "ZeroInput")]
    #[case("[noException] [RelatedToMockException] [Caught] mock throws, caught", false, true, "Caught")]
    #[case("3. [THROWS] [unrelatedToMock] [Big] [extra] too big", true, false, "Big")]
    #[case("- [throws] [x] [null-name!] null", true, false, "NullName")]
    fn test_parse_descriptor(
        #[case] line: &str,
        #[case] throws: bool,
        #[case] mock_exception: bool,
        #[case] name: &str,
    ) {
        let d = parse_descriptor(line).unwrap();
        assert_eq!(d.throws, throws);
        assert_eq!(d.mock_exception, mock_exception);
        assert_eq!(d.name, name);
    }

    #[test]
    fn test_description_and_extra_tags() {
        let d = parse_descriptor("[throws] [unrelatedToMock] [Big] [extra] 4. too big").unwrap();
        assert_eq!(d.description, "[extra] 4. too big");

        let d = parse_descriptor("[throws] [unrelatedToMock] [Big] 4. too big").unwrap();
        assert_eq!(d.description, "too big");
    }

    #[rstest]
    #[case("[throws] [unrelatedToMock] only two")]
    #[case("no tags at all")]
    #[case("prefix [throws] [a] [B] text")]
    #[case("[throws] [a] [B")]
    #[case("[throws] [a] [ ] empty name")]
    fn test_malformed_descriptors(#[case] line: &str) {
        assert!(matches!(
            parse_descriptor(line),
            Err(Error::CaseDescriptor { .. })
        ));
    }

    #[test]
    fn test_candidate_names_unique() {
        let cases = parse_candidate(
            "```\n[throws] [a] [Null] 1. x\n\n[throws] [a] [null] 2. y\n[throws] [a] [Null] 3. z\n[throws] [a] [InNormalCase] 4. w\n```",
        )
        .unwrap();
        let names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Null", "Null_2", "Null_3", "InNormalCase_2"]);
    }

    #[test]
    fn test_empty_candidate_is_valid() {
        assert!(parse_candidate("  \n").unwrap().is_empty());
    }

    fn enumerator(choices: Vec<&str>) -> CaseEnumerator {
        let provider = ScriptedProvider::new(
            vec![ScriptRule {
                when_contains: "boundary cases".into(),
                choices: choices.into_iter().map(String::from).collect(),
            }],
            vec![],
        );
        CaseEnumerator::new(Arc::new(provider), Templates::embedded().unwrap(), 3)
    }

    #[tokio::test]
    async fn test_first_valid_candidate_wins() {
        let e = enumerator(vec![
            "Sure! Here are the cases:\n[throws] [a] [A] x",
            "[throws] [unrelatedToMock] [NegativeInput] 1. negative",
            "[doesNotThrow] [unrelatedToMock] [Other] 1. other",
        ]);
        let cases = e.enumerate("int Abs(int a)", &[]).await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "NegativeInput");
    }

    #[tokio::test]
    async fn test_no_valid_candidate_is_fatal() {
        let e = enumerator(vec!["nothing useful", "[throws] only one"]);
        let err = e.enumerate("int Abs(int a)", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Enumeration(_)));
        assert!(err.to_string().contains("expected 3 tags"));
    }
}
