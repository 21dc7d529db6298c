//! Input synthesis — per-case parameter values from the completion provider
//!
//! Every case is its own task, so a provider failure or an unparseable
//! answer for one case only affects that case: it falls back to the
//! normal-case inputs. Tasks write into a map keyed by case index and the
//! results are put back into case order before returning.

use crate::completion::CompletionProvider;
use crate::enumerate::CaseDescriptor;
use crate::error::Result;
use crate::templates::context::SynthesizeContext;
use crate::templates::{Templates, SYNTHESIZE_PROMPT};
use crate::trace::{NamedValue, TestableUnit};
use crate::util::strip_code_fences;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Where a case's inputs came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Parsed from a completion candidate
    Synthesized,
    /// Mock-exception case; the function's own inputs do not matter
    ReusedForMockException,
    /// No candidate parsed; normal-case inputs
    Fallback,
}

/// Inputs chosen for one case, in parameter order
#[derive(Debug, Clone, PartialEq)]
pub struct CaseInputs {
    pub values: Vec<NamedValue>,
    pub source: InputSource,
}

#[derive(Debug, Deserialize)]
struct RawInput {
    name: String,
    #[serde(default)]
    value: serde_json::Value,
}

/// Parse a candidate into values for exactly `params`, in their order
///
/// Returns `None` unless the candidate is a JSON array of `{name, value}`
/// objects naming every parameter once. String values are taken as raw
/// text, `null` as an absent payload, anything else as its JSON text.
pub fn parse_inputs(candidate: &str, params: &[NamedValue]) -> Option<Vec<NamedValue>> {
    let body = strip_code_fences(candidate);
    let raw: Vec<RawInput> = serde_json::from_str(body)
        .ok()
        .or_else(|| serde_json::from_str(embedded_array(body)?).ok())?;

    let mut seen = HashSet::new();
    if raw.len() != params.len() || !raw.iter().all(|r| seen.insert(r.name.as_str())) {
        return None;
    }

    params
        .iter()
        .map(|param| {
            let entry = raw.iter().find(|r| r.name == param.name)?;
            let value = match &entry.value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            };
            Some(NamedValue {
                value,
                ..param.clone()
            })
        })
        .collect()
}

/// The outermost `[...]` span, for answers wrapped in prose
fn embedded_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (start < end).then(|| &text[start..=end])
}

/// Asks the completion provider for per-case inputs, one task per case
pub struct InputSynthesizer {
    provider: Arc<dyn CompletionProvider>,
    templates: Templates,
    choices: u32,
}

impl InputSynthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, templates: Templates, choices: u32) -> Self {
        Self {
            provider,
            templates,
            choices,
        }
    }

    /// One [`CaseInputs`] per case; `result[i]` belongs to `cases[i]`
    pub async fn synthesize(
        &self,
        function_body: &str,
        unit: &TestableUnit,
        cases: &[CaseDescriptor],
    ) -> Result<Vec<CaseInputs>> {
        let params: Arc<Vec<NamedValue>> = Arc::new(unit.value_parameters().cloned().collect());
        let normal_inputs_json = serde_json::to_string(params.as_slice())?;
        let declarations: Vec<String> = unit
            .parameters
            .iter()
            .map(|p| format!("{} {}", p.type_name, p.name))
            .collect();

        let results: Arc<DashMap<usize, CaseInputs>> = Arc::new(DashMap::new());
        let mut tasks = JoinSet::new();

        for (index, case) in cases.iter().enumerate() {
            if case.mock_exception {
                results.insert(
                    index,
                    CaseInputs {
                        values: params.as_ref().clone(),
                        source: InputSource::ReusedForMockException,
                    },
                );
                continue;
            }

            let prompt = self.templates.render(
                SYNTHESIZE_PROMPT,
                &SynthesizeContext {
                    function_body: function_body.to_string(),
                    parameters: declarations.clone(),
                    normal_inputs_json: normal_inputs_json.clone(),
                    case_description: case.line.clone(),
                },
            )?;
            let provider = Arc::clone(&self.provider);
            let params = Arc::clone(&params);
            let results = Arc::clone(&results);
            let choices = self.choices;
            let name = case.name.clone();

            tasks.spawn(async move {
                let candidates = match provider.complete(&prompt, choices).await {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(case = %name, error = %e, "input synthesis request failed");
                        return;
                    }
                };
                match candidates.iter().find_map(|c| parse_inputs(c, &params)) {
                    Some(values) => {
                        results.insert(
                            index,
                            CaseInputs {
                                values,
                                source: InputSource::Synthesized,
                            },
                        );
                    }
                    None => {
                        tracing::warn!(
                            case = %name,
                            candidates = candidates.len(),
                            "no input candidate parsed"
                        );
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "input synthesis task did not finish");
            }
        }

        let ordered = (0..cases.len())
            .map(|index| match results.remove(&index) {
                Some((_, inputs)) => inputs,
                None => CaseInputs {
                    values: params.as_ref().clone(),
                    source: InputSource::Fallback,
                },
            })
            .collect::<Vec<_>>();

        tracing::info!(
            cases = ordered.len(),
            fallbacks = ordered
                .iter()
                .filter(|i| i.source == InputSource::Fallback)
                .count(),
            "inputs synthesized"
        );
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{ScriptRule, ScriptedProvider};
    use crate::enumerate::parse_descriptor;
    use crate::trace::CallTrace;
    use pretty_assertions::assert_eq;

    fn params() -> Vec<NamedValue> {
        vec![
            NamedValue::new("a", "int", Some("2")),
            NamedValue::new("name", "string", Some("x")),
        ]
    }

    #[test]
    fn test_parse_inputs_reorders_and_converts() {
        let values = parse_inputs(
            r#"```json
[{"name": "name", "type": "string", "value": null}, {"name": "a", "type": "int", "value": -1}]
```"#,
            &params(),
        )
        .unwrap();
        assert_eq!(values[0], NamedValue::new("a", "int", Some("-1")));
        assert_eq!(values[1], NamedValue::new("name", "string", None));
    }

    #[test]
    fn test_parse_inputs_in_prose() {
        let values = parse_inputs(
            r#"Here you go: [{"name": "a", "value": "7"}, {"name": "name", "value": "say \"hi\""}] done"#,
            &params(),
        )
        .unwrap();
        assert_eq!(values[0].value.as_deref(), Some("7"));
        assert_eq!(values[1].value.as_deref(), Some("say \"hi\""));
    }

    #[test]
    fn test_parse_inputs_rejects_wrong_names() {
        assert!(parse_inputs(r#"[{"name": "a", "value": 1}]"#, &params()).is_none());
        assert!(parse_inputs(
            r#"[{"name": "a", "value": 1}, {"name": "a", "value": 2}]"#,
            &params()
        )
        .is_none());
        assert!(parse_inputs(
            r#"[{"name": "a", "value": 1}, {"name": "b", "value": 2}]"#,
            &params()
        )
        .is_none());
        assert!(parse_inputs("not json", &params()).is_none());
    }

    fn unit() -> TestableUnit {
        let trace = CallTrace::from_json(
            r#"[{
                "correlation": 1, "type_name": "Calculator", "method_name": "Add",
                "location": {"file": "Calculator.cs", "start_line": 1, "end_line": 3},
                "inputs": [
                    {"name": "a", "type": "int", "value": "2"},
                    {"name": "b", "type": "int", "value": "3"}
                ],
                "output": {"type": "int", "value": "5"}
            }]"#,
        )
        .unwrap();
        let unit = TestableUnit::from_node(trace.roots().next().unwrap());
        unit
    }

    #[tokio::test]
    async fn test_results_follow_case_order() {
        let provider = ScriptedProvider::new(
            vec![
                ScriptRule {
                    when_contains: "[Negative]".into(),
                    choices: vec![
                        "garbage".into(),
                        r#"[{"name":"a","value":-1},{"name":"b","value":3}]"#.into(),
                    ],
                },
                ScriptRule {
                    when_contains: "[Overflow]".into(),
                    choices: vec![r#"[{"name":"a","value":2147483647},{"name":"b","value":1}]"#.into()],
                },
            ],
            vec!["unparseable".into()],
        );
        let synthesizer = InputSynthesizer::new(
            Arc::new(provider),
            Templates::embedded().unwrap(),
            3,
        );
        let cases: Vec<CaseDescriptor> = [
            "[throws] [unrelatedToMock] [Overflow] overflow",
            "[throws] [relatedToMockException] [MockFails] mock",
            "[doesNotThrow] [unrelatedToMock] [Negative] negative",
            "[doesNotThrow] [unrelatedToMock] [Unknown] whatever",
        ]
        .iter()
        .map(|l| parse_descriptor(l).unwrap())
        .collect();

        let results = synthesizer.synthesize("int Add(int a, int b)", &unit(), &cases).await.unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].source, InputSource::Synthesized);
        assert_eq!(results[0].values[0].value.as_deref(), Some("2147483647"));
        assert_eq!(results[1].source, InputSource::ReusedForMockException);
        assert_eq!(results[1].values[0].value.as_deref(), Some("2"));
        assert_eq!(results[2].source, InputSource::Synthesized);
        assert_eq!(results[2].values[0].value.as_deref(), Some("-1"));
        assert_eq!(results[3].source, InputSource::Fallback);
        assert_eq!(results[3].values[1].value.as_deref(), Some("3"));
    }
}
