//! Boundary case lifecycle
//!
//! ```text
//! Unresolved --assign_inputs--> InputsAssigned --assign_output--> OutputAssigned --finalize--> Final
//!                                     |                                                     ^
//!                                     +-------------- finalize (pre-marked throwing) --------+
//! ```
//!
//! Only `Final` cases reach the assembler. A case whose inputs fell back to
//! the normal case still moves through every state.

use crate::emit::{BoundaryMethod, Expectation};
use crate::enumerate::CaseDescriptor;
use crate::error::{Error, Result};
use crate::synthesize::{CaseInputs, InputSource};
use crate::trace::NamedValue;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    Unresolved,
    InputsAssigned,
    OutputAssigned,
    Final,
}

impl CaseState {
    pub fn name(self) -> &'static str {
        match self {
            CaseState::Unresolved => "unresolved",
            CaseState::InputsAssigned => "inputs-assigned",
            CaseState::OutputAssigned => "output-assigned",
            CaseState::Final => "final",
        }
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A synthesized test case on its way to the suite
#[derive(Debug, Clone)]
pub struct BoundaryCase {
    /// Position in the enumerated list; also the harness result file name
    pub index: usize,
    pub name: String,
    pub description: String,
    /// Whether the call is expected to throw; corrected by the harness
    pub throws: bool,
    /// Mocked dependencies are set up to throw
    pub mock_exception: bool,
    pub inputs: Vec<NamedValue>,
    pub input_source: Option<InputSource>,
    /// The harness contradicted the enumerated "does not throw"
    pub reclassified: bool,
    expectation: Option<Expectation>,
    state: CaseState,
}

impl BoundaryCase {
    pub fn from_descriptor(index: usize, descriptor: &CaseDescriptor) -> Self {
        Self {
            index,
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            throws: descriptor.throws,
            mock_exception: descriptor.mock_exception,
            inputs: Vec::new(),
            input_source: None,
            reclassified: false,
            expectation: None,
            state: CaseState::Unresolved,
        }
    }

    pub fn state(&self) -> CaseState {
        self.state
    }

    fn transition(&mut self, expected: CaseState, to: CaseState) -> Result<()> {
        if self.state != expected {
            return Err(Error::CaseState {
                case: self.name.clone(),
                from: self.state.name(),
                to: to.name(),
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn assign_inputs(&mut self, inputs: CaseInputs) -> Result<()> {
        self.transition(CaseState::Unresolved, CaseState::InputsAssigned)?;
        self.inputs = inputs.values;
        self.input_source = Some(inputs.source);
        Ok(())
    }

    /// Needs an output-calculation run: inputs known, not pre-marked throwing
    pub fn needs_output(&self) -> bool {
        self.state == CaseState::InputsAssigned && !self.throws
    }

    /// Record the outcome observed by the harness
    ///
    /// An observed exception overrides the enumerated "does not throw".
    pub fn assign_output(&mut self, observed: Expectation) -> Result<()> {
        self.transition(CaseState::InputsAssigned, CaseState::OutputAssigned)?;
        if observed == Expectation::Throws && !self.throws {
            tracing::info!(case = %self.name, "harness observed an exception, reclassifying");
            self.throws = true;
            self.reclassified = true;
        }
        self.expectation = Some(observed);
        Ok(())
    }

    /// Close the case; pre-marked throwing cases close straight from
    /// `InputsAssigned`
    pub fn finalize(&mut self) -> Result<()> {
        match self.state {
            CaseState::InputsAssigned if self.throws => {
                self.expectation = Some(Expectation::Throws);
                self.transition(CaseState::InputsAssigned, CaseState::Final)
            }
            _ => self.transition(CaseState::OutputAssigned, CaseState::Final),
        }
    }

    pub fn expectation(&self) -> Option<&Expectation> {
        self.expectation.as_ref()
    }

    /// Generator view of a final case
    pub fn method(&self) -> Result<BoundaryMethod<'_>> {
        match (&self.expectation, self.state) {
            (Some(expectation), CaseState::Final) => Ok(BoundaryMethod {
                case_name: &self.name,
                inputs: &self.inputs,
                expectation,
                mock_exception: self.mock_exception,
            }),
            _ => Err(Error::CaseState {
                case: self.name.clone(),
                from: self.state.name(),
                to: "assembled",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::parse_descriptor;

    fn case(line: &str) -> BoundaryCase {
        BoundaryCase::from_descriptor(3, &parse_descriptor(line).unwrap())
    }

    fn inputs() -> CaseInputs {
        CaseInputs {
            values: vec![NamedValue::new("a", "int", Some("0"))],
            source: InputSource::Synthesized,
        }
    }

    #[test]
    fn test_observed_exception_reclassifies() {
        let mut c = case("[noException] [unrelatedToMock] [Zero] zero");
        c.assign_inputs(inputs()).unwrap();
        assert!(c.needs_output());
        c.assign_output(Expectation::Throws).unwrap();
        c.finalize().unwrap();
        assert!(c.throws);
        assert!(c.reclassified);
        assert_eq!(c.method().unwrap().expectation, &Expectation::Throws);
    }

    #[test]
    fn test_pre_marked_throwing_skips_output() {
        let mut c = case("[exception] [mockFuncThrowException] [DividerThrows] x");
        c.assign_inputs(inputs()).unwrap();
        assert!(!c.needs_output());
        c.finalize().unwrap();
        assert_eq!(c.state(), CaseState::Final);
        let method = c.method().unwrap();
        assert!(method.mock_exception);
        assert_eq!(method.expectation, &Expectation::Throws);
    }

    #[test]
    fn test_out_of_order_transitions_fail() {
        let mut c = case("[doesNotThrow] [unrelatedToMock] [Zero] zero");
        assert!(matches!(
            c.assign_output(Expectation::Completes),
            Err(Error::CaseState { from: "unresolved", .. })
        ));
        assert!(c.method().is_err());

        c.assign_inputs(inputs()).unwrap();
        assert!(matches!(
            c.finalize(),
            Err(Error::CaseState { from: "inputs-assigned", to: "final", .. })
        ));
        assert!(c.assign_inputs(inputs()).is_err());

        c.assign_output(Expectation::Returns(Some("0".into()))).unwrap();
        c.finalize().unwrap();
        assert!(!c.reclassified);
        assert!(c.finalize().is_err());
    }
}
