//! Validation reports
//!
//! The owned, immutable output of a validation run: fired check results,
//! evaluation failure markers and the union of activated flags. Subject
//! nodes are captured as document paths so a report outlives the document
//! it was computed from; the whole report serializes for consumption by an
//! external renderer.
//!
//! A report distinguishes "nothing fired" from "evaluation was impossible
//! for some checks": [`ValidationReport::is_valid`] and
//! [`ValidationReport::is_complete`] never conflate the two.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::ast::{CheckKind, WhitespaceHandling};

/// One fired assert or report instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    /// Whether an assert or a report fired
    pub kind: CheckKind,
    /// Id of the check, if declared
    pub id: Option<String>,
    /// The check's literal content, opaque mixed text
    pub content: String,
    /// The test expression that was evaluated
    pub test: String,
    /// Document path of the resolved subject node
    pub location: String,
    /// Context expression of the rule that bound the node
    pub rule_context: String,
    /// Id of the pattern the rule belongs to, if declared
    pub pattern: Option<String>,
    /// Flag activated by this result
    pub flag: Option<String>,
    /// Referenced diagnostic ids, unresolved
    pub diagnostics: Vec<String>,
    /// Referenced property ids, unresolved
    pub properties: Vec<String>,
    /// Role of the check or its rule
    pub role: Option<String>,
    /// See URI of the check or its rule
    pub see: Option<String>,
    /// Formal public identifier of the check or its rule
    pub fpi: Option<String>,
    /// Icon reference of the check or its rule
    pub icon: Option<String>,
    /// Natural language of the check or its rule
    pub xml_lang: Option<String>,
    /// Whitespace handling of the check or its rule
    pub xml_space: Option<WhitespaceHandling>,
}

/// The stage at which an expression failed to evaluate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureStage {
    /// A rule context could not be tested against a node
    ContextMatch,
    /// A `<let>` value could not be computed
    VariableBinding,
    /// A check test could not be evaluated
    CheckTest,
    /// A subject expression could not be resolved
    SubjectResolution,
}

/// Marker for a check, variable or context the engine could not evaluate.
///
/// Under the lenient policy these accumulate instead of aborting the run;
/// their presence makes the report incomplete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationFailure {
    /// Where evaluation failed
    pub stage: FailureStage,
    /// The offending expression
    pub expression: String,
    /// Document path of the context node
    pub location: String,
    /// The underlying error message
    pub message: String,
}

/// The immutable result of one validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Id of the phase that was run, `None` when all patterns ran
    pub phase: Option<String>,
    /// Ids of the active patterns, in activation order
    pub pattern_ids: Vec<Option<String>>,
    /// Fired check results, in active-pattern then document order
    pub fired: Vec<CheckResult>,
    /// Evaluation failure markers
    pub failures: Vec<EvaluationFailure>,
    /// Union of all activated flags
    pub active_flags: BTreeSet<String>,
}

impl ValidationReport {
    /// True when no assert fired and evaluation was complete.
    ///
    /// Fired reports do not make a document invalid; they are
    /// informational. An incomplete report is never valid, since the
    /// unevaluated checks might have fired.
    pub fn is_valid(&self) -> bool {
        self.is_complete() && self.fired_asserts().next().is_none()
    }

    /// True when every expression evaluated; false when failure markers
    /// were recorded and the report covers only part of the document.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The fired asserts
    pub fn fired_asserts(&self) -> impl Iterator<Item = &CheckResult> {
        self.fired.iter().filter(|r| r.kind == CheckKind::Assert)
    }

    /// The fired reports
    pub fn fired_reports(&self) -> impl Iterator<Item = &CheckResult> {
        self.fired.iter().filter(|r| r.kind == CheckKind::Report)
    }

    /// Check whether a flag was activated during the run
    pub fn has_flag(&self, name: &str) -> bool {
        self.active_flags.contains(name)
    }
}

/// Accumulates per-pattern results into a [`ValidationReport`].
///
/// Results must be pushed in active-pattern order, node-by-node in
/// document order within each pattern; the builder preserves insertion
/// order and tracks the flag union.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    phase: Option<String>,
    pattern_ids: Vec<Option<String>>,
    fired: Vec<CheckResult>,
    failures: Vec<EvaluationFailure>,
    active_flags: BTreeSet<String>,
}

impl ReportBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the phase id the report covers
    pub fn with_phase(mut self, phase: Option<String>) -> Self {
        self.phase = phase;
        self
    }

    /// Record the start of an active pattern
    pub fn start_pattern(&mut self, id: Option<&str>) {
        self.pattern_ids.push(id.map(str::to_string));
    }

    /// Append a fired check result, activating its flag
    pub fn push_result(&mut self, result: CheckResult) {
        if let Some(flag) = &result.flag {
            self.active_flags.insert(flag.clone());
        }
        self.fired.push(result);
    }

    /// Append an evaluation failure marker
    pub fn push_failure(&mut self, failure: EvaluationFailure) {
        self.failures.push(failure);
    }

    /// Produce the immutable report
    pub fn finish(self) -> ValidationReport {
        ValidationReport {
            phase: self.phase,
            pattern_ids: self.pattern_ids,
            fired: self.fired,
            failures: self.failures,
            active_flags: self.active_flags,
        }
    }
}
