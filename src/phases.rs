//! Phase selection
//!
//! A phase names the subset of patterns one validation run activates, in
//! the order the phase lists them. The `#ALL` and `#DEFAULT` sentinels are
//! modeled as [`PhaseSpec`] variants rather than magic strings.

use crate::ast::{Schema, Variable};
use crate::error::{ReferenceKind, Result, UnresolvedReferenceError};
use crate::resolver::{ResolvedPattern, ResolvedSchema};

/// Which phase a validation run should use
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PhaseSpec {
    /// The schema's `defaultPhase`, or all patterns when none is declared
    #[default]
    Default,
    /// All patterns, ignoring phases
    All,
    /// A named phase
    Named(String),
}

impl PhaseSpec {
    /// Create a named phase spec
    pub fn named(id: impl Into<String>) -> Self {
        PhaseSpec::Named(id.into())
    }
}

impl From<&str> for PhaseSpec {
    /// Interpret the conventional sentinel strings
    fn from(s: &str) -> Self {
        match s {
            "#ALL" => PhaseSpec::All,
            "#DEFAULT" => PhaseSpec::Default,
            other => PhaseSpec::Named(other.to_string()),
        }
    }
}

/// The outcome of phase selection: the patterns to run, in activation
/// order, plus the phase's variable declarations.
#[derive(Debug, Clone)]
pub struct ActivePhase<'s> {
    /// Id of the selected phase, `None` when all patterns run
    pub phase_id: Option<String>,
    /// The active patterns, in activation order
    pub patterns: Vec<&'s ResolvedPattern>,
    /// Variables declared on the phase, added to the base scope
    pub variables: Vec<Variable>,
}

/// Select the active patterns for the requested phase.
///
/// With [`PhaseSpec::All`] (or [`PhaseSpec::Default`] on a schema without a
/// `defaultPhase`) every pattern is active in declaration order. A named
/// phase activates exactly the patterns its `active` list names, in list
/// order; an id that resolves to no pattern is an error, as is an unknown
/// phase id.
pub fn select_active_patterns<'s>(
    resolved: &'s ResolvedSchema,
    schema: &Schema,
    phase: &PhaseSpec,
) -> Result<ActivePhase<'s>> {
    let phase_id = match phase {
        PhaseSpec::All => None,
        PhaseSpec::Named(id) => Some(id.as_str()),
        PhaseSpec::Default => schema.default_phase.as_deref(),
    };

    let Some(phase_id) = phase_id else {
        return Ok(ActivePhase {
            phase_id: None,
            patterns: resolved.patterns().iter().collect(),
            variables: Vec::new(),
        });
    };

    let declared = schema
        .phase(phase_id)
        .ok_or_else(|| UnresolvedReferenceError::new(ReferenceKind::Phase, phase_id))?;

    let mut patterns = Vec::with_capacity(declared.active.len());
    for pattern_id in &declared.active {
        let pattern = resolved.pattern_by_id(pattern_id).ok_or_else(|| {
            UnresolvedReferenceError::new(ReferenceKind::Pattern, pattern_id)
                .with_location(format!("phase \"{}\"", phase_id))
        })?;
        patterns.push(pattern);
    }

    Ok(ActivePhase {
        phase_id: Some(phase_id.to_string()),
        patterns,
        variables: declared.variables.clone(),
    })
}
