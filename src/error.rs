//! Error types for schematron-rs
//!
//! This module defines all error types used throughout the library.
//! Structural errors (cycles, unresolved or duplicated identifiers) are
//! fatal and surface before any matching occurs; expression evaluation
//! errors are recoverable per check under the default lenient policy.

use std::fmt;
use thiserror::Error;

/// Result type alias using schematron Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for schematron operations
#[derive(Error, Debug)]
pub enum Error {
    /// A rule extension chain loops back on itself
    #[error("cyclic extension: {0}")]
    CyclicExtension(#[from] CyclicExtensionError),

    /// A reference by id does not resolve to a declared element
    #[error("unresolved reference: {0}")]
    UnresolvedReference(#[from] UnresolvedReferenceError),

    /// Two extension targets share the same id
    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(#[from] DuplicateIdentifierError),

    /// A query expression could not be evaluated
    #[error("expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// XML parsing error from the document model
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Kinds of id references resolved by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An `extends` pointer to an abstract rule
    AbstractRule,
    /// An `is-a` pointer to an abstract pattern
    AbstractPattern,
    /// A pattern id listed in a phase's active set
    Pattern,
    /// A phase id requested for validation
    Phase,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReferenceKind::AbstractRule => "abstract rule",
            ReferenceKind::AbstractPattern => "abstract pattern",
            ReferenceKind::Pattern => "pattern",
            ReferenceKind::Phase => "phase",
        };
        write!(f, "{}", s)
    }
}

/// Error raised when a rule extension chain contains a cycle.
///
/// A cycle is a structural defect of the schema: resolution of the whole
/// schema is aborted, not just the rule that exposed the loop.
#[derive(Debug, Clone)]
pub struct CyclicExtensionError {
    /// The chain of rule identities forming the cycle, first repeat last
    pub cycle: Vec<String>,
}

impl CyclicExtensionError {
    /// Create a cycle error from the offending chain
    pub fn new(cycle: Vec<String>) -> Self {
        Self { cycle }
    }
}

impl fmt::Display for CyclicExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule extension cycle: {}", self.cycle.join(" -> "))
    }
}

impl std::error::Error for CyclicExtensionError {}

/// Error raised when an id reference does not resolve
#[derive(Debug, Clone)]
pub struct UnresolvedReferenceError {
    /// What kind of element the reference expected
    pub kind: ReferenceKind,
    /// The id that failed to resolve
    pub reference: String,
    /// Where the reference appeared, when known
    pub location: Option<String>,
}

impl UnresolvedReferenceError {
    /// Create an unresolved reference error
    pub fn new(kind: ReferenceKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            location: None,
        }
    }

    /// Set the location the reference appeared at
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for UnresolvedReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no {} with id \"{}\"", self.kind, self.reference)?;
        if let Some(ref location) = self.location {
            write!(f, " (referenced from {})", location)?;
        }
        Ok(())
    }
}

impl std::error::Error for UnresolvedReferenceError {}

/// Error raised when two extension targets carry the same id
#[derive(Debug, Clone)]
pub struct DuplicateIdentifierError {
    /// What kind of element carries the duplicate
    pub kind: ReferenceKind,
    /// The duplicated id
    pub identifier: String,
}

impl DuplicateIdentifierError {
    /// Create a duplicate identifier error
    pub fn new(kind: ReferenceKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for DuplicateIdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} id \"{}\" is declared twice", self.kind, self.identifier)
    }
}

impl std::error::Error for DuplicateIdentifierError {}

/// Error raised when a query expression fails to parse or evaluate
#[derive(Debug, Clone)]
pub struct ExpressionError {
    /// The offending expression
    pub expression: String,
    /// The reason evaluation failed
    pub reason: String,
    /// Document path of the context node, when known
    pub context: Option<String>,
}

impl ExpressionError {
    /// Create an expression error
    pub fn new(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            reason: reason.into(),
            context: None,
        }
    }

    /// Set the document path of the context node
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to evaluate \"{}\": {}", self.expression, self.reason)?;
        if let Some(ref context) = self.context {
            write!(f, " (context: {})", context)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExpressionError {}
