//! # schematron-rs
//!
//! A Rust implementation of ISO Schematron rule resolution and validation
//! matching.
//!
//! The crate consumes a Schematron [`ast::Schema`] (produced by an
//! external markup parser), resolves rule `extends` chains and abstract
//! patterns into directly executable [`resolver::AssembledRule`]s, selects
//! the active patterns for a validation phase, binds document nodes to
//! rules under the first-match-wins contract, evaluates asserts and
//! reports, and aggregates an immutable [`ValidationReport`].
//!
//! ## Features
//!
//! - Rule inheritance via `extends`, including transitive and diamond
//!   chains, with cycle detection
//! - Abstract pattern instantiation with `$param` substitution
//! - Phase selection with `#ALL` / `#DEFAULT` sentinels
//! - First-match-wins node binding per pattern, in document order
//! - Assert / report evaluation with flags, subjects and diagnostics
//! - Pluggable query language through [`query::QueryEvaluator`], with a
//!   built-in XPath-subset binding
//!
//! ## Example
//!
//! ```rust
//! use schematron::ast::{Check, ConcretePattern, ConcreteRule, Pattern, Rule, Schema};
//! use schematron::query::SimplePathEvaluator;
//! use schematron::SchematronValidator;
//!
//! let schema = Schema::new().with_pattern(Pattern::Concrete(
//!     ConcretePattern::new().with_rule(Rule::Concrete(
//!         ConcreteRule::new("item").with_check(Check::assert("@code", "items need a code")),
//!     )),
//! ));
//!
//! let validator = SchematronValidator::new(schema, SimplePathEvaluator::new());
//! let document = roxmltree::Document::parse("<order><item/></order>")?;
//! let report = validator.validate(&document)?;
//! assert!(!report.is_valid());
//! # Ok::<(), schematron::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules - foundation
pub mod ast;
pub mod error;

// Core modules - utilities
pub mod namespaces;
pub mod query;

// Resolution and phase selection
pub mod phases;
pub mod resolver;

// Validation engine
pub mod validators;

// Re-exports for convenience
pub use error::{Error, Result};
pub use phases::PhaseSpec;
pub use validators::{ErrorPolicy, SchematronValidator, ValidationReport};

/// Version of the schematron-rs library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ISO Schematron namespace
pub const SCHEMATRON_NAMESPACE: &str = "http://purl.oclc.org/dsdl/schematron";

/// Schematron Validation Report Language namespace
pub const SVRL_NAMESPACE: &str = "http://purl.oclc.org/dsdl/svrl";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
