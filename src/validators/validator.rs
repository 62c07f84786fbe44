//! Schematron document validation
//!
//! [`SchematronValidator`] ties the stages together: resolve the schema
//! (once, cached), select the active patterns for the requested phase,
//! match document nodes to rules, evaluate checks and aggregate the
//! report. The validator itself is immutable after construction; the
//! resolved-rule cache is built on first use and read-only afterwards, so
//! one validator can serve any number of validation runs.

use once_cell::sync::OnceCell;
use roxmltree::{Document, Node};

use crate::ast::{Schema, Variable};
use crate::error::Result;
use crate::namespaces::NamespaceBindings;
use crate::phases::{select_active_patterns, PhaseSpec};
use crate::query::{QueryEvaluator, QueryScope, ScopeValue};
use crate::resolver::{resolve, ResolvedSchema};

use super::evaluation::evaluate_bindings;
use super::matching::{match_pattern, node_path};
use super::report::{EvaluationFailure, FailureStage, ReportBuilder, ValidationReport};
use super::ErrorPolicy;

/// Validates XML documents against a Schematron schema.
///
/// The evaluator supplies the query language; [`SimplePathEvaluator`]
/// covers the built-in subset, or bind any [`QueryEvaluator`] of your own.
///
/// [`SimplePathEvaluator`]: crate::query::SimplePathEvaluator
pub struct SchematronValidator<Q> {
    schema: Schema,
    evaluator: Q,
    phase: PhaseSpec,
    policy: ErrorPolicy,
    resolved: OnceCell<ResolvedSchema>,
}

impl<Q: QueryEvaluator> SchematronValidator<Q> {
    /// Create a validator for a schema with the given query evaluator
    pub fn new(schema: Schema, evaluator: Q) -> Self {
        Self {
            schema,
            evaluator,
            phase: PhaseSpec::Default,
            policy: ErrorPolicy::Lenient,
            resolved: OnceCell::new(),
        }
    }

    /// Select the phase to validate with
    pub fn with_phase(mut self, phase: impl Into<PhaseSpec>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Select the expression-failure policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The schema this validator was built from
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Namespace bindings declared by the schema, for configuring an
    /// evaluator
    pub fn namespace_bindings(&self) -> NamespaceBindings {
        NamespaceBindings::from_declarations(&self.schema.namespaces)
    }

    /// The resolved view of the schema, built on first use.
    ///
    /// Structural defects (cycles, unresolved or duplicate ids) surface
    /// here, before any matching.
    pub fn resolved(&self) -> Result<&ResolvedSchema> {
        self.resolved.get_or_try_init(|| resolve(&self.schema))
    }

    /// Validate a document and produce the report.
    ///
    /// Stages run strictly in order: resolution, phase selection, matching,
    /// check evaluation, aggregation. Results are ordered by active pattern
    /// first, document order within each pattern.
    pub fn validate(&self, document: &Document) -> Result<ValidationReport> {
        let resolved = self.resolved()?;
        let active = select_active_patterns(resolved, &self.schema, &self.phase)?;
        let root = document.root();
        let mut failures = Vec::new();

        // schema variables, then phase variables, both against the document node
        let mut base_scope = QueryScope::new();
        self.bind_variables(&self.schema.variables, root, &mut base_scope, &mut failures)?;
        let mut phase_scope = base_scope.child();
        self.bind_variables(&active.variables, root, &mut phase_scope, &mut failures)?;

        let mut builder = ReportBuilder::new().with_phase(active.phase_id.clone());
        for pattern in &active.patterns {
            builder.start_pattern(pattern.id.as_deref());

            let mut pattern_scope = phase_scope.child();
            self.bind_variables(&pattern.variables, root, &mut pattern_scope, &mut failures)?;

            let bindings = match_pattern(
                pattern,
                document,
                &self.evaluator,
                &pattern_scope,
                self.policy,
                &mut failures,
            )?;
            let results = evaluate_bindings(
                &bindings,
                pattern.id.as_deref(),
                &self.evaluator,
                &pattern_scope,
                self.policy,
                &mut failures,
            )?;
            for result in results {
                builder.push_result(result);
            }
        }

        for failure in failures {
            builder.push_failure(failure);
        }
        Ok(builder.finish())
    }

    fn bind_variables(
        &self,
        variables: &[Variable],
        context: Node,
        scope: &mut QueryScope,
        failures: &mut Vec<EvaluationFailure>,
    ) -> Result<()> {
        for variable in variables {
            match variable {
                Variable::Xml(v) => {
                    scope.bind(v.name.as_str(), ScopeValue::String(v.content.clone()));
                }
                Variable::XPath(v) => {
                    match self.evaluator.evaluate(v.value.as_str(), context, scope) {
                        Ok(value) => scope.bind(v.name.as_str(), value.into_scope_value()),
                        Err(err) => {
                            if self.policy == ErrorPolicy::FailFast {
                                return Err(err);
                            }
                            failures.push(EvaluationFailure {
                                stage: FailureStage::VariableBinding,
                                expression: v.value.as_str().to_string(),
                                location: node_path(&context),
                                message: err.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Check, ConcretePattern, ConcreteRule, Pattern, Rule};
    use crate::query::SimplePathEvaluator;

    fn item_schema() -> Schema {
        Schema::new().with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_id("items").with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_check(Check::assert("@code", "code required")),
            )),
        ))
    }

    #[test]
    fn test_validate_reports_missing_code() {
        let validator = SchematronValidator::new(item_schema(), SimplePathEvaluator::new());
        let doc = roxmltree::Document::parse(r#"<order><item/><item code="A"/></order>"#)
            .unwrap();

        let report = validator.validate(&doc).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.fired.len(), 1);
        assert_eq!(report.fired[0].location, "/order[1]/item[1]");
    }

    #[test]
    fn test_validator_is_reusable() {
        let validator = SchematronValidator::new(item_schema(), SimplePathEvaluator::new());
        let good = roxmltree::Document::parse(r#"<order><item code="A"/></order>"#).unwrap();
        let bad = roxmltree::Document::parse("<order><item/></order>").unwrap();

        assert!(validator.validate(&good).unwrap().is_valid());
        assert!(!validator.validate(&bad).unwrap().is_valid());
        // the cached resolution is reused across runs
        assert!(validator.validate(&good).unwrap().is_valid());
    }

    #[test]
    fn test_resolution_errors_surface_before_matching() {
        let schema = Schema::new().with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_extends(crate::ast::Extends::by_id("missing")),
            )),
        ));
        let validator = SchematronValidator::new(schema, SimplePathEvaluator::new());
        let doc = roxmltree::Document::parse("<order/>").unwrap();

        assert!(validator.validate(&doc).is_err());
    }

    #[test]
    fn test_schema_variables_reach_checks() {
        let schema = Schema::new()
            .with_variable(Variable::xml("required", "A"))
            .with_pattern(Pattern::Concrete(ConcretePattern::new().with_rule(
                Rule::Concrete(
                    ConcreteRule::new("item")
                        .with_check(Check::assert("@code = $required", "wrong code")),
                ),
            )));
        let validator = SchematronValidator::new(schema, SimplePathEvaluator::new());

        let good = roxmltree::Document::parse(r#"<order><item code="A"/></order>"#).unwrap();
        let bad = roxmltree::Document::parse(r#"<order><item code="B"/></order>"#).unwrap();
        assert!(validator.validate(&good).unwrap().is_valid());
        assert!(!validator.validate(&bad).unwrap().is_valid());
    }
}
