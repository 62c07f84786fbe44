//! Check evaluation
//!
//! For every (node, rule) binding this module establishes the rule's
//! variable scope, evaluates the assembled checks in order and records the
//! fired results. Asserts fire when their test is false, reports when it
//! is true; unlike rule matching, every check of a rule is evaluated —
//! several may fire for one binding.
//!
//! Rule-level variables are bound against the matched node, in declaration
//! order, each at most once; a name already bound by the declaring rule is
//! not rebound by an inherited declaration. Expression failures follow the
//! selected policy: lenient records a marker and continues with the
//! remaining checks and nodes, fail-fast aborts the run.

use crate::ast::{CheckBody, CheckKind, Variable};
use crate::error::Result;
use crate::query::{QueryEvaluator, QueryScope, QueryValue, ScopeValue};

use super::matching::{node_path, MatchBinding};
use super::report::{CheckResult, EvaluationFailure, FailureStage};
use super::ErrorPolicy;

/// Evaluate the checks of every binding, in binding order.
///
/// `scope` is the pattern-level scope; each binding extends it with the
/// rule's own variable frame before its checks run.
pub fn evaluate_bindings(
    bindings: &[MatchBinding],
    pattern_id: Option<&str>,
    evaluator: &dyn QueryEvaluator,
    scope: &QueryScope,
    policy: ErrorPolicy,
    failures: &mut Vec<EvaluationFailure>,
) -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    for binding in bindings {
        let rule_scope = bind_rule_variables(binding, evaluator, scope, policy, failures)?;

        for check in &binding.rule.checks {
            let body = check.body();
            let fired = match evaluator.evaluate(body.test.as_str(), binding.node, &rule_scope) {
                Ok(value) => match check.kind() {
                    CheckKind::Assert => !value.is_truthy(),
                    CheckKind::Report => value.is_truthy(),
                },
                Err(err) => {
                    if policy == ErrorPolicy::FailFast {
                        return Err(err);
                    }
                    failures.push(EvaluationFailure {
                        stage: FailureStage::CheckTest,
                        expression: body.test.as_str().to_string(),
                        location: node_path(&binding.node),
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            if !fired {
                continue;
            }

            let location =
                resolve_subject(binding, body, evaluator, &rule_scope, policy, failures)?;
            results.push(build_result(binding, check.kind(), body, pattern_id, location));
        }
    }

    Ok(results)
}

/// Extend the pattern scope with the rule's variable frame.
fn bind_rule_variables(
    binding: &MatchBinding,
    evaluator: &dyn QueryEvaluator,
    scope: &QueryScope,
    policy: ErrorPolicy,
    failures: &mut Vec<EvaluationFailure>,
) -> Result<QueryScope> {
    let mut rule_scope = scope.child();

    for variable in &binding.rule.variables {
        // the declaring rule's binding wins over inherited ones
        if rule_scope.binds_locally(variable.name()) {
            continue;
        }
        match variable {
            Variable::Xml(v) => {
                rule_scope.bind(v.name.as_str(), ScopeValue::String(v.content.clone()));
            }
            Variable::XPath(v) => {
                match evaluator.evaluate(v.value.as_str(), binding.node, &rule_scope) {
                    Ok(value) => rule_scope.bind(v.name.as_str(), value.into_scope_value()),
                    Err(err) => {
                        if policy == ErrorPolicy::FailFast {
                            return Err(err);
                        }
                        // leave the name unbound; checks using it fail individually
                        failures.push(EvaluationFailure {
                            stage: FailureStage::VariableBinding,
                            expression: v.value.as_str().to_string(),
                            location: node_path(&binding.node),
                            message: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(rule_scope)
}

/// Resolve the subject node a fired result should point at.
///
/// The check's subject wins over the rule's; no subject, an empty
/// selection or (under the lenient policy) a failing subject expression
/// all fall back to the bound node.
fn resolve_subject(
    binding: &MatchBinding,
    body: &CheckBody,
    evaluator: &dyn QueryEvaluator,
    scope: &QueryScope,
    policy: ErrorPolicy,
    failures: &mut Vec<EvaluationFailure>,
) -> Result<String> {
    let expr = match body.subject.as_ref().or(binding.rule.subject.as_ref()) {
        Some(expr) => expr,
        None => return Ok(node_path(&binding.node)),
    };

    match evaluator.evaluate(expr.as_str(), binding.node, scope) {
        Ok(QueryValue::Nodes(nodes)) if !nodes.is_empty() => Ok(node_path(&nodes[0])),
        Ok(_) => Ok(node_path(&binding.node)),
        Err(err) => {
            if policy == ErrorPolicy::FailFast {
                return Err(err);
            }
            failures.push(EvaluationFailure {
                stage: FailureStage::SubjectResolution,
                expression: expr.as_str().to_string(),
                location: node_path(&binding.node),
                message: err.to_string(),
            });
            Ok(node_path(&binding.node))
        }
    }
}

fn build_result(
    binding: &MatchBinding,
    kind: CheckKind,
    body: &CheckBody,
    pattern_id: Option<&str>,
    location: String,
) -> CheckResult {
    let rule = binding.rule;
    CheckResult {
        kind,
        id: body.id.clone(),
        content: body.content.clone(),
        test: body.test.as_str().to_string(),
        location,
        rule_context: rule.context.as_str().to_string(),
        pattern: pattern_id.map(str::to_string),
        flag: body.flag.clone().or_else(|| rule.flag.clone()),
        diagnostics: body.diagnostics.clone(),
        properties: body.properties.clone(),
        role: body.role.clone().or_else(|| rule.role.clone()),
        see: body.see.clone().or_else(|| rule.see.clone()),
        fpi: body.fpi.clone().or_else(|| rule.fpi.clone()),
        icon: body.icon.clone().or_else(|| rule.icon.clone()),
        xml_lang: body.xml_lang.clone().or_else(|| rule.xml_lang.clone()),
        xml_space: body.xml_space.or(rule.xml_space),
    }
}
