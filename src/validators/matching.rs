//! Node-to-rule matching
//!
//! Walks a document's element nodes in pre-order document order and binds
//! each node to the first rule of a pattern whose context matches. The
//! tie-break is exact: rules are probed in declared order (inherited
//! precedence is already folded into assembly), the first match wins, and
//! the remaining rules are skipped for that node. A node with no matching
//! rule simply produces no binding. Bindings are scoped per pattern — the
//! same node may bind again in other patterns.

use roxmltree::{Document, Node};

use crate::error::Result;
use crate::query::{QueryEvaluator, QueryScope};
use crate::resolver::{AssembledRule, ResolvedPattern};

use super::report::{EvaluationFailure, FailureStage};
use super::ErrorPolicy;

/// The pairing of one document node with the single rule that matched it
/// within one pattern.
#[derive(Debug, Clone)]
pub struct MatchBinding<'a, 'input, 's> {
    /// The matched document node
    pub node: Node<'a, 'input>,
    /// The rule that matched
    pub rule: &'s AssembledRule,
}

/// Compute the document path of a node, e.g. `/order[1]/item[2]`.
///
/// Positions count same-named element siblings, matching the location
/// format of SVRL reports.
pub fn node_path(node: &Node) -> String {
    if node.is_root() {
        return "/".to_string();
    }
    let mut segments = Vec::new();
    let mut current = Some(*node);
    while let Some(n) = current {
        if n.is_element() {
            let mut position = 1;
            for sibling in n.prev_siblings() {
                if sibling.is_element() && sibling.tag_name() == n.tag_name() {
                    position += 1;
                }
            }
            segments.push(format!("{}[{}]", n.tag_name().name(), position));
        }
        current = n.parent();
    }
    segments.reverse();
    format!("/{}", segments.join("/"))
}

/// Bind each element node of the document to at most one rule of the
/// pattern, first match wins.
///
/// A context probe that fails to evaluate is treated per policy: fail-fast
/// propagates the error, lenient records a failure marker and moves on to
/// the next rule for that node.
pub fn match_pattern<'a, 'input, 's>(
    pattern: &'s ResolvedPattern,
    document: &'a Document<'input>,
    evaluator: &dyn QueryEvaluator,
    scope: &QueryScope,
    policy: ErrorPolicy,
    failures: &mut Vec<EvaluationFailure>,
) -> Result<Vec<MatchBinding<'a, 'input, 's>>> {
    let mut bindings = Vec::new();

    for node in document.root().descendants().filter(Node::is_element) {
        for rule in &pattern.rules {
            match evaluator.matches(rule.context.as_str(), node, scope) {
                Ok(true) => {
                    bindings.push(MatchBinding { node, rule });
                    break;
                }
                Ok(false) => {}
                Err(err) => match policy {
                    ErrorPolicy::FailFast => return Err(err),
                    ErrorPolicy::Lenient => failures.push(EvaluationFailure {
                        stage: FailureStage::ContextMatch,
                        expression: rule.context.as_str().to_string(),
                        location: node_path(&node),
                        message: err.to_string(),
                    }),
                },
            }
        }
    }

    Ok(bindings)
}
