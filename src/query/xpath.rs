//! A small XPath-subset query binding
//!
//! ## Overview
//!
//! [`SimplePathEvaluator`] implements [`QueryEvaluator`] directly over
//! `roxmltree` documents. It understands location paths over the child,
//! attribute, self, parent and descendant-or-self axes, name tests with
//! namespace prefixes, predicates, comparisons, boolean operators, variable
//! references and the `true()` / `false()` / `not()` / `count()` functions.
//!
//! ## Limitations
//!
//! This is not a full query language. No arithmetic, no string functions,
//! no positional functions beyond numeric predicates, and expressions are
//! re-parsed on every call. It is sufficient for realistic rule sets and
//! for exercising the engine; deployments needing XPath 2.0+ semantics
//! should bind their own engine through [`QueryEvaluator`].

use roxmltree::Node;

use crate::error::{Error, ExpressionError, Result};
use crate::namespaces::NamespaceBindings;

use super::parser::{parse, Expr, NameTest, PathExpr, PathStep, StepAxis};
use super::{node_string_value, QueryEvaluator, QueryScope, QueryValue, ScopeValue};

/// Query evaluator for the supported XPath subset
#[derive(Debug, Clone, Default)]
pub struct SimplePathEvaluator {
    namespaces: NamespaceBindings,
}

impl SimplePathEvaluator {
    /// Create an evaluator with no namespace bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace bindings used to resolve prefixed name tests
    pub fn with_namespaces(mut self, namespaces: NamespaceBindings) -> Self {
        self.namespaces = namespaces;
        self
    }

    fn eval_expr<'a, 'input>(
        &self,
        expr: &Expr,
        context: Node<'a, 'input>,
        scope: &QueryScope,
    ) -> Result<QueryValue<'a, 'input>> {
        match expr {
            Expr::Or(left, right) => {
                let value = self.eval_expr(left, context, scope)?.is_truthy()
                    || self.eval_expr(right, context, scope)?.is_truthy();
                Ok(QueryValue::Boolean(value))
            }
            Expr::And(left, right) => {
                let value = self.eval_expr(left, context, scope)?.is_truthy()
                    && self.eval_expr(right, context, scope)?.is_truthy();
                Ok(QueryValue::Boolean(value))
            }
            Expr::Not(inner) => {
                let value = self.eval_expr(inner, context, scope)?.is_truthy();
                Ok(QueryValue::Boolean(!value))
            }
            Expr::Compare {
                left,
                right,
                negated,
            } => {
                let left = self.eval_expr(left, context, scope)?;
                let right = self.eval_expr(right, context, scope)?;
                let equal = values_equal(&left, &right);
                Ok(QueryValue::Boolean(equal != *negated))
            }
            Expr::Literal(s) => Ok(QueryValue::String(s.clone())),
            Expr::Number(n) => Ok(QueryValue::Number(*n)),
            Expr::BoolLit(b) => Ok(QueryValue::Boolean(*b)),
            Expr::Count(inner) => match self.eval_expr(inner, context, scope)? {
                QueryValue::Nodes(nodes) => Ok(QueryValue::Number(nodes.len() as f64)),
                QueryValue::Strings(values) => Ok(QueryValue::Number(values.len() as f64)),
                _ => Err(Error::Expression(ExpressionError::new(
                    "count(..)",
                    "count() expects a node-set argument",
                ))),
            },
            Expr::Var(name) => match scope.get(name) {
                Some(ScopeValue::Boolean(b)) => Ok(QueryValue::Boolean(*b)),
                Some(ScopeValue::Number(n)) => Ok(QueryValue::Number(*n)),
                Some(ScopeValue::String(s)) => Ok(QueryValue::String(s.clone())),
                None => Err(Error::Expression(ExpressionError::new(
                    format!("${}", name),
                    "unknown variable",
                ))),
            },
            Expr::Path(path) => self.eval_path(path, context, scope),
        }
    }

    fn eval_path<'a, 'input>(
        &self,
        path: &PathExpr,
        context: Node<'a, 'input>,
        scope: &QueryScope,
    ) -> Result<QueryValue<'a, 'input>> {
        let mut current: Vec<Node<'a, 'input>> = if path.absolute {
            vec![context.document().root()]
        } else {
            vec![context]
        };

        for (index, step) in path.steps.iter().enumerate() {
            match step.axis {
                StepAxis::SelfNode => {
                    current = self.filter_predicates(current, &step.predicates, scope)?;
                }
                StepAxis::Parent => {
                    current = current.iter().filter_map(|n| n.parent()).collect();
                }
                StepAxis::DescendantOrSelf => {
                    let mut expanded: Vec<Node> = Vec::new();
                    for node in &current {
                        for descendant in node.descendants() {
                            if !expanded.iter().any(|n| n.id() == descendant.id()) {
                                expanded.push(descendant);
                            }
                        }
                    }
                    current = expanded;
                }
                StepAxis::Child => {
                    let test = step.test.as_ref().expect("child step carries a name test");
                    let mut next = Vec::new();
                    for node in &current {
                        let mut group = Vec::new();
                        for child in node.children() {
                            if self.element_matches(&child, test)? {
                                group.push(child);
                            }
                        }
                        next.extend(self.filter_predicates(group, &step.predicates, scope)?);
                    }
                    current = next;
                }
                StepAxis::Attribute => {
                    let test = step
                        .test
                        .as_ref()
                        .expect("attribute step carries a name test");
                    if index != path.steps.len() - 1 {
                        return Err(Error::Expression(ExpressionError::new(
                            format!("@{}", test.local),
                            "attribute steps must be the last step of a path",
                        )));
                    }
                    if !step.predicates.is_empty() {
                        return Err(Error::Expression(ExpressionError::new(
                            format!("@{}", test.local),
                            "predicates on attribute steps are not supported",
                        )));
                    }
                    let mut values = Vec::new();
                    for node in &current {
                        self.collect_attributes(node, test, &mut values)?;
                    }
                    return Ok(QueryValue::Strings(values));
                }
            }
        }

        Ok(QueryValue::Nodes(current))
    }

    fn collect_attributes(
        &self,
        node: &Node,
        test: &NameTest,
        values: &mut Vec<String>,
    ) -> Result<()> {
        if !node.is_element() {
            return Ok(());
        }
        if test.is_wildcard() {
            values.extend(node.attributes().map(|a| a.value().to_string()));
            return Ok(());
        }
        let value = match self.resolve_prefix(test)? {
            Some(uri) => node.attribute((uri, test.local.as_str())),
            None => node.attribute(test.local.as_str()),
        };
        if let Some(value) = value {
            values.push(value.to_string());
        }
        Ok(())
    }

    fn filter_predicates<'a, 'input>(
        &self,
        mut group: Vec<Node<'a, 'input>>,
        predicates: &[Expr],
        scope: &QueryScope,
    ) -> Result<Vec<Node<'a, 'input>>> {
        for predicate in predicates {
            group = match predicate {
                // numeric predicate selects by position within the group
                Expr::Number(n) => {
                    let wanted = *n as usize;
                    group
                        .into_iter()
                        .enumerate()
                        .filter(|(i, _)| i + 1 == wanted)
                        .map(|(_, node)| node)
                        .collect()
                }
                other => {
                    let mut kept = Vec::new();
                    for node in group {
                        if self.eval_expr(other, node, scope)?.is_truthy() {
                            kept.push(node);
                        }
                    }
                    kept
                }
            };
        }
        Ok(group)
    }

    fn resolve_prefix<'t>(&'t self, test: &'t NameTest) -> Result<Option<&'t str>> {
        match &test.prefix {
            Some(prefix) => {
                let uri = self.namespaces.uri(prefix).ok_or_else(|| {
                    Error::Expression(ExpressionError::new(
                        format!("{}:{}", prefix, test.local),
                        "unknown namespace prefix",
                    ))
                })?;
                Ok(Some(uri))
            }
            None => Ok(None),
        }
    }

    fn element_matches(&self, node: &Node, test: &NameTest) -> Result<bool> {
        if !node.is_element() {
            return Ok(false);
        }
        if test.is_wildcard() {
            return Ok(true);
        }
        if node.tag_name().name() != test.local {
            return Ok(false);
        }
        Ok(node.tag_name().namespace() == self.resolve_prefix(test)?)
    }

    fn match_path(&self, path: &PathExpr, node: Node, scope: &QueryScope) -> Result<bool> {
        if path.steps.is_empty() {
            // bare "/" selects the document node, which is never a candidate
            return Ok(node.is_root());
        }
        self.match_steps(&path.steps, node, path.absolute, scope)
    }

    /// Match a node against the trailing step of a path, then its ancestry
    /// against the remaining steps.
    fn match_steps(
        &self,
        steps: &[PathStep],
        node: Node,
        anchored: bool,
        scope: &QueryScope,
    ) -> Result<bool> {
        let (last, rest) = match steps.split_last() {
            Some(split) => split,
            // all steps consumed: an anchored path requires the document node
            None => return Ok(!anchored || node.is_root()),
        };

        match last.axis {
            StepAxis::SelfNode => self.match_steps(rest, node, anchored, scope),
            StepAxis::Child => {
                let test = last.test.as_ref().expect("child step carries a name test");
                if !self.element_matches(&node, test)? {
                    return Ok(false);
                }
                if !self.pattern_predicates_hold(last, node, scope)? {
                    return Ok(false);
                }
                match node.parent() {
                    Some(parent) => self.match_steps(rest, parent, anchored, scope),
                    None => Ok(rest.is_empty() && !anchored),
                }
            }
            StepAxis::DescendantOrSelf => {
                // the steps before "//" may match at any ancestor-or-self level
                let mut current = Some(node);
                while let Some(candidate) = current {
                    if self.match_steps(rest, candidate, anchored, scope)? {
                        return Ok(true);
                    }
                    current = candidate.parent();
                }
                Ok(false)
            }
            StepAxis::Attribute | StepAxis::Parent => Err(Error::Expression(
                ExpressionError::new(
                    steps
                        .iter()
                        .map(step_repr)
                        .collect::<Vec<_>>()
                        .join("/"),
                    "axis not usable in a rule context",
                ),
            )),
        }
    }

    fn pattern_predicates_hold(
        &self,
        step: &PathStep,
        node: Node,
        scope: &QueryScope,
    ) -> Result<bool> {
        let test = step.test.as_ref().expect("child step carries a name test");
        for predicate in &step.predicates {
            let holds = match predicate {
                Expr::Number(n) => {
                    // position among same-name preceding siblings
                    let mut position = 1usize;
                    for sibling in node.prev_siblings() {
                        if self.element_matches(&sibling, test)? {
                            position += 1;
                        }
                    }
                    position == *n as usize
                }
                other => self.eval_expr(other, node, scope)?.is_truthy(),
            };
            if !holds {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl QueryEvaluator for SimplePathEvaluator {
    fn evaluate<'a, 'input>(
        &self,
        expression: &str,
        context: Node<'a, 'input>,
        scope: &QueryScope,
    ) -> Result<QueryValue<'a, 'input>> {
        let expr = parse(expression)?;
        self.eval_expr(&expr, context, scope)
    }

    fn matches(&self, expression: &str, node: Node, scope: &QueryScope) -> Result<bool> {
        match parse(expression)? {
            Expr::Path(path) => self.match_path(&path, node, scope),
            other => {
                // non-path contexts are evaluated from the document node
                let root = node.document().root();
                match self.eval_expr(&other, root, scope)? {
                    QueryValue::Nodes(nodes) => Ok(nodes.iter().any(|n| n.id() == node.id())),
                    value => Ok(value.is_truthy()),
                }
            }
        }
    }
}

fn step_repr(step: &PathStep) -> String {
    match (step.axis, &step.test) {
        (StepAxis::SelfNode, _) => ".".to_string(),
        (StepAxis::Parent, _) => "..".to_string(),
        (StepAxis::DescendantOrSelf, _) => "/".to_string(),
        (StepAxis::Attribute, Some(test)) => format!("@{}", test.local),
        (_, Some(test)) => test.local.clone(),
        (_, None) => String::new(),
    }
}

/// Equality in the subset: existential over sets, numeric when both
/// operands are numbers, string comparison otherwise.
fn values_equal(left: &QueryValue, right: &QueryValue) -> bool {
    match (set_members(left), set_members(right)) {
        (Some(ls), Some(rs)) => ls.iter().any(|l| rs.iter().any(|r| l == r)),
        (Some(ls), None) => ls.iter().any(|l| member_equals_scalar(l, right)),
        (None, Some(rs)) => rs.iter().any(|r| member_equals_scalar(r, left)),
        (None, None) => scalars_equal(left, right),
    }
}

fn set_members(value: &QueryValue) -> Option<Vec<String>> {
    match value {
        QueryValue::Nodes(nodes) => Some(nodes.iter().map(node_string_value).collect()),
        QueryValue::Strings(values) => Some(values.clone()),
        _ => None,
    }
}

fn member_equals_scalar(member: &str, scalar: &QueryValue) -> bool {
    match scalar {
        QueryValue::Number(n) => member.trim().parse::<f64>().map_or(false, |m| m == *n),
        QueryValue::Boolean(b) => !member.is_empty() == *b,
        other => member == other.as_string(),
    }
}

fn scalars_equal(left: &QueryValue, right: &QueryValue) -> bool {
    match (left, right) {
        (QueryValue::Number(a), QueryValue::Number(b)) => a == b,
        (QueryValue::Boolean(a), QueryValue::Boolean(b)) => a == b,
        (QueryValue::Number(n), other) | (other, QueryValue::Number(n)) => {
            other.as_string().trim().parse::<f64>().map_or(false, |m| m == *n)
        }
        (a, b) => a.as_string() == b.as_string(),
    }
}
