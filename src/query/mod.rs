//! Query support for Schematron validation
//!
//! Schematron delegates all expression work — rule contexts, check tests,
//! `<let>` values — to a query binding language. This module defines the
//! seam the engine calls through: the [`QueryValue`] result type, the
//! layered [`QueryScope`] of variable bindings, and the [`QueryEvaluator`]
//! trait. Implementations must be synchronous and side-effect-free; the
//! engine may call them in any order and from any thread.
//!
//! A limited XPath-subset binding ships in [`xpath`]; deployments needing a
//! full query language implement [`QueryEvaluator`] over their own engine.

mod parser;
pub mod xpath;

pub use parser::{is_ncname, Expr, NameTest, PathExpr, PathStep, StepAxis};
pub use xpath::SimplePathEvaluator;

use std::collections::HashMap;

use roxmltree::Node;

use crate::error::Result;

/// Result of evaluating a query expression
#[derive(Debug, Clone)]
pub enum QueryValue<'a, 'input> {
    /// A boolean result
    Boolean(bool),
    /// A number result
    Number(f64),
    /// A string result
    String(String),
    /// An element node-set result, in document order
    Nodes(Vec<Node<'a, 'input>>),
    /// A string-set result from attribute or text selections
    Strings(Vec<String>),
}

impl<'a, 'input> QueryValue<'a, 'input> {
    /// Boolean coercion: non-empty node-sets and string-sets are true,
    /// numbers are true unless zero or NaN, strings are true unless empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            QueryValue::Boolean(b) => *b,
            QueryValue::Number(n) => *n != 0.0 && !n.is_nan(),
            QueryValue::String(s) => !s.is_empty(),
            QueryValue::Nodes(nodes) => !nodes.is_empty(),
            QueryValue::Strings(values) => !values.is_empty(),
        }
    }

    /// String coercion: node-sets and string-sets yield their first
    /// member's string value, the empty string when empty.
    pub fn as_string(&self) -> String {
        match self {
            QueryValue::Boolean(b) => b.to_string(),
            QueryValue::Number(n) => format_number(*n),
            QueryValue::String(s) => s.clone(),
            QueryValue::Nodes(nodes) => nodes.first().map(node_string_value).unwrap_or_default(),
            QueryValue::Strings(values) => values.first().cloned().unwrap_or_default(),
        }
    }

    /// Collapse into an owned [`ScopeValue`] for storage in a variable scope
    pub fn into_scope_value(self) -> ScopeValue {
        match self {
            QueryValue::Boolean(b) => ScopeValue::Boolean(b),
            QueryValue::Number(n) => ScopeValue::Number(n),
            QueryValue::String(s) => ScopeValue::String(s),
            set @ (QueryValue::Nodes(_) | QueryValue::Strings(_)) => {
                ScopeValue::String(set.as_string())
            }
        }
    }
}

/// The string value of a node: its descendant text, concatenated
pub fn node_string_value(node: &Node) -> String {
    let mut out = String::new();
    for descendant in node.descendants() {
        if descendant.is_text() {
            if let Some(text) = descendant.text() {
                out.push_str(text);
            }
        }
    }
    out
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// An owned variable value held in a [`QueryScope`].
///
/// Node-set results collapse to their string value when captured, so scopes
/// never borrow the document they were computed against.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeValue {
    /// A boolean value
    Boolean(bool),
    /// A number value
    Number(f64),
    /// A string value
    String(String),
}

impl ScopeValue {
    /// Boolean coercion, mirroring [`QueryValue::is_truthy`]
    pub fn is_truthy(&self) -> bool {
        match self {
            ScopeValue::Boolean(b) => *b,
            ScopeValue::Number(n) => *n != 0.0 && !n.is_nan(),
            ScopeValue::String(s) => !s.is_empty(),
        }
    }

    /// String coercion
    pub fn as_string(&self) -> String {
        match self {
            ScopeValue::Boolean(b) => b.to_string(),
            ScopeValue::Number(n) => format_number(*n),
            ScopeValue::String(s) => s.clone(),
        }
    }
}

/// Lexically nested variable bindings.
///
/// Frames stack schema → phase → pattern → rule; lookup walks innermost
/// first, so the closest declaration of a name wins. A scope is extended by
/// [`child`](QueryScope::child), never mutated in place by consumers, which
/// keeps outer scopes shareable across patterns and nodes.
#[derive(Debug, Clone)]
pub struct QueryScope {
    frames: Vec<HashMap<String, ScopeValue>>,
}

impl Default for QueryScope {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryScope {
    /// Create a scope with a single empty frame
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    /// Create a copy of this scope with a fresh innermost frame
    pub fn child(&self) -> Self {
        let mut frames = self.frames.clone();
        frames.push(HashMap::new());
        Self { frames }
    }

    /// Bind a name in the innermost frame
    pub fn bind(&mut self, name: impl Into<String>, value: ScopeValue) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Check whether a name is already bound in the innermost frame
    pub fn binds_locally(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|frame| frame.contains_key(name))
            .unwrap_or(false)
    }

    /// Look up a name, innermost frame first
    pub fn get(&self, name: &str) -> Option<&ScopeValue> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }
}

/// The expression evaluation capability the engine is parameterized over.
///
/// Given a context node, a variable scope and an expression string, an
/// evaluator returns a boolean, number, string or node-set. Evaluation must
/// be pure: same inputs, same result, no observable side effects.
pub trait QueryEvaluator {
    /// Evaluate an expression against a context node
    fn evaluate<'a, 'input>(
        &self,
        expression: &str,
        context: Node<'a, 'input>,
        scope: &QueryScope,
    ) -> Result<QueryValue<'a, 'input>>;

    /// Decide whether a node satisfies a rule-context expression.
    ///
    /// The expression is interpreted as a node test applicable from the
    /// document root. The default implementation evaluates the expression
    /// from the root and tests node-set membership; bindings with native
    /// pattern matching should override this.
    fn matches(&self, expression: &str, node: Node, scope: &QueryScope) -> Result<bool> {
        let root = node.document().root();
        match self.evaluate(expression, root, scope)? {
            QueryValue::Nodes(nodes) => Ok(nodes.iter().any(|n| n.id() == node.id())),
            other => Ok(other.is_truthy()),
        }
    }
}
