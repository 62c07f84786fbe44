//! XML namespace handling
//!
//! Utilities for the namespace prefix bindings a schema declares via `<ns>`
//! elements. Query evaluators use these to turn prefixed names in context
//! and test expressions into (namespace, local-name) pairs.

use std::collections::HashMap;

use crate::ast::Namespace;
use crate::error::{Error, Result};

/// Prefix to namespace-URI bindings for query evaluation
#[derive(Debug, Clone, Default)]
pub struct NamespaceBindings {
    prefixes: HashMap<String, String>,
}

impl NamespaceBindings {
    /// Create an empty set of bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Build bindings from the schema's `<ns>` declarations
    pub fn from_declarations(namespaces: &[Namespace]) -> Self {
        let mut bindings = Self::new();
        for ns in namespaces {
            bindings.add(&ns.prefix, &ns.uri);
        }
        bindings
    }

    /// Add a prefix binding
    pub fn add(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), uri.into());
    }

    /// Add a prefix binding, builder-style
    pub fn with_binding(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.add(prefix, uri);
        self
    }

    /// Get the URI bound to a prefix
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Resolve a possibly prefixed name into (namespace URI, local name).
    ///
    /// Unprefixed names resolve to no namespace; an unknown prefix is an
    /// error since the expression cannot mean anything without it.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Result<(Option<&'a str>, &'a str)> {
        if let Some((prefix, local)) = name.split_once(':') {
            let uri = self
                .uri(prefix)
                .ok_or_else(|| Error::Other(format!("unknown namespace prefix: {}", prefix)))?;
            Ok((Some(uri), local))
        } else {
            Ok((None, name))
        }
    }
}
