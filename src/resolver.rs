//! Rule and pattern resolution
//!
//! This module turns the extension structure of a schema into flat,
//! directly executable material: every concrete or external rule becomes an
//! [`AssembledRule`] whose checks, variables and paragraphs include the
//! full inherited content of its `extends` chain, and every instance
//! pattern is expanded against its abstract template with `$param`
//! substitution applied.
//!
//! Resolution is a pure function over the AST. Extension chains are walked
//! depth-first with an explicit in-progress chain per resolution pass, so a
//! revisited rule identity is reported as a [`CyclicExtensionError`] naming
//! the cycle. Diamond-shaped chains are legal; the shared ancestor's
//! content is concatenated once per inheriting path.
//!
//! Ordering contract: the declaring rule's own checks, variables and
//! paragraphs come first, then each `extends` entry's recursively
//! assembled content, in extends declaration order. Firing order of
//! inherited checks therefore follows the declaring rule's own checks.

use indexmap::IndexMap;

use crate::ast::{
    AbstractRule, Check, Extends, ExtendsExternal, InstancePattern, Paragraph, Pattern, Rule,
    RuleBody, Schema, Variable, WhitespaceHandling, XPathExpr,
};
use crate::error::{
    CyclicExtensionError, DuplicateIdentifierError, Error, ReferenceKind, Result,
    UnresolvedReferenceError,
};

/// A rule with its extension chain fully materialized.
///
/// Derived from the AST, owned by the resolved schema; never aliases the
/// input. Only concrete and external rules produce assembled rules —
/// abstract rules exist solely as inheritance sources.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRule {
    /// The context expression of the declaring rule
    pub context: XPathExpr,
    /// Id of the declaring rule, if any
    pub id: Option<String>,
    /// Own checks first, then inherited checks in extends order
    pub checks: Vec<Check>,
    /// Own variables first, then inherited variables in extends order
    pub variables: Vec<Variable>,
    /// Own paragraphs first, then inherited paragraphs in extends order
    pub paragraphs: Vec<Paragraph>,
    /// Flag of the declaring rule
    pub flag: Option<String>,
    /// Formal public identifier of the declaring rule
    pub fpi: Option<String>,
    /// Icon reference of the declaring rule
    pub icon: Option<String>,
    /// Role of the declaring rule
    pub role: Option<String>,
    /// See URI of the declaring rule
    pub see: Option<String>,
    /// Subject expression of the declaring rule
    pub subject: Option<XPathExpr>,
    /// Default language of the declaring rule
    pub xml_lang: Option<String>,
    /// Whitespace handling of the declaring rule
    pub xml_space: Option<WhitespaceHandling>,
}

/// A pattern with all of its rules assembled
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPattern {
    /// The pattern id, if any
    pub id: Option<String>,
    /// The pattern title, if any
    pub title: Option<String>,
    /// Pattern-level variables
    pub variables: Vec<Variable>,
    /// The matchable rules, in declaration order
    pub rules: Vec<AssembledRule>,
}

/// The fully resolved view of a schema: concrete patterns with assembled
/// rules, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchema {
    patterns: Vec<ResolvedPattern>,
    ids: IndexMap<String, usize>,
}

impl ResolvedSchema {
    /// The resolved patterns, in declaration order
    pub fn patterns(&self) -> &[ResolvedPattern] {
        &self.patterns
    }

    /// Look up a resolved pattern by id
    pub fn pattern_by_id(&self, id: &str) -> Option<&ResolvedPattern> {
        self.ids.get(id).map(|&index| &self.patterns[index])
    }
}

/// Resolve a schema: assemble every extension chain, expand instance
/// patterns, and return the patterns ready for matching.
pub fn resolve(schema: &Schema) -> Result<ResolvedSchema> {
    check_unique_pattern_ids(schema)?;
    let abstract_rules = index_abstract_rules(schema)?;

    // templates first, so declaration order between an instance pattern and
    // its abstract pattern does not matter
    let mut templates: IndexMap<&str, ResolvedPattern> = IndexMap::new();
    for pattern in &schema.patterns {
        if let Pattern::Abstract(p) = pattern {
            templates.insert(
                p.id.as_str(),
                ResolvedPattern {
                    id: Some(p.id.clone()),
                    title: p.title.clone(),
                    variables: p.variables.clone(),
                    rules: assemble_rules(&p.rules, &abstract_rules)?,
                },
            );
        }
    }

    let mut patterns = Vec::new();
    let mut ids = IndexMap::new();
    for pattern in &schema.patterns {
        let resolved = match pattern {
            Pattern::Abstract(_) => continue,
            Pattern::Concrete(p) => ResolvedPattern {
                id: p.id.clone(),
                title: p.title.clone(),
                variables: p.variables.clone(),
                rules: assemble_rules(&p.rules, &abstract_rules)?,
            },
            Pattern::Instance(p) => expand_template(p, &templates)?,
        };
        if let Some(id) = resolved.id.clone() {
            ids.insert(id, patterns.len());
        }
        patterns.push(resolved);
    }

    Ok(ResolvedSchema { patterns, ids })
}

fn check_unique_pattern_ids(schema: &Schema) -> Result<()> {
    let mut seen = IndexMap::new();
    for pattern in &schema.patterns {
        if let Some(id) = pattern.id() {
            if seen.insert(id, ()).is_some() {
                return Err(DuplicateIdentifierError::new(ReferenceKind::Pattern, id).into());
            }
        }
    }
    Ok(())
}

/// Index the abstract rules of every pattern by id. Abstract rule ids are
/// extension targets and must be unique across the schema.
fn index_abstract_rules(schema: &Schema) -> Result<IndexMap<&str, &AbstractRule>> {
    let mut index = IndexMap::new();
    for pattern in &schema.patterns {
        let rules = match pattern {
            Pattern::Concrete(p) => &p.rules,
            Pattern::Abstract(p) => &p.rules,
            Pattern::Instance(_) => continue,
        };
        for rule in rules {
            if let Rule::Abstract(r) = rule {
                if index.insert(r.id.as_str(), r).is_some() {
                    return Err(
                        DuplicateIdentifierError::new(ReferenceKind::AbstractRule, &r.id).into(),
                    );
                }
            }
        }
    }
    Ok(index)
}

fn assemble_rules(
    rules: &[Rule],
    abstract_rules: &IndexMap<&str, &AbstractRule>,
) -> Result<Vec<AssembledRule>> {
    let mut assembled = Vec::new();
    for rule in rules {
        let (context, id, body) = match rule {
            // abstract rules are inheritance sources, never matchable
            Rule::Abstract(_) => continue,
            Rule::Concrete(r) => (r.context.clone(), r.id.clone(), &r.body),
            Rule::External(r) => match &r.context {
                Some(context) => (context.clone(), r.id.clone(), &r.body),
                // a context-less external rule cannot match anything
                None => continue,
            },
        };

        let mut chain = Vec::new();
        let parts = assemble_body(body, abstract_rules, &mut chain).map_err(|err| match err {
            Error::UnresolvedReference(inner) if inner.location.is_none() => {
                Error::UnresolvedReference(
                    inner.with_location(format!("rule with context \"{}\"", context)),
                )
            }
            other => other,
        })?;

        assembled.push(AssembledRule {
            context,
            id,
            checks: parts.checks,
            variables: parts.variables,
            paragraphs: parts.paragraphs,
            flag: body.flag.clone(),
            fpi: body.fpi.clone(),
            icon: body.icon.clone(),
            role: body.role.clone(),
            see: body.see.clone(),
            subject: body.subject.clone(),
            xml_lang: body.xml_lang.clone(),
            xml_space: body.xml_space,
        });
    }
    Ok(assembled)
}

#[derive(Default)]
struct AssembledParts {
    checks: Vec<Check>,
    variables: Vec<Variable>,
    paragraphs: Vec<Paragraph>,
}

impl AssembledParts {
    fn append(&mut self, other: AssembledParts) {
        self.checks.extend(other.checks);
        self.variables.extend(other.variables);
        self.paragraphs.extend(other.paragraphs);
    }
}

/// Concatenate a rule body's own content with the recursively assembled
/// content of each extends entry, own content first.
fn assemble_body(
    body: &RuleBody,
    abstract_rules: &IndexMap<&str, &AbstractRule>,
    chain: &mut Vec<String>,
) -> Result<AssembledParts> {
    let mut parts = AssembledParts {
        checks: body.checks.clone(),
        variables: body.variables.clone(),
        paragraphs: body.paragraphs.clone(),
    };

    for extends in &body.extends {
        let inherited = match extends {
            Extends::ById(e) => {
                let target = abstract_rules.get(e.id_pointer.as_str()).ok_or_else(|| {
                    UnresolvedReferenceError::new(ReferenceKind::AbstractRule, &e.id_pointer)
                })?;
                assemble_named(&e.id_pointer, &target.body, abstract_rules, chain)?
            }
            Extends::External(e) => {
                // resolution is identity, but the external rule may still
                // reach back into the schema and form a cycle
                let identity = external_identity(e);
                assemble_named(&identity, &e.rule.body, abstract_rules, chain)?
            }
        };
        parts.append(inherited);
    }

    Ok(parts)
}

fn assemble_named(
    identity: &str,
    body: &RuleBody,
    abstract_rules: &IndexMap<&str, &AbstractRule>,
    chain: &mut Vec<String>,
) -> Result<AssembledParts> {
    if let Some(position) = chain.iter().position(|entry| entry == identity) {
        let mut cycle: Vec<String> = chain[position..].to_vec();
        cycle.push(identity.to_string());
        return Err(CyclicExtensionError::new(cycle).into());
    }

    chain.push(identity.to_string());
    let parts = assemble_body(body, abstract_rules, chain)?;
    chain.pop();
    Ok(parts)
}

fn external_identity(extends: &ExtendsExternal) -> String {
    match &extends.rule.id {
        Some(id) => id.clone(),
        None => format!("external:{}", extends.file_path.display()),
    }
}

/// Expand an instance pattern against its assembled abstract template,
/// substituting `$param` occurrences in every expression and text.
fn expand_template(
    instance: &InstancePattern,
    templates: &IndexMap<&str, ResolvedPattern>,
) -> Result<ResolvedPattern> {
    let template = templates
        .get(instance.abstract_id_pointer.as_str())
        .ok_or_else(|| {
            UnresolvedReferenceError::new(
                ReferenceKind::AbstractPattern,
                &instance.abstract_id_pointer,
            )
        })?;

    // longest names first, so $row does not clobber $rowspan
    let mut substitutions: Vec<(String, &str)> = instance
        .params
        .iter()
        .map(|p| (format!("${}", p.name), p.value.as_str()))
        .collect();
    substitutions.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let expand = |text: &str| -> String {
        let mut out = text.to_string();
        for (name, value) in &substitutions {
            out = out.replace(name.as_str(), value);
        }
        out
    };
    let expand_xpath = |expr: &XPathExpr| XPathExpr::new(expand(expr.as_str()));
    let expand_variable = |variable: &Variable| match variable {
        Variable::XPath(v) => Variable::xpath(&v.name, expand(v.value.as_str())),
        Variable::Xml(v) => Variable::xml(&v.name, expand(&v.content)),
    };

    let rules = template
        .rules
        .iter()
        .map(|rule| AssembledRule {
            context: expand_xpath(&rule.context),
            id: rule.id.clone(),
            checks: rule
                .checks
                .iter()
                .map(|check| {
                    check.clone().map_body(|mut body| {
                        body.test = expand_xpath(&body.test);
                        body.content = expand(&body.content);
                        body.subject = body.subject.take().map(|s| expand_xpath(&s));
                        body
                    })
                })
                .collect(),
            variables: rule.variables.iter().map(expand_variable).collect(),
            paragraphs: rule
                .paragraphs
                .iter()
                .map(|p| Paragraph {
                    content: expand(&p.content),
                    ..p.clone()
                })
                .collect(),
            flag: rule.flag.clone(),
            fpi: rule.fpi.clone(),
            icon: rule.icon.clone(),
            role: rule.role.clone(),
            see: rule.see.clone(),
            subject: rule.subject.as_ref().map(&expand_xpath),
            xml_lang: rule.xml_lang.clone(),
            xml_space: rule.xml_space,
        })
        .collect();

    Ok(ResolvedPattern {
        id: instance.id.clone(),
        title: template.title.as_deref().map(expand),
        variables: template.variables.iter().map(expand_variable).collect(),
        rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AbstractPattern, ConcretePattern, ConcreteRule, ExternalRule};

    fn schema_with_rules(rules: Vec<Rule>) -> Schema {
        Schema::new().with_pattern(Pattern::Concrete(ConcretePattern {
            id: Some("p".to_string()),
            title: None,
            rules,
            variables: Vec::new(),
        }))
    }

    #[test]
    fn test_own_checks_precede_inherited() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(
                AbstractRule::new("base").with_check(Check::assert("@x", "x required")),
            ),
            Rule::Concrete(
                ConcreteRule::new("item")
                    .with_check(Check::report("@y", "y present"))
                    .with_extends(Extends::by_id("base")),
            ),
        ]);

        let resolved = resolve(&schema).unwrap();
        let rules = &resolved.patterns()[0].rules;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].checks.len(), 2);
        assert_eq!(rules[0].checks[0].body().test.as_str(), "@y");
        assert_eq!(rules[0].checks[1].body().test.as_str(), "@x");
    }

    #[test]
    fn test_transitive_assembly() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("a").with_check(Check::assert("@a", "a"))),
            Rule::Abstract(
                AbstractRule::new("b")
                    .with_check(Check::assert("@b", "b"))
                    .with_extends(Extends::by_id("a")),
            ),
            Rule::Concrete(
                ConcreteRule::new("item")
                    .with_check(Check::assert("@c", "c"))
                    .with_extends(Extends::by_id("b")),
            ),
        ]);

        let resolved = resolve(&schema).unwrap();
        let tests: Vec<&str> = resolved.patterns()[0].rules[0]
            .checks
            .iter()
            .map(|c| c.body().test.as_str())
            .collect();
        assert_eq!(tests, vec!["@c", "@b", "@a"]);
    }

    #[test]
    fn test_diamond_assembly_duplicates_shared_ancestor() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("shared").with_check(Check::assert("@s", "s"))),
            Rule::Abstract(
                AbstractRule::new("left").with_extends(Extends::by_id("shared")),
            ),
            Rule::Abstract(
                AbstractRule::new("right").with_extends(Extends::by_id("shared")),
            ),
            Rule::Concrete(
                ConcreteRule::new("item")
                    .with_extends(Extends::by_id("left"))
                    .with_extends(Extends::by_id("right")),
            ),
        ]);

        let resolved = resolve(&schema).unwrap();
        // the diamond is legal; each path contributes its own copy
        assert_eq!(resolved.patterns()[0].rules[0].checks.len(), 2);
    }

    #[test]
    fn test_direct_cycle() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("a").with_extends(Extends::by_id("a"))),
            Rule::Concrete(ConcreteRule::new("item").with_extends(Extends::by_id("a"))),
        ]);

        match resolve(&schema) {
            Err(Error::CyclicExtension(err)) => {
                assert_eq!(err.cycle, vec!["a", "a"]);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_mutual_cycle() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("a").with_extends(Extends::by_id("b"))),
            Rule::Abstract(AbstractRule::new("b").with_extends(Extends::by_id("a"))),
            Rule::Concrete(ConcreteRule::new("item").with_extends(Extends::by_id("a"))),
        ]);

        match resolve(&schema) {
            Err(Error::CyclicExtension(err)) => {
                assert_eq!(err.cycle.first(), err.cycle.last());
                assert!(err.cycle.len() >= 3);
            }
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_extends() {
        let schema = schema_with_rules(vec![Rule::Concrete(
            ConcreteRule::new("item").with_extends(Extends::by_id("missing")),
        )]);

        match resolve(&schema) {
            Err(Error::UnresolvedReference(err)) => {
                assert_eq!(err.reference, "missing");
                assert_eq!(err.kind, ReferenceKind::AbstractRule);
                assert!(err.location.as_deref().unwrap().contains("item"));
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_abstract_rule_id() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("base")),
            Rule::Abstract(AbstractRule::new("base")),
        ]);

        assert!(matches!(
            resolve(&schema),
            Err(Error::DuplicateIdentifier(_))
        ));
    }

    #[test]
    fn test_abstract_rules_not_emitted() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("base").with_check(Check::assert("@x", "x"))),
            Rule::Concrete(ConcreteRule::new("item")),
        ]);

        let resolved = resolve(&schema).unwrap();
        assert_eq!(resolved.patterns()[0].rules.len(), 1);
        assert_eq!(resolved.patterns()[0].rules[0].context.as_str(), "item");
    }

    #[test]
    fn test_external_rule_with_context_is_matchable() {
        let schema = schema_with_rules(vec![
            Rule::External(
                ExternalRule::new()
                    .with_context("item")
                    .with_check(Check::assert("@x", "x")),
            ),
            Rule::External(ExternalRule::new().with_check(Check::assert("@y", "y"))),
        ]);

        let resolved = resolve(&schema).unwrap();
        // only the context-bearing external rule is matchable
        assert_eq!(resolved.patterns()[0].rules.len(), 1);
    }

    #[test]
    fn test_extends_external_inlines_checks() {
        let external = ExternalRule::new()
            .with_id("ext")
            .with_check(Check::assert("@e", "e"));
        let schema = schema_with_rules(vec![Rule::Concrete(
            ConcreteRule::new("item")
                .with_check(Check::assert("@own", "own"))
                .with_extends(Extends::external(external, "lib/common.sch")),
        )]);

        let resolved = resolve(&schema).unwrap();
        let tests: Vec<&str> = resolved.patterns()[0].rules[0]
            .checks
            .iter()
            .map(|c| c.body().test.as_str())
            .collect();
        assert_eq!(tests, vec!["@own", "@e"]);
    }

    #[test]
    fn test_external_rule_cycle_back_into_schema() {
        let external = ExternalRule::new()
            .with_id("ext")
            .with_extends(Extends::by_id("local"));
        let schema = schema_with_rules(vec![
            Rule::Abstract(
                AbstractRule::new("local")
                    .with_extends(Extends::external(external, "lib/common.sch")),
            ),
            Rule::Concrete(ConcreteRule::new("item").with_extends(Extends::by_id("local"))),
        ]);

        assert!(matches!(resolve(&schema), Err(Error::CyclicExtension(_))));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let schema = schema_with_rules(vec![
            Rule::Abstract(AbstractRule::new("base").with_check(Check::assert("@x", "x"))),
            Rule::Concrete(
                ConcreteRule::new("item")
                    .with_check(Check::report("@y", "y"))
                    .with_extends(Extends::by_id("base")),
            ),
        ]);

        let first = resolve(&schema).unwrap();
        let second = resolve(&schema).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_instance_pattern_expansion() {
        let schema = Schema::new()
            .with_pattern(Pattern::Abstract(
                AbstractPattern::new("table-template").with_rule(Rule::Concrete(
                    ConcreteRule::new("$table/$row")
                        .with_check(Check::assert("$cell", "missing $cell in $row")),
                )),
            ))
            .with_pattern(Pattern::Instance(
                InstancePattern::new("table-template")
                    .with_id("html-table")
                    .with_param("table", "table")
                    .with_param("row", "tr")
                    .with_param("cell", "td"),
            ));

        let resolved = resolve(&schema).unwrap();
        assert_eq!(resolved.patterns().len(), 1);
        let pattern = &resolved.patterns()[0];
        assert_eq!(pattern.id.as_deref(), Some("html-table"));
        assert_eq!(pattern.rules[0].context.as_str(), "table/tr");
        assert_eq!(pattern.rules[0].checks[0].body().test.as_str(), "td");
        assert_eq!(
            pattern.rules[0].checks[0].body().content,
            "missing td in tr"
        );
    }

    #[test]
    fn test_instance_pattern_unknown_template() {
        let schema = Schema::new().with_pattern(Pattern::Instance(InstancePattern::new(
            "missing-template",
        )));

        match resolve(&schema) {
            Err(Error::UnresolvedReference(err)) => {
                assert_eq!(err.kind, ReferenceKind::AbstractPattern);
            }
            other => panic!("expected unresolved reference, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_pattern_ids() {
        let schema = Schema::new()
            .with_pattern(Pattern::Concrete(ConcretePattern::new().with_id("p1")))
            .with_pattern(Pattern::Concrete(ConcretePattern::new().with_id("p1")));

        assert!(matches!(
            resolve(&schema),
            Err(Error::DuplicateIdentifier(_))
        ));
    }

    #[test]
    fn test_pattern_lookup_by_id() {
        let schema = Schema::new()
            .with_pattern(Pattern::Concrete(ConcretePattern::new().with_id("p1")))
            .with_pattern(Pattern::Concrete(ConcretePattern::new().with_id("p2")));

        let resolved = resolve(&schema).unwrap();
        assert!(resolved.pattern_by_id("p2").is_some());
        assert!(resolved.pattern_by_id("p3").is_none());
    }
}
