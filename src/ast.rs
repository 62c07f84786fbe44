//! Schematron abstract syntax tree
//!
//! This module defines the immutable value objects a loaded Schematron schema
//! is made of: namespaces, phases, patterns, rules, checks, variables and
//! paragraphs. Rule, pattern, extends, check and variable variants are sum
//! types with exhaustive matching; algorithms switch on the variant kind
//! explicitly rather than going through a class hierarchy.
//!
//! The AST is produced by an external markup-parsing collaborator and is
//! read-only input for the rest of the crate. Structural well-formedness
//! (every concrete rule has a context, every abstract rule has an id) is
//! guaranteed by construction here: the fields are non-optional on the
//! variants that require them.

use std::path::PathBuf;

use serde::Serialize;

/// A query expression carried by the AST.
///
/// The engine treats the expression as opaque text; interpretation is the
/// job of the [`QueryEvaluator`](crate::query::QueryEvaluator) bound at
/// validation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XPathExpr(String);

impl XPathExpr {
    /// Create an expression from its source text
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    /// Get the expression source text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for XPathExpr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for XPathExpr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for XPathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whitespace handling declared via `xml:space`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceHandling {
    /// Normal whitespace processing
    Default,
    /// Whitespace must be preserved
    Preserve,
}

/// Representation of a `<schema>` element, the root of the AST
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Schema title, if declared
    pub title: Option<String>,
    /// The `defaultPhase` attribute
    pub default_phase: Option<String>,
    /// The `queryBinding` attribute (e.g. "xslt", "xpath2")
    pub query_binding: Option<String>,
    /// Declared `<ns>` prefix bindings
    pub namespaces: Vec<Namespace>,
    /// Top-level `<let>` declarations
    pub variables: Vec<Variable>,
    /// Declared `<phase>` elements
    pub phases: Vec<Phase>,
    /// Declared `<pattern>` elements, in document order
    pub patterns: Vec<Pattern>,
    /// Declared `<diagnostic>` elements, referenced by id from checks
    pub diagnostics: Vec<Diagnostic>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self {
            title: None,
            default_phase: None,
            query_binding: None,
            namespaces: Vec::new(),
            variables: Vec::new(),
            phases: Vec::new(),
            patterns: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the default phase id
    pub fn with_default_phase(mut self, phase: impl Into<String>) -> Self {
        self.default_phase = Some(phase.into());
        self
    }

    /// Set the query binding language name
    pub fn with_query_binding(mut self, binding: impl Into<String>) -> Self {
        self.query_binding = Some(binding.into());
        self
    }

    /// Add a namespace declaration
    pub fn with_namespace(mut self, ns: Namespace) -> Self {
        self.namespaces.push(ns);
        self
    }

    /// Add a top-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Add a phase
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Add a pattern
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    /// Add a diagnostic
    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// Find a phase by id
    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Representation of an `<ns>` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// The namespace prefix
    pub prefix: String,
    /// The namespace URI
    pub uri: String,
}

impl Namespace {
    /// Create a namespace binding
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

/// Representation of a `<phase>` element
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    /// The phase id
    pub id: String,
    /// Ids of the patterns this phase activates, in activation order
    pub active: Vec<String>,
    /// `<let>` declarations scoped to this phase
    pub variables: Vec<Variable>,
}

impl Phase {
    /// Create a phase with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Add an active pattern id
    pub fn with_active(mut self, pattern_id: impl Into<String>) -> Self {
        self.active.push(pattern_id.into());
        self
    }

    /// Add a phase-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

/// A `<pattern>` element in one of its three forms
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A directly usable pattern
    Concrete(ConcretePattern),
    /// A template pattern, only usable through instance patterns
    Abstract(AbstractPattern),
    /// A pattern instantiating an abstract pattern with parameters
    Instance(InstancePattern),
}

impl Pattern {
    /// Get the pattern id, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            Pattern::Concrete(p) => p.id.as_deref(),
            Pattern::Abstract(p) => Some(p.id.as_str()),
            Pattern::Instance(p) => p.id.as_deref(),
        }
    }
}

/// A concrete `<pattern>`: a named group of rules applied in document order.
///
/// Rule order matters: within one pattern a document node is bound to at most
/// one rule, the first whose context matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcretePattern {
    /// The pattern id, optional for concrete patterns
    pub id: Option<String>,
    /// Pattern title
    pub title: Option<String>,
    /// The rules of this pattern, in declaration order
    pub rules: Vec<Rule>,
    /// `<let>` declarations scoped to this pattern
    pub variables: Vec<Variable>,
}

impl ConcretePattern {
    /// Create an empty concrete pattern
    pub fn new() -> Self {
        Self {
            id: None,
            title: None,
            rules: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Set the pattern id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a pattern-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

impl Default for ConcretePattern {
    fn default() -> Self {
        Self::new()
    }
}

/// An abstract `<pattern>`: a template whose rules contain `$parameter`
/// placeholders, instantiated by [`InstancePattern`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractPattern {
    /// The pattern id, required for abstract patterns
    pub id: String,
    /// Pattern title
    pub title: Option<String>,
    /// The template rules
    pub rules: Vec<Rule>,
    /// `<let>` declarations scoped to this pattern
    pub variables: Vec<Variable>,
}

impl AbstractPattern {
    /// Create an abstract pattern with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            rules: Vec::new(),
            variables: Vec::new(),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a template rule
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a pattern-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

/// A `<pattern is-a="...">` element instantiating an abstract pattern
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePattern {
    /// The pattern id, optional
    pub id: Option<String>,
    /// Id of the abstract pattern being instantiated
    pub abstract_id_pointer: String,
    /// The `<param>` substitutions to apply
    pub params: Vec<PatternParam>,
}

impl InstancePattern {
    /// Create an instance pattern referring to an abstract pattern id
    pub fn new(abstract_id_pointer: impl Into<String>) -> Self {
        Self {
            id: None,
            abstract_id_pointer: abstract_id_pointer.into(),
            params: Vec::new(),
        }
    }

    /// Set the pattern id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a parameter substitution
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(PatternParam {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// A `<param>` element of an instance pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternParam {
    /// Parameter name, referenced as `$name` in the abstract pattern
    pub name: String,
    /// Replacement text
    pub value: String,
}

/// A `<rule>` element in one of its three forms
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// A rule with a context, directly matchable
    Concrete(ConcreteRule),
    /// A template rule, only reachable via `<extends>`
    Abstract(AbstractRule),
    /// A rule loaded from another file
    External(ExternalRule),
}

impl Rule {
    /// Get the rule id, if any
    pub fn id(&self) -> Option<&str> {
        match self {
            Rule::Concrete(r) => r.id.as_deref(),
            Rule::Abstract(r) => Some(r.id.as_str()),
            Rule::External(r) => r.id.as_deref(),
        }
    }

    /// Get the shared rule body
    pub fn body(&self) -> &RuleBody {
        match self {
            Rule::Concrete(r) => &r.body,
            Rule::Abstract(r) => &r.body,
            Rule::External(r) => &r.body,
        }
    }
}

/// The fields shared by all rule variants: checks, variable bindings,
/// paragraphs, extension references and the rich attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleBody {
    /// `<assert>` and `<report>` elements, in declaration order
    pub checks: Vec<Check>,
    /// `<let>` declarations scoped to this rule
    pub variables: Vec<Variable>,
    /// `<p>` elements
    pub paragraphs: Vec<Paragraph>,
    /// `<extends>` references, in declaration order
    pub extends: Vec<Extends>,
    /// Flag activated when a check of this rule fires
    pub flag: Option<String>,
    /// Formal public identifier
    pub fpi: Option<String>,
    /// Reference to a graphic for error rendering
    pub icon: Option<String>,
    /// Role description
    pub role: Option<String>,
    /// URI referencing background information
    pub see: Option<String>,
    /// Expression selecting the node error messages should point at
    pub subject: Option<XPathExpr>,
    /// Default natural language (`xml:lang`)
    pub xml_lang: Option<String>,
    /// Whitespace handling (`xml:space`)
    pub xml_space: Option<WhitespaceHandling>,
}

/// A concrete `<rule>`: context plus checks
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteRule {
    /// The context expression selecting the nodes this rule applies to
    pub context: XPathExpr,
    /// Optional rule id
    pub id: Option<String>,
    /// The rule body
    pub body: RuleBody,
}

impl ConcreteRule {
    /// Create a concrete rule with the given context
    pub fn new(context: impl Into<XPathExpr>) -> Self {
        Self {
            context: context.into(),
            id: None,
            body: RuleBody::default(),
        }
    }

    /// Set the rule id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a check
    pub fn with_check(mut self, check: Check) -> Self {
        self.body.checks.push(check);
        self
    }

    /// Add a rule-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.body.variables.push(variable);
        self
    }

    /// Add a paragraph
    pub fn with_paragraph(mut self, paragraph: Paragraph) -> Self {
        self.body.paragraphs.push(paragraph);
        self
    }

    /// Add an extends reference
    pub fn with_extends(mut self, extends: Extends) -> Self {
        self.body.extends.push(extends);
        self
    }

    /// Set the flag name
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.body.flag = Some(flag.into());
        self
    }

    /// Set the subject expression
    pub fn with_subject(mut self, subject: impl Into<XPathExpr>) -> Self {
        self.body.subject = Some(subject.into());
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.body.role = Some(role.into());
        self
    }

    /// Set the default language
    pub fn with_xml_lang(mut self, lang: impl Into<String>) -> Self {
        self.body.xml_lang = Some(lang.into());
        self
    }

    /// Set the whitespace handling
    pub fn with_xml_space(mut self, space: WhitespaceHandling) -> Self {
        self.body.xml_space = Some(space);
        self
    }
}

/// An abstract `<rule>`: a named bundle of checks and variables that other
/// rules inherit via `<extends>`. Never matched directly.
#[derive(Debug, Clone, PartialEq)]
pub struct AbstractRule {
    /// The rule id, required as it is the extension target
    pub id: String,
    /// The rule body
    pub body: RuleBody,
}

impl AbstractRule {
    /// Create an abstract rule with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: RuleBody::default(),
        }
    }

    /// Add a check
    pub fn with_check(mut self, check: Check) -> Self {
        self.body.checks.push(check);
        self
    }

    /// Add a rule-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.body.variables.push(variable);
        self
    }

    /// Add a paragraph
    pub fn with_paragraph(mut self, paragraph: Paragraph) -> Self {
        self.body.paragraphs.push(paragraph);
        self
    }

    /// Add an extends reference
    pub fn with_extends(mut self, extends: Extends) -> Self {
        self.body.extends.push(extends);
        self
    }

    /// Set the flag name
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.body.flag = Some(flag.into());
        self
    }
}

/// A `<rule>` loaded from another file via `<extends href="...">`.
///
/// An external rule with a context can appear in a pattern as a matchable
/// rule; with or without one it can serve as an inheritance source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRule {
    /// The context expression, present when the external rule is concrete
    pub context: Option<XPathExpr>,
    /// Optional rule id
    pub id: Option<String>,
    /// The rule body
    pub body: RuleBody,
}

impl ExternalRule {
    /// Create an external rule without a context
    pub fn new() -> Self {
        Self {
            context: None,
            id: None,
            body: RuleBody::default(),
        }
    }

    /// Set the context expression
    pub fn with_context(mut self, context: impl Into<XPathExpr>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Set the rule id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a check
    pub fn with_check(mut self, check: Check) -> Self {
        self.body.checks.push(check);
        self
    }

    /// Add a rule-level variable
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.body.variables.push(variable);
        self
    }

    /// Add an extends reference
    pub fn with_extends(mut self, extends: Extends) -> Self {
        self.body.extends.push(extends);
        self
    }
}

impl Default for ExternalRule {
    fn default() -> Self {
        Self::new()
    }
}

/// An `<extends>` reference from one rule to another
#[derive(Debug, Clone, PartialEq)]
pub enum Extends {
    /// Points at an abstract rule in the same schema by id
    ById(ExtendsById),
    /// Carries a rule already loaded from another file
    External(ExtendsExternal),
}

impl Extends {
    /// Convenience constructor for an id reference
    pub fn by_id(id_pointer: impl Into<String>) -> Self {
        Extends::ById(ExtendsById {
            id_pointer: id_pointer.into(),
        })
    }

    /// Convenience constructor for an external reference
    pub fn external(rule: ExternalRule, file_path: impl Into<PathBuf>) -> Self {
        Extends::External(ExtendsExternal {
            rule,
            file_path: file_path.into(),
        })
    }
}

/// An `<extends rule="...">` reference resolved by id lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendsById {
    /// Id of the abstract rule being extended
    pub id_pointer: String,
}

/// An `<extends href="...">` reference carrying the loaded rule.
///
/// Resolution is identity, not lookup: the referenced rule travels with the
/// reference, together with the path it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendsExternal {
    /// The loaded rule
    pub rule: ExternalRule,
    /// The path the rule was loaded from
    pub file_path: PathBuf,
}

/// Kind discriminator for checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// An `<assert>`: fires when its test is false
    Assert,
    /// A `<report>`: fires when its test is true
    Report,
}

/// An `<assert>` or `<report>` element
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// An assert check
    Assert(CheckBody),
    /// A report check
    Report(CheckBody),
}

impl Check {
    /// Create an assert check
    pub fn assert(test: impl Into<XPathExpr>, content: impl Into<String>) -> Self {
        Check::Assert(CheckBody::new(test, content))
    }

    /// Create a report check
    pub fn report(test: impl Into<XPathExpr>, content: impl Into<String>) -> Self {
        Check::Report(CheckBody::new(test, content))
    }

    /// Get the check kind
    pub fn kind(&self) -> CheckKind {
        match self {
            Check::Assert(_) => CheckKind::Assert,
            Check::Report(_) => CheckKind::Report,
        }
    }

    /// Get the shared check body
    pub fn body(&self) -> &CheckBody {
        match self {
            Check::Assert(b) | Check::Report(b) => b,
        }
    }

    /// Map the body through a function, preserving the kind
    pub fn map_body(self, f: impl FnOnce(CheckBody) -> CheckBody) -> Self {
        match self {
            Check::Assert(b) => Check::Assert(f(b)),
            Check::Report(b) => Check::Report(f(b)),
        }
    }
}

/// The fields shared by asserts and reports
#[derive(Debug, Clone, PartialEq)]
pub struct CheckBody {
    /// The test expression
    pub test: XPathExpr,
    /// Mixed text content; opaque to the engine
    pub content: String,
    /// Optional check id
    pub id: Option<String>,
    /// Ids of referenced `<diagnostic>` elements; opaque to the engine
    pub diagnostics: Vec<String>,
    /// Ids of referenced `<property>` elements; opaque to the engine
    pub properties: Vec<String>,
    /// Flag activated when this check fires
    pub flag: Option<String>,
    /// Formal public identifier
    pub fpi: Option<String>,
    /// Reference to a graphic for error rendering
    pub icon: Option<String>,
    /// Role description
    pub role: Option<String>,
    /// URI referencing background information
    pub see: Option<String>,
    /// Expression selecting the node the message should point at;
    /// overrides the rule-level subject
    pub subject: Option<XPathExpr>,
    /// Natural language (`xml:lang`)
    pub xml_lang: Option<String>,
    /// Whitespace handling (`xml:space`)
    pub xml_space: Option<WhitespaceHandling>,
}

impl CheckBody {
    /// Create a check body with the given test and content
    pub fn new(test: impl Into<XPathExpr>, content: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            content: content.into(),
            id: None,
            diagnostics: Vec::new(),
            properties: Vec::new(),
            flag: None,
            fpi: None,
            icon: None,
            role: None,
            see: None,
            subject: None,
            xml_lang: None,
            xml_space: None,
        }
    }

    /// Set the check id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a diagnostic reference
    pub fn with_diagnostic(mut self, id: impl Into<String>) -> Self {
        self.diagnostics.push(id.into());
        self
    }

    /// Add a property reference
    pub fn with_property(mut self, id: impl Into<String>) -> Self {
        self.properties.push(id.into());
        self
    }

    /// Set the flag name
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    /// Set the subject expression
    pub fn with_subject(mut self, subject: impl Into<XPathExpr>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the see URI
    pub fn with_see(mut self, see: impl Into<String>) -> Self {
        self.see = Some(see.into());
        self
    }

    /// Set the natural language
    pub fn with_xml_lang(mut self, lang: impl Into<String>) -> Self {
        self.xml_lang = Some(lang.into());
        self
    }

    /// Set the whitespace handling
    pub fn with_xml_space(mut self, space: WhitespaceHandling) -> Self {
        self.xml_space = Some(space);
        self
    }
}

/// A `<let>` declaration in one of its two forms
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// `<let name="..." value="..."/>` — the value is a query expression
    XPath(XPathVariable),
    /// `<let name="...">content</let>` — the value is literal XML content
    Xml(XmlVariable),
}

impl Variable {
    /// Create a query-valued variable
    pub fn xpath(name: impl Into<String>, value: impl Into<XPathExpr>) -> Self {
        Variable::XPath(XPathVariable {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Create a literal-content variable
    pub fn xml(name: impl Into<String>, content: impl Into<String>) -> Self {
        Variable::Xml(XmlVariable {
            name: name.into(),
            content: content.into(),
        })
    }

    /// Get the variable name
    pub fn name(&self) -> &str {
        match self {
            Variable::XPath(v) => &v.name,
            Variable::Xml(v) => &v.name,
        }
    }
}

/// A `<let>` with a `value` attribute holding a query expression
#[derive(Debug, Clone, PartialEq)]
pub struct XPathVariable {
    /// The variable name
    pub name: String,
    /// The query expression producing the value
    pub value: XPathExpr,
}

/// A `<let>` whose value is its literal element content
#[derive(Debug, Clone, PartialEq)]
pub struct XmlVariable {
    /// The variable name
    pub name: String,
    /// The content, copied verbatim with no evaluation
    pub content: String,
}

/// Representation of a `<p>` element
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// The rich content of the paragraph
    pub content: String,
    /// The `class` attribute
    pub class_attr: Option<String>,
    /// The `icon` attribute
    pub icon: Option<String>,
    /// Optional id
    pub id: Option<String>,
}

impl Paragraph {
    /// Create a paragraph with the given content
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            class_attr: None,
            icon: None,
            id: None,
        }
    }

    /// Set the class attribute
    pub fn with_class(mut self, class_attr: impl Into<String>) -> Self {
        self.class_attr = Some(class_attr.into());
        self
    }
}

/// Representation of a `<diagnostic>` element.
///
/// Checks reference diagnostics by id; the engine carries the references as
/// opaque ids and leaves resolution to the report renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The diagnostic id
    pub id: String,
    /// Mixed text content
    pub content: String,
    /// Natural language (`xml:lang`)
    pub xml_lang: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            xml_lang: None,
        }
    }
}
