//! End-to-end validation tests: schema in, report out.

use pretty_assertions::assert_eq;

use schematron::ast::{
    AbstractRule, Check, CheckBody, CheckKind, ConcretePattern, ConcreteRule, Extends, Namespace,
    Pattern, Phase, Rule, Schema, Variable,
};
use schematron::namespaces::NamespaceBindings;
use schematron::query::SimplePathEvaluator;
use schematron::{Error, ErrorPolicy, PhaseSpec, SchematronValidator};

fn validator(schema: Schema) -> SchematronValidator<SimplePathEvaluator> {
    SchematronValidator::new(schema, SimplePathEvaluator::new())
}

fn parse(xml: &str) -> roxmltree::Document {
    roxmltree::Document::parse(xml).unwrap()
}

// =============================================================================
// Rule inheritance
// =============================================================================

#[test]
fn inherited_checks_run_after_own_checks() {
    // abstract rule "base" contributes an assert on @x; the concrete rule
    // adds its own report on @y and inherits the rest
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new()
            .with_rule(Rule::Abstract(
                AbstractRule::new("base").with_check(Check::assert("@x", "x required")),
            ))
            .with_rule(Rule::Concrete(
                ConcreteRule::new("item")
                    .with_check(Check::report("@y", "y present"))
                    .with_extends(Extends::by_id("base")),
            )),
    ));
    let validator = validator(schema);

    // no @y: the report stays silent; no @x: the inherited assert fires
    let report = validator.validate(&parse("<item/>")).unwrap();
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].kind, CheckKind::Assert);
    assert_eq!(report.fired[0].test, "@x");

    // both attributes present: the assert passes and only the report fires
    let report = validator
        .validate(&parse(r#"<item x="1" y="1"/>"#))
        .unwrap();
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].kind, CheckKind::Report);
}

#[test]
fn own_checks_fire_before_inherited_ones() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new()
            .with_rule(Rule::Abstract(
                AbstractRule::new("base").with_check(Check::assert("@inherited", "inherited")),
            ))
            .with_rule(Rule::Concrete(
                ConcreteRule::new("item")
                    .with_check(Check::assert("@own", "own"))
                    .with_extends(Extends::by_id("base")),
            )),
    ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    let contents: Vec<&str> = report.fired.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["own", "inherited"]);
}

// =============================================================================
// First-match-wins binding
// =============================================================================

#[test]
fn shadowed_rule_checks_never_evaluate() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new()
            .with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_check(Check::assert("@first", "first rule")),
            ))
            .with_rule(Rule::Concrete(
                // would fire unconditionally, but must never run
                ConcreteRule::new("item").with_check(Check::assert("false()", "second rule")),
            )),
    ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].content, "first rule");
}

#[test]
fn node_binds_independently_per_pattern() {
    let schema = Schema::new()
        .with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_id("P1").with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_check(Check::assert("@a", "from P1")),
            )),
        ))
        .with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_id("P2").with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_check(Check::assert("@b", "from P2")),
            )),
        ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    // the same node fires in both patterns, pattern order preserved
    let contents: Vec<&str> = report.fired.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["from P1", "from P2"]);
    assert_eq!(report.fired[0].pattern.as_deref(), Some("P1"));
    assert_eq!(report.fired[1].pattern.as_deref(), Some("P2"));
}

#[test]
fn results_follow_document_order_within_a_pattern() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("item").with_check(Check::assert("@code", "missing code")),
        )),
    ));

    let report = validator(schema)
        .validate(&parse("<order><item/><group><item/></group><item/></order>"))
        .unwrap();
    let locations: Vec<&str> = report.fired.iter().map(|r| r.location.as_str()).collect();
    assert_eq!(
        locations,
        vec![
            "/order[1]/item[1]",
            "/order[1]/group[1]/item[1]",
            "/order[1]/item[2]",
        ]
    );
}

// =============================================================================
// Phases
// =============================================================================

fn phased_schema() -> Schema {
    Schema::new()
        .with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_id("P1").with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_check(Check::assert("false()", "P1 fired")),
            )),
        ))
        .with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_id("P2").with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_check(Check::assert("false()", "P2 fired")),
            )),
        ))
        .with_phase(Phase::new("swapped").with_active("P2").with_active("P1"))
        .with_phase(Phase::new("only-two").with_active("P2"))
}

#[test]
fn phase_activation_order_overrides_declaration_order() {
    let report = validator(phased_schema())
        .with_phase(PhaseSpec::named("swapped"))
        .validate(&parse("<item/>"))
        .unwrap();

    assert_eq!(report.phase.as_deref(), Some("swapped"));
    assert_eq!(
        report.pattern_ids,
        vec![Some("P2".to_string()), Some("P1".to_string())]
    );
    let contents: Vec<&str> = report.fired.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["P2 fired", "P1 fired"]);
}

#[test]
fn phase_restricts_active_patterns() {
    let report = validator(phased_schema())
        .with_phase(PhaseSpec::named("only-two"))
        .validate(&parse("<item/>"))
        .unwrap();

    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].content, "P2 fired");
}

#[test]
fn all_sentinel_runs_everything_in_declaration_order() {
    let report = validator(phased_schema())
        .with_phase("#ALL")
        .validate(&parse("<item/>"))
        .unwrap();

    let contents: Vec<&str> = report.fired.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["P1 fired", "P2 fired"]);
}

#[test]
fn unknown_phase_is_an_error() {
    let result = validator(phased_schema())
        .with_phase(PhaseSpec::named("nope"))
        .validate(&parse("<item/>"));
    assert!(matches!(result, Err(Error::UnresolvedReference(_))));
}

#[test]
fn phase_variables_reach_rule_scope() {
    let schema = Schema::new()
        .with_pattern(Pattern::Concrete(
            ConcretePattern::new().with_id("P1").with_rule(Rule::Concrete(
                ConcreteRule::new("item")
                    .with_check(Check::assert("@code = $expected", "unexpected code")),
            )),
        ))
        .with_phase(
            Phase::new("strict")
                .with_active("P1")
                .with_variable(Variable::xml("expected", "A")),
        );
    let validator = validator(schema).with_phase(PhaseSpec::named("strict"));

    assert!(validator
        .validate(&parse(r#"<item code="A"/>"#))
        .unwrap()
        .is_valid());
    assert!(!validator
        .validate(&parse(r#"<item code="B"/>"#))
        .unwrap()
        .is_valid());
}

// =============================================================================
// Variable scoping
// =============================================================================

#[test]
fn rule_variable_shadows_pattern_variable() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(ConcretePattern {
        id: Some("P1".to_string()),
        title: None,
        variables: vec![Variable::xml("limit", "outer")],
        rules: vec![Rule::Concrete(
            ConcreteRule::new("item")
                .with_variable(Variable::xml("limit", "inner"))
                .with_check(Check::report("$limit = 'inner'", "rule scope wins")),
        )],
    }));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].content, "rule scope wins");
}

#[test]
fn declaring_rule_variable_wins_over_inherited() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new()
            .with_rule(Rule::Abstract(
                AbstractRule::new("base").with_variable(Variable::xml("mode", "inherited")),
            ))
            .with_rule(Rule::Concrete(
                ConcreteRule::new("item")
                    .with_variable(Variable::xml("mode", "own"))
                    .with_extends(Extends::by_id("base"))
                    .with_check(Check::report("$mode = 'own'", "own binding wins")),
            )),
    ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    assert_eq!(report.fired.len(), 1);
}

#[test]
fn xpath_variables_evaluate_against_bound_node() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("item")
                .with_variable(Variable::xpath("code", "@code"))
                .with_check(Check::report("$code = 'A'", "item A seen")),
        )),
    ));

    let report = validator(schema)
        .validate(&parse(r#"<order><item code="A"/><item code="B"/></order>"#))
        .unwrap();
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.fired[0].location, "/order[1]/item[1]");
}

// =============================================================================
// Enrichment: flags, subjects, diagnostics, language
// =============================================================================

#[test]
fn flags_accumulate_across_fired_checks() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new()
            .with_rule(Rule::Concrete(
                ConcreteRule::new("item").with_flag("structure").with_check(
                    Check::Assert(CheckBody::new("@code", "code required").with_flag("coding")),
                ),
            ))
            .with_rule(Rule::Concrete(
                ConcreteRule::new("note")
                    .with_flag("notes")
                    .with_check(Check::assert("@author", "author required")),
            )),
    ));

    let report = validator(schema)
        .validate(&parse("<order><item/><note/></order>"))
        .unwrap();
    // the check-level flag wins for the item; the rule flag covers the note
    assert!(report.has_flag("coding"));
    assert!(report.has_flag("notes"));
    assert!(!report.has_flag("structure"));
}

#[test]
fn language_and_whitespace_metadata_fall_back_to_the_rule() {
    use schematron::ast::WhitespaceHandling;

    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("item")
                .with_xml_lang("en")
                .with_xml_space(WhitespaceHandling::Preserve)
                .with_check(Check::assert("@code", "code required")),
        )),
    ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    assert_eq!(report.fired[0].xml_lang.as_deref(), Some("en"));
    assert_eq!(
        report.fired[0].xml_space,
        Some(WhitespaceHandling::Preserve)
    );
}

#[test]
fn check_subject_overrides_rule_subject() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("order")
                .with_subject("note")
                .with_check(Check::Assert(
                    CheckBody::new("@total", "missing total").with_subject("item"),
                ))
                .with_check(Check::assert("@id", "missing id")),
        )),
    ));

    let report = validator(schema)
        .validate(&parse("<order><item/><note/></order>"))
        .unwrap();
    assert_eq!(report.fired.len(), 2);
    // check-level subject points at the item, rule-level at the note
    assert_eq!(report.fired[0].location, "/order[1]/item[1]");
    assert_eq!(report.fired[1].location, "/order[1]/note[1]");
}

// =============================================================================
// Namespaces
// =============================================================================

#[test]
fn prefixed_contexts_match_namespaced_elements() {
    let schema = Schema::new()
        .with_namespace(Namespace::new("inv", "http://example.com/invoice"))
        .with_pattern(Pattern::Concrete(ConcretePattern::new().with_rule(
            Rule::Concrete(
                ConcreteRule::new("inv:item").with_check(Check::assert("@code", "code required")),
            ),
        )));
    let bindings = NamespaceBindings::from_declarations(&schema.namespaces);
    let validator =
        SchematronValidator::new(schema, SimplePathEvaluator::new().with_namespaces(bindings));

    let report = validator
        .validate(&parse(
            r#"<inv:order xmlns:inv="http://example.com/invoice"><inv:item/></inv:order>"#,
        ))
        .unwrap();
    assert_eq!(report.fired.len(), 1);
}

// =============================================================================
// Error policies and report completeness
// =============================================================================

#[test]
fn lenient_policy_degrades_gracefully() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("item")
                .with_check(Check::assert("unsupported-fn(@x)", "broken"))
                .with_check(Check::assert("@code", "code required")),
        )),
    ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    // the healthy check still ran, the broken one left a marker
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.is_complete());
    assert!(!report.is_valid());
}

#[test]
fn fail_fast_policy_aborts_on_first_expression_error() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("item").with_check(Check::assert("unsupported-fn(@x)", "broken")),
        )),
    ));

    let result = validator(schema)
        .with_error_policy(ErrorPolicy::FailFast)
        .validate(&parse("<item/>"));
    assert!(matches!(result, Err(Error::Expression(_))));
}

#[test]
fn clean_run_is_valid_and_complete() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_rule(Rule::Concrete(
            ConcreteRule::new("item").with_check(Check::assert("@code", "code required")),
        )),
    ));

    let report = validator(schema)
        .validate(&parse(r#"<item code="A"/>"#))
        .unwrap();
    assert!(report.is_valid());
    assert!(report.is_complete());
    assert_eq!(report.fired.len(), 0);
}

// =============================================================================
// Report serialization
// =============================================================================

#[test]
fn report_serializes_for_external_renderers() {
    let schema = Schema::new().with_pattern(Pattern::Concrete(
        ConcretePattern::new().with_id("P1").with_rule(Rule::Concrete(
            ConcreteRule::new("item").with_flag("incomplete").with_check(
                Check::Assert(CheckBody::new("@code", "code required").with_diagnostic("d1")),
            ),
        )),
    ));

    let report = validator(schema).validate(&parse("<item/>")).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["fired"][0]["kind"], "assert");
    assert_eq!(json["fired"][0]["location"], "/item[1]");
    assert_eq!(json["fired"][0]["diagnostics"][0], "d1");
    assert_eq!(json["active_flags"][0], "incomplete");
}
