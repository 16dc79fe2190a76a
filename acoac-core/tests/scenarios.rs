//! End-to-end scenarios against the driver, exercising pre-check,
//! slicing, and abstraction-refinement together. Most scenarios below
//! are resolved before any checker invocation is needed; the ones that
//! do need a verdict from an actual rule firing run the driver against
//! a fixture script standing in for a real bounded model checker.

use std::path::PathBuf;

use acoac_core::abstraction::AbsRef;
use acoac_core::driver::{Driver, DriverConfig};
use acoac_core::error::{AcoacError, InputError};
use acoac_core::format::parse_aabac;
use acoac_core::model::{AdministrativeAction, AnalysisResult};

fn driver() -> Driver {
    Driver::new(DriverConfig::default())
}

fn fake_checker(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn query_already_true_in_the_initial_state_is_reachable_with_an_empty_trail() {
    let instance = parse_aabac(
        "\
attr role : employee ;
users 1 ;
admins 0 ;
init 0.role = employee ;
query 0.role = employee ;
",
    )
    .unwrap();

    let result = driver().run(&instance).unwrap();
    assert_eq!(result, AnalysisResult::Reachable { actions: vec![], rules: vec![] });
}

#[test]
fn query_value_no_rule_can_ever_produce_is_unreachable() {
    let instance = parse_aabac(
        "\
attr role : employee, manager ;
users 2 ;
admins 0 ;
init 1.role = employee ;
query 1.role = manager ;
",
    )
    .unwrap();

    let result = driver().run(&instance).unwrap();
    assert_eq!(result, AnalysisResult::Unreachable);
}

#[test]
fn slicing_drops_an_unreachable_chain_without_reaching_abstraction() {
    let instance = parse_aabac(
        "\
attr role : employee, manager, admin ;
users 2 ;
admins 0 ;
init 1.role = employee ;
rule admin: role=admin target: role=employee -> role = manager ;
query 1.role = manager ;
",
    )
    .unwrap();

    // Administrator 0 never holds `admin`, so the only rule that could
    // promote user 1 can never fire; the pre-check cannot see this (it
    // only checks whether *some* rule produces the value), but slicing's
    // reachable-values fixpoint can.
    let result = driver().run(&instance).unwrap();
    assert_eq!(result, AnalysisResult::Unreachable);
}

#[test]
fn irrelevant_bystander_users_do_not_change_the_verdict() {
    let with_bystanders = parse_aabac(
        "\
attr role : employee ;
users 5 ;
admins 0 ;
init 1.role = employee ;
query 1.role = employee ;
",
    )
    .unwrap();

    let result = driver().run(&with_bystanders).unwrap();
    assert_eq!(result, AnalysisResult::Reachable { actions: vec![], rules: vec![] });
}

#[test]
fn retraction_rule_round_trips_through_the_native_format() {
    let source = "\
attr role : employee, manager ;
users 2 ;
admins 0 ;
init 1.role = manager ;
rule admin: target: role=manager -> !role ;
query 1.role = manager ;
";
    let instance = parse_aabac(source).unwrap();
    assert_eq!(instance.rules.len(), 1);
    assert!(instance.rules[0].is_negative);

    // Query already holds in the initial state.
    let result = driver().run(&instance).unwrap();
    assert_eq!(result, AnalysisResult::Reachable { actions: vec![], rules: vec![] });
}

#[test]
fn administrative_action_carries_enough_to_replay_a_trace() {
    let action = AdministrativeAction { admin: 0, target: 1, attr: 2, value: 3 };
    assert_eq!(action.admin, 0);
    assert_eq!(action.target, 1);
}

#[test]
fn query_value_outside_the_attributes_domain_is_a_parse_error() {
    let source = "\
attr role : employee, manager ;
users 1 ;
admins 0 ;
init 0.role = employee ;
query 0.role = director ;
";
    let err = parse_aabac(source).unwrap_err();
    assert!(matches!(err, AcoacError::Input(InputError::QueryValueNotInDomain)));
}

#[test]
fn one_admin_fires_one_rule_to_reach_the_query() {
    let source = "\
attr role : employee ;
users 2 ;
admins 0 ;
init 0.role = employee ;
rule admin: role=employee target: -> role = employee ;
query 1.role = employee ;
";
    let instance = parse_aabac(source).unwrap();

    let config = DriverConfig { checker_binary: fake_checker("fake_checker_reachable.sh"), ..DriverConfig::default() };
    let result = Driver::new(config).run(&instance).unwrap();

    match result {
        AnalysisResult::Reachable { actions, .. } => {
            assert_eq!(actions.len(), 1);
            assert_eq!(actions[0].admin, 0);
            assert_eq!(actions[0].target, 1);
        }
        other => panic!("expected Reachable, got {other:?}"),
    }
}

#[test]
fn irrelevant_rules_touching_unqueried_attributes_are_sliced_away() {
    let mut source = String::from(
        "\
attr role : employee ;
attr noise : n0, n1 ;
users 2 ;
admins 0 ;
init 0.role = employee ;
rule admin: role=employee target: -> role = employee ;
",
    );
    for i in 0..100 {
        let value = if i % 2 == 0 { "n0" } else { "n1" };
        source.push_str(&format!("rule admin: target: -> noise = {value} ;\n"));
    }
    source.push_str("query 1.role = employee ;\n");

    let instance = parse_aabac(&source).unwrap();
    assert_eq!(instance.rules.len(), 101);

    let config =
        DriverConfig { checker_binary: fake_checker("fake_checker_reachable.sh"), ..DriverConfig::default() };
    let sliced_result = Driver::new(config.clone()).run(&instance).unwrap();
    assert!(matches!(sliced_result, AnalysisResult::Reachable { .. }));

    let unsliced_config = DriverConfig { enable_slicing: false, ..config };
    let unsliced_result = Driver::new(unsliced_config).run(&instance).unwrap();
    assert!(matches!(unsliced_result, AnalysisResult::Reachable { .. }));

    let (sliced, verdict) = acoac_core::slicer::slice(&instance);
    assert!(verdict.is_none());
    assert_eq!(sliced.rules.len(), 1);
}

#[test]
fn abstraction_refinement_converges_once_forward_and_backward_rule_sets_agree() {
    let mut symbols = acoac_core::symbols::Symbols::new();
    let r = symbols.intern_attr("r");
    let a = symbols.intern_value(r, "A");
    let b = symbols.intern_value(r, "B");
    let c = symbols.intern_value(r, "C");
    let init = acoac_core::model::State::new(1, symbols.attr_count());
    let rule_a = acoac_core::model::Rule {
        admin_precond: vec![],
        target_precond: vec![],
        target_attr: r,
        target_value: a,
        is_negative: false,
    };
    let rule_b = acoac_core::model::Rule {
        admin_precond: vec![],
        target_precond: vec![acoac_core::model::PrecondAtom { attr: r, value: a, positive: true }],
        target_attr: r,
        target_value: b,
        is_negative: false,
    };
    let rule_c = acoac_core::model::Rule {
        admin_precond: vec![],
        target_precond: vec![acoac_core::model::PrecondAtom { attr: r, value: b, positive: true }],
        target_attr: r,
        target_value: c,
        is_negative: false,
    };
    let mut admins = std::collections::BTreeSet::new();
    admins.insert(0);
    let instance = acoac_core::model::Instance::root(
        symbols,
        1,
        admins,
        init,
        vec![rule_a, rule_b, rule_c],
        vec![acoac_core::model::QueryAtom { user: 0, attr: r, value: c }],
    );

    let mut absref = AbsRef::new(instance.clone());
    absref.abstract_instance();
    assert!(absref.live_rule_count() < instance.rules.len());

    let mut round_reaching_full_set = None;
    while let Some(candidate) = absref.refine() {
        if candidate.rules.len() == instance.rules.len() {
            round_reaching_full_set = Some(absref.round());
            break;
        }
    }
    assert_eq!(round_reaching_full_set, Some(3));
}
