use healer::{
    gate::{ConfidenceCombination, PolicyConfig},
    planner::assemble,
    types::{Category, RiskLevel, Severity},
};

use super::{conf, diagnosis, draft, hypothesis, incident};

#[test]
fn given_any_inputs_when_assembled_then_plan_confidence_never_exceeds_best_triggering_hypothesis() {
    let grid = [0.0, 0.3, 0.55, 0.8, 1.0];
    for rule in [ConfidenceCombination::Minimum, ConfidenceCombination::Product] {
        let policy = PolicyConfig {
            plan_confidence_rule: rule,
            ..PolicyConfig::default()
        };
        for classification in grid {
            for hypothesis_confidence in grid {
                for feasibility in grid {
                    let plan = assemble(
                        &incident(Category::Cpu, Severity::Medium),
                        &diagnosis(vec![hypothesis("runaway job", hypothesis_confidence, &[])]),
                        conf(classification),
                        draft("scale_resources", &[], feasibility),
                        &policy,
                    );
                    assert!(
                        plan.confidence.value() <= hypothesis_confidence,
                        "{rule:?}: classification {classification}, hypothesis \
                         {hypothesis_confidence}, feasibility {feasibility} gave {}",
                        plan.confidence.value()
                    );
                    assert!(plan.confidence.value() <= feasibility);
                }
            }
        }
    }
}

#[test]
fn given_minimum_rule_when_assembled_then_weakest_input_wins() {
    let plan = assemble(
        &incident(Category::Cpu, Severity::Medium),
        &diagnosis(vec![hypothesis("runaway job", 0.8, &[])]),
        conf(0.9),
        draft("scale_resources", &[], 0.95),
        &PolicyConfig::default(),
    );
    assert_eq!(plan.confidence.value(), 0.8);
    assert_eq!(plan.feasibility.value(), 0.95);
}

#[test]
fn given_product_rule_when_assembled_then_feasibility_scales_upstream_confidence() {
    let policy = PolicyConfig {
        plan_confidence_rule: ConfidenceCombination::Product,
        ..PolicyConfig::default()
    };
    let plan = assemble(
        &incident(Category::Cpu, Severity::Medium),
        &diagnosis(vec![hypothesis("runaway job", 0.8, &[])]),
        conf(0.9),
        draft("scale_resources", &[], 0.5),
        &policy,
    );
    assert!((plan.confidence.value() - 0.4).abs() < 1e-9);
}

#[test]
fn given_candidates_from_every_source_when_assembled_then_fallbacks_are_ordered_and_unique() {
    let plan = assemble(
        &incident(Category::Cpu, Severity::Medium),
        &diagnosis(vec![hypothesis(
            "runaway job",
            0.85,
            &["Scale-Resources", "monitor"],
        )]),
        conf(0.9),
        draft("restart_service", &["monitor", "restart_service"], 0.9),
        &PolicyConfig::default(),
    );

    assert_eq!(plan.primary.name, "restart_service");
    assert_eq!(
        plan.action_names(),
        vec!["restart_service", "monitor", "scale_resources", "kill_runaway_process"]
    );
    assert!(!plan.risk_escalated);
    assert_eq!(plan.risk, RiskLevel::Low);
}

#[test]
fn given_no_fallback_available_when_assembled_then_risk_is_raised_and_oncall_is_appended() {
    let plan = assemble(
        &incident(Category::Other, Severity::Low),
        &diagnosis(vec![hypothesis("unclear degradation", 0.75, &[])]),
        conf(0.8),
        draft("monitor", &[], 0.9),
        &PolicyConfig::default(),
    );

    assert!(plan.risk_escalated);
    assert_eq!(plan.risk, RiskLevel::Medium);
    assert_eq!(plan.primary.risk, RiskLevel::Medium);
    assert_eq!(plan.action_names(), vec!["monitor", "notify_oncall"]);
}

#[test]
fn given_only_critical_fallbacks_when_assembled_then_they_do_not_count_as_safe() {
    let plan = assemble(
        &incident(Category::Other, Severity::High),
        &diagnosis(vec![hypothesis("regional outage", 0.9, &[])]),
        conf(0.9),
        draft("monitor", &["failover_region"], 0.9),
        &PolicyConfig::default(),
    );

    assert!(plan.risk_escalated);
    assert_eq!(plan.action_names(), vec!["monitor", "failover_region", "notify_oncall"]);
}

#[test]
fn given_competing_hypotheses_when_assembled_then_all_are_recorded_as_triggering() {
    let mut first = hypothesis("bad deploy", 0.8, &["rollback_deployment"]);
    first.competing = true;
    let mut second = hypothesis("noisy neighbour", 0.75, &["kill_runaway_process"]);
    second.competing = true;

    let plan = assemble(
        &incident(Category::Cpu, Severity::Medium),
        &diagnosis(vec![first, second]),
        conf(0.9),
        draft("scale_resources", &[], 0.9),
        &PolicyConfig::default(),
    );

    assert_eq!(plan.triggering_hypotheses, vec!["bad deploy", "noisy neighbour"]);
    assert_eq!(plan.confidence.value(), 0.8);
    assert_eq!(plan.fallbacks[0].name, "rollback_deployment");
    assert_eq!(plan.fallbacks[1].name, "kill_runaway_process");
}
