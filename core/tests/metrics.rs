//! Summary metrics tests.
//!
//! Tests cover: pass / 100% / fail classification, pending weeks,
//! not-yet-started weeks, code-of-honor counting, and the engine read path.

use chrono::{Days, NaiveDate};
use cohort_core::{
    engine::CohortEngine,
    metrics::{MetricsAggregator, SummaryMetrics},
    model::{
        KpiActionEntry, KpiSkillsetEntry, NewAgent, PropertyType, RequirementEntry,
        ViolationEntry, Week, WeekEntries, WeekStatus,
    },
    store::RecordStore,
};

// ── Test helpers ────────────────────────────────────────────────────────────

fn action(target: u32, actual: u32) -> KpiActionEntry {
    KpiActionEntry { kpi_id: "kpi-calls".into(), target, actual, enabled: true }
}

fn skillset(target_score: f64, score: f64) -> KpiSkillsetEntry {
    KpiSkillsetEntry { kpi_id: "kpi-pitch".into(), target_score, score }
}

fn requirement(target: u32, actual: u32) -> RequirementEntry {
    RequirementEntry { requirement_id: "req-training".into(), target, actual, enabled: true }
}

fn violation(resolved: bool) -> ViolationEntry {
    ViolationEntry { rule_id: "coh-1".into(), remark: Some("late report".into()), resolved }
}

fn week(number: u32, entries: WeekEntries) -> Week {
    Week {
        week_id: format!("w-{number}"),
        agent_id: "agent-1".into(),
        week_number: number,
        entries,
    }
}

fn all_met() -> WeekEntries {
    WeekEntries {
        kpi_actions: vec![action(5, 5)],
        kpi_skillsets: vec![skillset(70.0, 80.0)],
        requirements: vec![requirement(1, 2)],
        violations: vec![],
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Every target met and no violations: 100% and also passed.
#[test]
fn perfect_week_counts_as_passed_and_full() {
    let weeks = vec![week(1, all_met())];

    let m = MetricsAggregator::summarize(&weeks, 1);

    assert_eq!(weeks[0].status(), WeekStatus::Perfect);
    assert_eq!(m.weeks_passed, 1);
    assert_eq!(m.target_100_percent_weeks, 1);
    assert_eq!(m.target_failed_weeks, 0);
}

/// A low skillset score drops the week from 100% but it still passes.
#[test]
fn low_skillset_score_passes_but_is_not_full() {
    let mut entries = all_met();
    entries.kpi_skillsets = vec![skillset(70.0, 65.0)];
    let weeks = vec![week(1, entries)];

    let m = MetricsAggregator::summarize(&weeks, 1);

    assert_eq!(weeks[0].status(), WeekStatus::Passed);
    assert_eq!(m.weeks_passed, 1);
    assert_eq!(m.target_100_percent_weeks, 0);
}

#[test]
fn missed_action_or_requirement_fails_the_week() {
    let mut short_action = all_met();
    short_action.kpi_actions = vec![action(5, 4)];
    let mut short_requirement = all_met();
    short_requirement.requirements = vec![requirement(2, 1)];
    let weeks = vec![week(1, short_action), week(2, short_requirement)];

    let m = MetricsAggregator::summarize(&weeks, 2);

    assert_eq!(m.weeks_passed, 0);
    assert_eq!(m.target_100_percent_weeks, 0);
    assert_eq!(m.target_failed_weeks, 2);
}

/// Disabled entries do not count against the week.
#[test]
fn disabled_entries_are_ignored() {
    let mut entries = all_met();
    entries.kpi_actions.push(KpiActionEntry {
        kpi_id: "kpi-flyers".into(),
        target: 50,
        actual: 0,
        enabled: false,
    });

    let m = MetricsAggregator::summarize(&[week(1, entries)], 1);

    assert_eq!(m.weeks_passed, 1);
}

/// Violations always count; only unresolved ones fail the week.
#[test]
fn violations_are_counted_regardless_of_status() {
    let mut unresolved = all_met();
    unresolved.violations = vec![violation(false), violation(true)];
    let mut resolved = all_met();
    resolved.violations = vec![violation(true)];
    let weeks = vec![week(1, unresolved), week(2, resolved)];

    let m = MetricsAggregator::summarize(&weeks, 2);

    assert_eq!(m.coh_warnings, 3);
    assert_eq!(m.target_failed_weeks, 1);
    assert_eq!(m.weeks_passed, 1);
}

/// Freshly generated weeks are pending: neither passed nor failed.
#[test]
fn empty_weeks_are_pending() {
    let weeks = vec![week(1, all_met()), week(2, WeekEntries::default())];

    let m = MetricsAggregator::summarize(&weeks, 2);

    assert_eq!(
        m,
        SummaryMetrics {
            weeks_passed: 1,
            target_100_percent_weeks: 1,
            target_failed_weeks: 0,
            coh_warnings: 0,
            pending_weeks: 1,
        }
    );
}

/// Weeks after the current elapsed week are left out of pass/fail.
#[test]
fn weeks_not_yet_started_are_excluded() {
    let mut failing = all_met();
    failing.kpi_actions = vec![action(5, 0)];
    failing.violations = vec![violation(false)];
    let weeks = vec![week(1, all_met()), week(2, all_met()), week(3, failing)];

    let m = MetricsAggregator::summarize(&weeks, 2);

    assert_eq!(m.weeks_passed, 2);
    assert_eq!(m.target_failed_weeks, 0);
    assert_eq!(m.coh_warnings, 1);
}

/// End to end through the store: generate weeks, record two, summarise.
#[test]
fn engine_summary_reads_recorded_weeks() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let engine = CohortEngine::build_test(today).expect("build test engine");
    let agent = engine
        .store()
        .create_agent(engine.context(), &NewAgent {
            name: "Kemi".into(),
            starting_date: today.checked_sub_days(Days::new(15)),
            rank_id: None,
            property_type: PropertyType::Condo,
        })
        .unwrap();
    engine.ensure_weeks(&agent.agent_id).unwrap();

    let mut failing = all_met();
    failing.requirements = vec![requirement(1, 0)];
    engine.record_week_entries(&agent.agent_id, 1, &all_met()).unwrap();
    engine.record_week_entries(&agent.agent_id, 2, &failing).unwrap();

    let m = engine.get_summary_metrics(&agent.agent_id).unwrap();

    assert_eq!(m.weeks_passed, 1);
    assert_eq!(m.target_100_percent_weeks, 1);
    assert_eq!(m.target_failed_weeks, 1);
    assert_eq!(m.pending_weeks, 1);
}

#[test]
fn out_of_range_skillset_score_is_rejected() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let engine = CohortEngine::build_test(today).unwrap();
    let agent = engine
        .store()
        .create_agent(engine.context(), &NewAgent {
            name: "Luca".into(),
            starting_date: Some(today),
            rank_id: None,
            property_type: PropertyType::House,
        })
        .unwrap();
    engine.ensure_weeks(&agent.agent_id).unwrap();

    let mut entries = all_met();
    entries.kpi_skillsets = vec![skillset(70.0, 120.0)];

    let result = engine.record_week_entries(&agent.agent_id, 1, &entries);
    assert!(result.is_err(), "score above 100 should be rejected");
}
