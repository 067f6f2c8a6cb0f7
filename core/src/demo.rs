//! Demo cohort: a reproducible sample program for trying the engine.
//!
//! Creates a small ladder (three ranks with conditions), its reference data,
//! and `agent_count` agents whose start dates are spread over the last
//! ~100 days. Every finished week is filled with seeded activity; the
//! current week is left for a week-generation run to create.
//! Roughly one agent in eight has no start date.

use crate::{
    error::EngineResult,
    model::{
        Agent, KpiActionEntry, KpiSkillsetEntry, KpiType, NewAgent, NewRank, PropertyType,
        PromotionConditionDraft, RequirementEntry, ViolationEntry, WeekEntries,
    },
    rng::DemoRng,
    store::{RecordStore, StoreContext},
    types::{AgentId, KpiId, RankId, RequirementId, RuleId},
    week_generator::elapsed_weeks,
};
use chrono::{Days, NaiveDate};

const FIRST_NAMES: &[&str] = &[
    "Ana", "Ben", "Carla", "Dev", "Elif", "Femi", "Grace", "Hiro", "Ines", "Jonas",
    "Kemi", "Luca", "Maya", "Nils", "Omar", "Priya", "Quinn", "Rosa", "Sami", "Tara",
];
const LAST_NAMES: &[&str] = &[
    "Abe", "Baptiste", "Costa", "Dahl", "Eze", "Ferreira", "Gupta", "Haas", "Ito", "Jensen",
    "Kowalski", "Lindqvist", "Mendes", "Novak", "Okafor", "Park", "Quispe", "Rossi",
];

const MAX_START_OFFSET_DAYS: u32 = 100;
const NO_START_DATE_RATE: f64 = 0.125;
const VIOLATION_RATE: f64 = 0.08;

#[derive(Debug, Clone)]
pub struct DemoCohort {
    pub agent_ids:            Vec<AgentId>,
    pub rank_ids:             Vec<RankId>,
    pub door_knock_kpi:       KpiId,
    pub presentation_kpi:     KpiId,
    pub negotiation_kpi:      KpiId,
    pub training_requirement: RequirementId,
    pub confidentiality_rule: RuleId,
    pub weeks_recorded:       usize,
}

pub fn seed_demo_cohort<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &StoreContext,
    seed: u64,
    today: NaiveDate,
    agent_count: usize,
    program_length: u32,
) -> EngineResult<DemoCohort> {
    let mut rng = DemoRng::new(seed);

    let door_knocks   = store.create_kpi(ctx, "Door knocks", KpiType::Action)?;
    let presentations = store.create_kpi(ctx, "Listing presentations", KpiType::Action)?;
    let negotiation   = store.create_kpi(ctx, "Negotiation", KpiType::Skillset)?;
    let training      = store.create_requirement(ctx, "Training sessions")?;
    let rule          = store.create_rule(ctx, "Client confidentiality")?;

    let ladder = [
        ("Associate", 1, 0, false),
        ("Senior Associate", 2, 2, false),
        ("Team Lead", 3, 6, true),
    ];
    let mut rank_ids = Vec::with_capacity(ladder.len());
    for (name, level, months, manual) in ladder {
        let rank = store.create_rank(ctx, &NewRank {
            name: name.into(),
            rank_level: level,
            time_requirement_months: months,
            manual_promotion: manual,
        })?;
        rank_ids.push(rank.rank_id);
    }

    let conditions = [
        PromotionConditionDraft {
            rank_id: rank_ids[1].clone(),
            kpi_id: Some(door_knocks.kpi_id.clone()),
            is_property_specific: true,
            target_count_house: 20,
            target_count_condo: 15,
            timeframe_days: 28,
            ..Default::default()
        },
        PromotionConditionDraft {
            rank_id: rank_ids[1].clone(),
            requirement_id: Some(training.requirement_id.clone()),
            target_count_house: 2,
            target_count_condo: 2,
            timeframe_days: 28,
            ..Default::default()
        },
        PromotionConditionDraft {
            rank_id: rank_ids[1].clone(),
            kpi_id: Some(negotiation.kpi_id.clone()),
            minimum_skillset_score: Some(70.0),
            timeframe_days: 28,
            ..Default::default()
        },
        PromotionConditionDraft {
            rank_id: rank_ids[2].clone(),
            kpi_id: Some(presentations.kpi_id.clone()),
            target_count_house: 8,
            target_count_condo: 8,
            timeframe_days: 56,
            ..Default::default()
        },
    ];
    for draft in &conditions {
        store.create_promotion_condition(ctx, &draft.validate()?)?;
    }

    let refs = DemoRefs {
        door_knocks:   &door_knocks.kpi_id,
        presentations: &presentations.kpi_id,
        negotiation:   &negotiation.kpi_id,
        training:      &training.requirement_id,
        rule:          &rule.rule_id,
    };
    let mut agent_ids = Vec::with_capacity(agent_count);
    let mut weeks_recorded = 0;
    for _ in 0..agent_count {
        let name = format!("{} {}", rng.pick(FIRST_NAMES), rng.pick(LAST_NAMES));
        let starting_date = if rng.chance(NO_START_DATE_RATE) {
            None
        } else {
            today.checked_sub_days(Days::new(u64::from(rng.between(0, MAX_START_OFFSET_DAYS))))
        };
        let property_type = if rng.chance(0.3) { PropertyType::Condo } else { PropertyType::House };
        let agent = store.create_agent(ctx, &NewAgent {
            name,
            starting_date,
            rank_id: Some(rank_ids[0].clone()),
            property_type,
        })?;

        weeks_recorded +=
            record_finished_weeks(store, ctx, &mut rng, &agent, today, program_length, &refs)?;
        agent_ids.push(agent.agent_id);
    }

    log::info!("demo cohort seeded: {agent_count} agent(s), {weeks_recorded} week(s) recorded");

    Ok(DemoCohort {
        agent_ids,
        rank_ids,
        door_knock_kpi: door_knocks.kpi_id,
        presentation_kpi: presentations.kpi_id,
        negotiation_kpi: negotiation.kpi_id,
        training_requirement: training.requirement_id,
        confidentiality_rule: rule.rule_id,
        weeks_recorded,
    })
}

struct DemoRefs<'a> {
    door_knocks:   &'a str,
    presentations: &'a str,
    negotiation:   &'a str,
    training:      &'a str,
    rule:          &'a str,
}

/// Create and fill every week before the current one.
fn record_finished_weeks<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &StoreContext,
    rng: &mut DemoRng,
    agent: &Agent,
    today: NaiveDate,
    program_length: u32,
    refs: &DemoRefs<'_>,
) -> EngineResult<usize> {
    let Some(start) = agent.starting_date else {
        return Ok(0);
    };
    let finished = elapsed_weeks(start, today, program_length).saturating_sub(1);
    for week_number in 1..=finished {
        let week = store.create_week(ctx, &agent.agent_id, week_number)?;
        let entries = random_entries(rng, refs);
        store.update_week_entries(ctx, &week.week_id, &entries)?;
    }
    Ok(finished as usize)
}

fn random_entries(rng: &mut DemoRng, refs: &DemoRefs<'_>) -> WeekEntries {
    let mut violations = Vec::new();
    if rng.chance(VIOLATION_RATE) {
        violations.push(ViolationEntry {
            rule_id:  refs.rule.to_string(),
            remark:   Some("flagged by team lead".into()),
            resolved: rng.chance(0.5),
        });
    }
    WeekEntries {
        kpi_actions: vec![
            KpiActionEntry {
                kpi_id: refs.door_knocks.to_string(),
                target: 5,
                actual: rng.between(2, 8),
                enabled: true,
            },
            KpiActionEntry {
                kpi_id: refs.presentations.to_string(),
                target: 2,
                actual: rng.between(0, 3),
                enabled: true,
            },
        ],
        kpi_skillsets: vec![KpiSkillsetEntry {
            kpi_id: refs.negotiation.to_string(),
            target_score: 70.0,
            score: f64::from(rng.between(55, 95)),
        }],
        requirements: vec![RequirementEntry {
            requirement_id: refs.training.to_string(),
            target: 1,
            actual: rng.between(0, 1),
            enabled: true,
        }],
        violations,
    }
}
