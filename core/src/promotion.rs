//! Promotion evaluation: does an agent meet a rank's condition set?
//!
//! Each condition looks back over a trailing window of `timeframe_days`
//! ending today. A week is in the window when any of its seven days is,
//! so the current week always counts, even for windows shorter than a week.
//!   - Action KPI and requirement conditions sum recorded counts and compare
//!     against the target for the agent's property type.
//!   - Skillset KPI conditions take the lowest score recorded in the window
//!     and compare it against `minimum_skillset_score`.
//!
//! `eligible` is the AND of all conditions; an empty set is eligible.
//! "Not eligible" is a normal result. Only malformed input is an error.
//! For ranks with `manual_promotion` the result is informational only.

use crate::{
    error::{EngineError, EngineResult},
    model::{Agent, ConditionSubject, Kpi, KpiType, PromotionCondition, Rank, Week},
    types::{AgentId, ConditionId, RankId},
};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DAYS_PER_WEEK: u64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionMeasure {
    Count { achieved: u32, target: u32 },
    /// `lowest_score` is None when no score was recorded in the window.
    Skillset { lowest_score: Option<f64>, required: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionResult {
    pub condition_id: ConditionId,
    pub subject:      ConditionSubject,
    pub measure:      ConditionMeasure,
    pub satisfied:    bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenureCheck {
    pub required_months: u32,
    pub served_months:   u32,
    pub met:             bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EligibilityResult {
    pub agent_id:         AgentId,
    pub rank_id:          RankId,
    pub eligible:         bool,
    /// Copied from the rank; callers must not auto-promote when set.
    pub manual_promotion: bool,
    /// Time in program against `rank.time_requirement_months`. Reported
    /// alongside the conditions; it does not feed `eligible`.
    pub tenure:           TenureCheck,
    pub per_condition:    Vec<ConditionResult>,
}

/// Lowest-level rank above the agent's current one.
/// An agent without a rank is a candidate for the lowest rank.
pub fn next_rank<'a>(ranks: &'a [Rank], current: Option<&str>) -> EngineResult<Option<&'a Rank>> {
    let floor = match current {
        None => None,
        Some(id) => {
            let rank = ranks
                .iter()
                .find(|r| r.rank_id == id)
                .ok_or_else(|| EngineError::NotFound { kind: "rank", id: id.to_string() })?;
            Some(rank.rank_level)
        }
    };
    Ok(ranks
        .iter()
        .filter(|r| floor.is_none_or(|level| r.rank_level > level))
        .min_by_key(|r| r.rank_level))
}

/// Whole calendar months from `start` to `today`.
pub fn months_served(start: NaiveDate, today: NaiveDate) -> u32 {
    if today <= start {
        return 0;
    }
    let mut months = (today.year() - start.year()) * 12 + today.month() as i32 - start.month() as i32;
    if today.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

pub struct PromotionEvaluator;

impl PromotionEvaluator {
    pub fn evaluate(
        agent: &Agent,
        rank: &Rank,
        conditions: &[PromotionCondition],
        kpis: &[Kpi],
        history: &[Week],
        today: NaiveDate,
    ) -> EngineResult<EligibilityResult> {
        let kpi_types: HashMap<&str, KpiType> =
            kpis.iter().map(|k| (k.kpi_id.as_str(), k.kpi_type)).collect();

        let mut per_condition = Vec::with_capacity(conditions.len());
        for condition in conditions {
            if condition.rank_id != rank.rank_id {
                return Err(EngineError::validation(format!(
                    "condition '{}' belongs to rank '{}', not '{}'",
                    condition.condition_id, condition.rank_id, rank.rank_id
                )));
            }
            let window = in_window(agent, history, today, condition.timeframe_days);
            per_condition.push(Self::evaluate_condition(agent, condition, &kpi_types, &window)?);
        }

        let eligible = per_condition.iter().all(|c| c.satisfied);
        let served = agent
            .starting_date
            .map(|start| months_served(start, today))
            .unwrap_or(0);
        let tenure = TenureCheck {
            required_months: rank.time_requirement_months,
            served_months:   served,
            met:             agent.starting_date.is_some() && served >= rank.time_requirement_months,
        };

        log::debug!(
            "agent={} rank={} eligible={eligible} ({} condition(s))",
            agent.agent_id,
            rank.rank_id,
            per_condition.len()
        );

        Ok(EligibilityResult {
            agent_id: agent.agent_id.clone(),
            rank_id: rank.rank_id.clone(),
            eligible,
            manual_promotion: rank.manual_promotion,
            tenure,
            per_condition,
        })
    }

    fn evaluate_condition(
        agent: &Agent,
        condition: &PromotionCondition,
        kpi_types: &HashMap<&str, KpiType>,
        window: &[&Week],
    ) -> EngineResult<ConditionResult> {
        let target = condition.target.for_property(agent.property_type);
        let measure = match &condition.subject {
            ConditionSubject::Kpi(kpi_id) => {
                let kpi_type = kpi_types.get(kpi_id.as_str()).copied().ok_or_else(|| {
                    EngineError::validation(format!(
                        "condition '{}' references unknown KPI '{kpi_id}'",
                        condition.condition_id
                    ))
                })?;
                match kpi_type {
                    KpiType::Action => ConditionMeasure::Count {
                        achieved: window
                            .iter()
                            .flat_map(|w| &w.entries.kpi_actions)
                            .filter(|e| &e.kpi_id == kpi_id)
                            .map(|e| e.actual)
                            .sum(),
                        target,
                    },
                    KpiType::Skillset => {
                        let required = condition.minimum_skillset_score.ok_or_else(|| {
                            EngineError::validation(format!(
                                "skillset condition '{}' has no minimum_skillset_score",
                                condition.condition_id
                            ))
                        })?;
                        let lowest_score = window
                            .iter()
                            .flat_map(|w| &w.entries.kpi_skillsets)
                            .filter(|e| &e.kpi_id == kpi_id)
                            .map(|e| e.score)
                            .reduce(f64::min);
                        ConditionMeasure::Skillset { lowest_score, required }
                    }
                }
            }
            ConditionSubject::Requirement(requirement_id) => ConditionMeasure::Count {
                achieved: window
                    .iter()
                    .flat_map(|w| &w.entries.requirements)
                    .filter(|e| &e.requirement_id == requirement_id)
                    .map(|e| e.actual)
                    .sum(),
                target,
            },
        };

        let satisfied = match measure {
            ConditionMeasure::Count { achieved, target } => achieved >= target,
            ConditionMeasure::Skillset { lowest_score, required } => {
                lowest_score.is_some_and(|s| s >= required)
            }
        };

        Ok(ConditionResult {
            condition_id: condition.condition_id.clone(),
            subject: condition.subject.clone(),
            measure,
            satisfied,
        })
    }
}

/// Weeks whose span `[start, start + 6]` overlaps
/// `[today - timeframe_days + 1, today]`.
/// Agents without a starting date have no dated weeks.
fn in_window<'a>(agent: &Agent, history: &'a [Week], today: NaiveDate, timeframe_days: u32)
    -> Vec<&'a Week>
{
    let Some(start) = agent.starting_date else {
        return Vec::new();
    };
    let from = today
        .checked_sub_days(Days::new(u64::from(timeframe_days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN);
    history
        .iter()
        .filter(|w| {
            let begins = w.start_date(start);
            let ends = begins + Days::new(DAYS_PER_WEEK - 1);
            begins <= today && ends >= from
        })
        .collect()
}
