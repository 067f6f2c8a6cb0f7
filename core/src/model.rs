//! Domain records: agents, reference data, promotion conditions and weeks.
//!
//! Reference data (KPIs, requirements, rules, ranks) is shared and never owned
//! by an agent. Weeks belong to exactly one agent. A week's status is never
//! stored; it is recomputed from the entries every time it is asked for.

use crate::{
    error::{EngineError, EngineResult},
    types::{AgentId, ConditionId, KpiId, RankId, RequirementId, RuleId, WeekId, WeekNumber},
};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const MAX_SKILLSET_SCORE: f64 = 100.0;

// ── Enumerations ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KpiType {
    /// Count-based: the agent records how many times the action was done.
    Action,
    /// Score-based, 0 to 100.
    Skillset,
}

impl KpiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Action   => "action",
            Self::Skillset => "skillset",
        }
    }
}

impl FromStr for KpiType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action"   => Ok(Self::Action),
            "skillset" => Ok(Self::Skillset),
            other      => Err(EngineError::validation(format!("unknown KPI type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    House,
    Condo,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Condo => "condo",
        }
    }
}

impl FromStr for PropertyType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "house" => Ok(Self::House),
            "condo" => Ok(Self::Condo),
            other   => Err(EngineError::validation(format!("unknown property type '{other}'"))),
        }
    }
}

// ── Agent and reference data ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub agent_id:      AgentId,
    pub name:          String,
    /// Program start. Agents without one cannot be scheduled.
    pub starting_date: Option<NaiveDate>,
    pub rank_id:       Option<RankId>,
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAgent {
    pub name:          String,
    pub starting_date: Option<NaiveDate>,
    pub rank_id:       Option<RankId>,
    #[serde(default)]
    pub property_type: PropertyType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpi {
    pub kpi_id:   KpiId,
    pub name:     String,
    pub kpi_type: KpiType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub requirement_id: RequirementId,
    pub name:           String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeOfHonorRule {
    pub rule_id: RuleId,
    pub name:    String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rank {
    pub rank_id:                 RankId,
    pub name:                    String,
    /// Position on the ladder; higher is more senior.
    pub rank_level:              u32,
    pub time_requirement_months: u32,
    /// When set, evaluation only reports eligibility and never promotes.
    pub manual_promotion:        bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewRank {
    pub name:                    String,
    pub rank_level:              u32,
    pub time_requirement_months: u32,
    pub manual_promotion:        bool,
}

// ── Promotion conditions ───────────────────────────────────────────

/// Which count a condition is measured against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionTarget {
    /// One count regardless of the agent's property type.
    Uniform { count: u32 },
    /// Separate counts for house and condo agents.
    PropertySplit { house: u32, condo: u32 },
}

impl ConditionTarget {
    pub fn for_property(&self, property: PropertyType) -> u32 {
        match (self, property) {
            (Self::Uniform { count }, _)                      => *count,
            (Self::PropertySplit { house, .. }, PropertyType::House) => *house,
            (Self::PropertySplit { condo, .. }, PropertyType::Condo) => *condo,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ConditionSubject {
    Kpi(KpiId),
    Requirement(RequirementId),
}

/// A validated condition not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPromotionCondition {
    pub rank_id:                RankId,
    pub subject:                ConditionSubject,
    pub target:                 ConditionTarget,
    pub minimum_skillset_score: Option<f64>,
    pub timeframe_days:         u32,
}

impl NewPromotionCondition {
    pub fn with_id(self, condition_id: ConditionId) -> PromotionCondition {
        PromotionCondition {
            condition_id,
            rank_id:                self.rank_id,
            subject:                self.subject,
            target:                 self.target,
            minimum_skillset_score: self.minimum_skillset_score,
            timeframe_days:         self.timeframe_days,
        }
    }

    /// Check the subject against the KPI catalogue: the KPI must exist,
    /// skillset KPIs need a minimum score, and only skillset KPIs may carry one.
    pub fn check_subject(&self, kpis: &[Kpi]) -> EngineResult<()> {
        let kpi_type = match &self.subject {
            ConditionSubject::Kpi(kpi_id) => kpis
                .iter()
                .find(|k| &k.kpi_id == kpi_id)
                .map(|k| k.kpi_type)
                .ok_or_else(|| EngineError::validation(format!("unknown KPI '{kpi_id}'")))?,
            ConditionSubject::Requirement(requirement_id) => {
                if self.minimum_skillset_score.is_some() {
                    return Err(EngineError::validation(format!(
                        "requirement '{requirement_id}' cannot take a minimum_skillset_score"
                    )));
                }
                return Ok(());
            }
        };
        match (kpi_type, self.minimum_skillset_score) {
            (KpiType::Skillset, None) => Err(EngineError::validation(
                "skillset KPI condition needs a minimum_skillset_score",
            )),
            (KpiType::Action, Some(_)) => Err(EngineError::validation(
                "action KPI condition cannot take a minimum_skillset_score",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionCondition {
    pub condition_id:           ConditionId,
    pub rank_id:                RankId,
    pub subject:                ConditionSubject,
    pub target:                 ConditionTarget,
    pub minimum_skillset_score: Option<f64>,
    pub timeframe_days:         u32,
}

/// Loosely-shaped condition input, as submitted by an administrator or an
/// import file. Call `validate()` to get the tagged form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PromotionConditionDraft {
    pub rank_id:                RankId,
    #[serde(default)]
    pub kpi_id:                 Option<KpiId>,
    #[serde(default)]
    pub requirement_id:         Option<RequirementId>,
    #[serde(default)]
    pub is_property_specific:   bool,
    #[serde(default)]
    pub target_count_house:     u32,
    #[serde(default)]
    pub target_count_condo:     u32,
    #[serde(default)]
    pub minimum_skillset_score: Option<f64>,
    pub timeframe_days:         u32,
}

impl PromotionConditionDraft {
    pub fn validate(&self) -> EngineResult<NewPromotionCondition> {
        if self.rank_id.trim().is_empty() {
            return Err(EngineError::validation("condition has no rank"));
        }
        let subject = match (&self.kpi_id, &self.requirement_id) {
            (Some(kpi), None)         => ConditionSubject::Kpi(kpi.clone()),
            (None, Some(requirement)) => ConditionSubject::Requirement(requirement.clone()),
            (Some(_), Some(_)) => {
                return Err(EngineError::validation(
                    "condition references both a KPI and a requirement",
                ))
            }
            (None, None) => {
                return Err(EngineError::validation(
                    "condition references neither a KPI nor a requirement",
                ))
            }
        };
        if self.timeframe_days == 0 {
            return Err(EngineError::validation("timeframe_days must be at least 1"));
        }
        if let Some(score) = self.minimum_skillset_score {
            if !(0.0..=MAX_SKILLSET_SCORE).contains(&score) {
                return Err(EngineError::validation(format!(
                    "minimum_skillset_score {score} is outside 0-100"
                )));
            }
        }
        let target = if self.is_property_specific {
            ConditionTarget::PropertySplit {
                house: self.target_count_house,
                condo: self.target_count_condo,
            }
        } else {
            ConditionTarget::Uniform { count: self.target_count_house }
        };
        Ok(NewPromotionCondition {
            rank_id: self.rank_id.clone(),
            subject,
            target,
            minimum_skillset_score: self.minimum_skillset_score,
            timeframe_days: self.timeframe_days,
        })
    }
}

// ── Weeks ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiActionEntry {
    pub kpi_id:  KpiId,
    pub target:  u32,
    pub actual:  u32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiSkillsetEntry {
    pub kpi_id:       KpiId,
    pub target_score: f64,
    pub score:        f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequirementEntry {
    pub requirement_id: RequirementId,
    pub target:         u32,
    pub actual:         u32,
    #[serde(default = "enabled_by_default")]
    pub enabled:        bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViolationEntry {
    pub rule_id:  RuleId,
    #[serde(default)]
    pub remark:   Option<String>,
    #[serde(default)]
    pub resolved: bool,
}

fn enabled_by_default() -> bool { true }

/// The replaceable sub-collections of a week, in recorded order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WeekEntries {
    #[serde(default)]
    pub kpi_actions:   Vec<KpiActionEntry>,
    #[serde(default)]
    pub kpi_skillsets: Vec<KpiSkillsetEntry>,
    #[serde(default)]
    pub requirements:  Vec<RequirementEntry>,
    #[serde(default)]
    pub violations:    Vec<ViolationEntry>,
}

impl WeekEntries {
    pub fn is_empty(&self) -> bool {
        self.kpi_actions.is_empty()
            && self.kpi_skillsets.is_empty()
            && self.requirements.is_empty()
            && self.violations.is_empty()
    }

    pub fn validate(&self) -> EngineResult<()> {
        for entry in &self.kpi_skillsets {
            for (label, value) in [("score", entry.score), ("target_score", entry.target_score)] {
                if !(0.0..=MAX_SKILLSET_SCORE).contains(&value) {
                    return Err(EngineError::validation(format!(
                        "skillset {label} {value} for KPI '{}' is outside 0-100",
                        entry.kpi_id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WeekStatus {
    /// Created but nothing recorded yet.
    Pending,
    Failed,
    Passed,
    /// Passed, and every skillset score reached its target.
    Perfect,
}

impl WeekStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed | Self::Perfect)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Week {
    pub week_id:     WeekId,
    pub agent_id:    AgentId,
    pub week_number: WeekNumber,
    #[serde(flatten)]
    pub entries:     WeekEntries,
}

impl Week {
    pub fn status(&self) -> WeekStatus {
        let e = &self.entries;
        if e.is_empty() {
            return WeekStatus::Pending;
        }
        let actions_met = e.kpi_actions.iter()
            .filter(|a| a.enabled)
            .all(|a| a.actual >= a.target);
        let requirements_met = e.requirements.iter()
            .filter(|r| r.enabled)
            .all(|r| r.actual >= r.target);
        let clean = e.violations.iter().all(|v| v.resolved);

        if !(actions_met && requirements_met && clean) {
            return WeekStatus::Failed;
        }
        if e.kpi_skillsets.iter().all(|s| s.score >= s.target_score) {
            WeekStatus::Perfect
        } else {
            WeekStatus::Passed
        }
    }

    /// First calendar day of this week for an agent who started on `agent_start`.
    pub fn start_date(&self, agent_start: NaiveDate) -> NaiveDate {
        week_start_date(agent_start, self.week_number)
    }
}

pub fn week_start_date(agent_start: NaiveDate, week_number: WeekNumber) -> NaiveDate {
    let offset = u64::from(week_number.saturating_sub(1)) * 7;
    agent_start + Days::new(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PromotionConditionDraft {
        PromotionConditionDraft {
            rank_id: "rank-1".into(),
            kpi_id: Some("kpi-calls".into()),
            target_count_house: 5,
            target_count_condo: 8,
            timeframe_days: 30,
            ..Default::default()
        }
    }

    #[test]
    fn uniform_target_ignores_condo_count() {
        let condition = draft().validate().unwrap();
        assert_eq!(condition.target, ConditionTarget::Uniform { count: 5 });
        assert_eq!(condition.target.for_property(PropertyType::Condo), 5);
    }

    #[test]
    fn property_split_selects_by_property() {
        let condition = PromotionConditionDraft { is_property_specific: true, ..draft() }
            .validate()
            .unwrap();
        assert_eq!(condition.target.for_property(PropertyType::House), 5);
        assert_eq!(condition.target.for_property(PropertyType::Condo), 8);
    }

    #[test]
    fn condition_must_reference_exactly_one_subject() {
        let both = PromotionConditionDraft { requirement_id: Some("req".into()), ..draft() };
        assert!(matches!(both.validate(), Err(EngineError::Validation(_))));

        let neither = PromotionConditionDraft { kpi_id: None, ..draft() };
        assert!(matches!(neither.validate(), Err(EngineError::Validation(_))));
    }

    #[test]
    fn zero_timeframe_and_out_of_range_score_are_rejected() {
        let zero = PromotionConditionDraft { timeframe_days: 0, ..draft() };
        assert!(zero.validate().is_err());

        let score = PromotionConditionDraft { minimum_skillset_score: Some(140.0), ..draft() };
        assert!(score.validate().is_err());
    }

    #[test]
    fn week_start_dates_step_by_seven_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(week_start_date(start, 1), start);
        assert_eq!(week_start_date(start, 3), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn unresolved_violation_fails_an_otherwise_perfect_week() {
        let mut week = Week {
            week_id: "w".into(),
            agent_id: "a".into(),
            week_number: 1,
            entries: WeekEntries {
                kpi_actions: vec![KpiActionEntry {
                    kpi_id: "k".into(), target: 1, actual: 1, enabled: true,
                }],
                ..Default::default()
            },
        };
        assert_eq!(week.status(), WeekStatus::Perfect);

        week.entries.violations.push(ViolationEntry {
            rule_id: "r".into(), remark: None, resolved: false,
        });
        assert_eq!(week.status(), WeekStatus::Failed);

        week.entries.violations[0].resolved = true;
        assert_eq!(week.status(), WeekStatus::Perfect);
    }
}
