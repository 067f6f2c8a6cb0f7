//! Shared primitive types used across the entire engine.

/// A program week, counted from 1 at the agent's starting date.
pub type WeekNumber = u32;

/// Stable, unique identifiers for records held by the store.
pub type AgentId       = String;
pub type RankId        = String;
pub type KpiId         = String;
pub type RequirementId = String;
pub type RuleId        = String;
pub type ConditionId   = String;
pub type WeekId        = String;
