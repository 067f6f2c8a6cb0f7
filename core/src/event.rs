//! Run log: what a batch run did, item by item.
//!
//! Events are collected in the order items were processed and returned
//! with the run summary. They are not persisted.

use crate::types::{AgentId, ConditionId, RankId, WeekNumber};
use serde::{Deserialize, Serialize};

/// Every event emitted during a batch run.
/// Variants are appended, never reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    // ── Week generation ────────────────────────────
    AgentSkipped {
        agent_id: AgentId,
        reason:   String,
    },
    WeeksGenerated {
        agent_id:     AgentId,
        week_numbers: Vec<WeekNumber>,
    },
    WeeksComplete {
        agent_id:      AgentId,
        elapsed_weeks: u32,
    },

    // ── Any batch ──────────────────────────────────
    ItemFailed {
        item:  String,
        error: String,
    },

    // ── Condition import ───────────────────────────
    ConditionCreated {
        condition_id: ConditionId,
        rank_id:      RankId,
    },
}
