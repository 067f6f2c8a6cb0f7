//! Week generator: makes sure every elapsed program week has a record.
//!
//! Week `n` begins `7 * (n - 1)` days after the agent's starting date.
//! The number of elapsed weeks is capped at the program length, so an agent
//! who finished the program long ago still has exactly that many weeks.
//!
//! RULES:
//!   - Missing weeks are created in ascending week-number order.
//!   - Existing weeks are never touched or deleted.
//!   - Running twice with the same "today" creates nothing the second time.

use crate::{
    config::EngineConfig,
    error::{EngineError, EngineResult},
    model::{Agent, Week},
    store::{RecordStore, StoreContext},
    types::{AgentId, WeekNumber},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Number of program weeks that have begun by `today`.
/// A start date in the future yields 0.
pub fn elapsed_weeks(starting_date: NaiveDate, today: NaiveDate, program_length: u32) -> u32 {
    let days = (today - starting_date).num_days();
    if days < 0 {
        return 0;
    }
    let weeks = days / 7 + 1;
    weeks.min(i64::from(program_length)) as u32
}

/// Outcome of `ensure_weeks` for one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekGeneration {
    pub agent_id:      AgentId,
    /// Newly created weeks, ascending.
    pub created:       Vec<Week>,
    /// True when the agent has no starting date and was not scheduled.
    pub skipped:       bool,
    pub elapsed_weeks: u32,
}

/// `ensure_weeks` failed part-way. `generation.created` holds the weeks
/// that were written before `error`.
#[derive(Debug)]
pub struct IncompleteGeneration {
    pub generation: WeekGeneration,
    pub error:      EngineError,
}

impl From<IncompleteGeneration> for EngineError {
    fn from(incomplete: IncompleteGeneration) -> Self {
        incomplete.error
    }
}

impl WeekGeneration {
    fn skipped(agent_id: &str) -> Self {
        Self {
            agent_id:      agent_id.to_string(),
            created:       Vec::new(),
            skipped:       true,
            elapsed_weeks: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeekGenerator {
    program_length_weeks: u32,
}

impl WeekGenerator {
    pub fn new(program_length_weeks: u32) -> Self {
        Self { program_length_weeks }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.program_length_weeks)
    }

    /// Elapsed weeks for this agent, or `MissingStartDate`.
    pub fn elapsed_for(&self, agent: &Agent, today: NaiveDate) -> EngineResult<u32> {
        let start = agent.starting_date.ok_or_else(|| EngineError::MissingStartDate {
            agent_id: agent.agent_id.clone(),
        })?;
        Ok(elapsed_weeks(start, today, self.program_length_weeks))
    }

    /// Week numbers in `1..=elapsed` that `existing` lacks, ascending.
    pub fn plan(&self, agent: &Agent, existing: &[Week], today: NaiveDate)
        -> EngineResult<Vec<WeekNumber>>
    {
        let elapsed = self.elapsed_for(agent, today)?;
        let present: BTreeSet<WeekNumber> = existing.iter().map(|w| w.week_number).collect();
        Ok((1..=elapsed).filter(|n| !present.contains(n)).collect())
    }

    /// Create every missing elapsed week for `agent`.
    ///
    /// An agent without a starting date comes back with `skipped = true`;
    /// that is an outcome, not an error. A store failure stops creation for
    /// this agent at the first failed week and comes back as
    /// `IncompleteGeneration`, carrying the weeks that did land. Those are
    /// still a gap-free prefix of the missing run.
    pub fn ensure_weeks<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        ctx: &StoreContext,
        agent: &Agent,
        today: NaiveDate,
    ) -> Result<WeekGeneration, IncompleteGeneration> {
        let elapsed_weeks = match self.elapsed_for(agent, today) {
            Ok(n) => n,
            Err(EngineError::MissingStartDate { agent_id }) => {
                log::debug!("agent={agent_id} skipped: no starting date");
                return Ok(WeekGeneration::skipped(&agent_id));
            }
            Err(error) => {
                let generation = WeekGeneration { skipped: false, ..WeekGeneration::skipped(&agent.agent_id) };
                return Err(IncompleteGeneration { generation, error });
            }
        };
        let mut generation = WeekGeneration {
            agent_id: agent.agent_id.clone(),
            created: Vec::new(),
            skipped: false,
            elapsed_weeks,
        };

        let missing = match store
            .list_weeks_for_agent(ctx, &agent.agent_id)
            .and_then(|existing| self.plan(agent, &existing, today))
        {
            Ok(missing) => missing,
            Err(error) => return Err(IncompleteGeneration { generation, error }),
        };

        for week_number in missing {
            match store.create_week(ctx, &agent.agent_id, week_number) {
                Ok(week) => {
                    log::debug!("agent={} created week {week_number}", agent.agent_id);
                    generation.created.push(week);
                }
                Err(error) => {
                    log::debug!(
                        "agent={} stopped at week {week_number} after {} new week(s)",
                        agent.agent_id,
                        generation.created.len()
                    );
                    return Err(IncompleteGeneration { generation, error });
                }
            }
        }

        Ok(generation)
    }
}
