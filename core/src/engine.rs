//! The cohort engine: the operations callers (UI, the runner) use.
//!
//! OPERATIONS:
//!   - generate_missing_weeks_for_all_agents  (batch, sequential, paced)
//!   - create_promotion_conditions             (batch, sequential, paced)
//!   - get_summary_metrics                     (read + pure reduction)
//!   - evaluate_promotion / apply_promotion    (read + pure evaluation)
//!
//! RULES:
//!   - Writes to the store only ever happen one at a time.
//!   - A batch only fails as a whole if its item list cannot be read.
//!   - All dates come from the engine clock.

use crate::{
    batch::{BatchExecutor, CancelFlag},
    clock::EngineClock,
    config::EngineConfig,
    error::{EngineError, EngineResult},
    event::EngineEvent,
    metrics::{MetricsAggregator, SummaryMetrics},
    model::{Agent, PromotionCondition, PromotionConditionDraft, Rank, Week, WeekEntries},
    promotion::{next_rank, EligibilityResult, PromotionEvaluator},
    store::{AgentFilter, RecordStore, SqliteStore, StoreContext},
    types::{RankId, WeekNumber},
    week_generator::{IncompleteGeneration, WeekGeneration, WeekGenerator},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Totals for one week-generation run. The runner prints this and exits
/// non-zero when `errors > 0` or the run was cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total_agents:                usize,
    pub agents_with_complete_weeks:  usize,
    pub agents_without_start_date:   usize,
    pub agents_with_generated_weeks: usize,
    pub weeks_generated:             usize,
    pub errors:                      usize,
    pub cancelled:                   bool,
}

impl BatchSummary {
    /// A cancelled run skipped work, so it is never a success.
    pub fn is_success(&self) -> bool {
        self.errors == 0 && !self.cancelled
    }

    fn record(&mut self, generation: &WeekGeneration) {
        if generation.skipped {
            self.agents_without_start_date += 1;
        } else if generation.created.is_empty() {
            self.agents_with_complete_weeks += 1;
        } else {
            self.agents_with_generated_weeks += 1;
            self.weeks_generated += generation.created.len();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: BatchSummary,
    pub events:  Vec<EngineEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionImportReport {
    pub total:     usize,
    pub created:   Vec<PromotionCondition>,
    pub errors:    usize,
    pub cancelled: bool,
    pub events:    Vec<EngineEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PromotionDecision {
    Promoted {
        from_rank:   Option<RankId>,
        to_rank:     RankId,
        eligibility: EligibilityResult,
    },
    NotEligible { eligibility: EligibilityResult },
    TenureNotMet { eligibility: EligibilityResult },
    /// Eligible, but the rank requires a human decision.
    ManualReview { eligibility: EligibilityResult },
    AtTopRank,
}

pub struct CohortEngine<S: RecordStore> {
    store:     S,
    config:    EngineConfig,
    clock:     EngineClock,
    ctx:       StoreContext,
    generator: WeekGenerator,
    executor:  BatchExecutor,
}

impl<S: RecordStore> CohortEngine<S> {
    pub fn new(store: S, config: EngineConfig, clock: EngineClock) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            ctx:       StoreContext::new(config.actor.clone()),
            generator: WeekGenerator::from_config(&config),
            executor:  BatchExecutor::new(config.batch_delay()),
            store,
            config,
            clock,
        })
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn context(&self) -> &StoreContext { &self.ctx }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn today(&self) -> NaiveDate { self.clock.today() }

    pub fn set_clock(&mut self, clock: EngineClock) { self.clock = clock; }

    /// Flag that stops a running batch between items. It stays set until
    /// `reset()`; every batch started while it is set stops before its first item.
    pub fn cancel_flag(&self) -> CancelFlag { self.executor.cancel_flag() }

    // ── Week generation ────────────────────────────────────────

    pub fn ensure_weeks(&self, agent_id: &str) -> EngineResult<WeekGeneration> {
        let agent = self.store.get_agent(&self.ctx, agent_id)?;
        Ok(self.generator.ensure_weeks(&self.store, &self.ctx, &agent, self.today())?)
    }

    pub fn generate_missing_weeks_for_all_agents(&self) -> EngineResult<RunReport> {
        let today = self.today();
        let agents = self.store.list_agents(&self.ctx, &AgentFilter::default())?;
        log::info!("week generation: {} agent(s) as of {today}", agents.len());

        let mut summary = BatchSummary::default();
        let mut events = Vec::new();

        let outcome = self.executor.run_sequential(agents, |agent| {
            match self.generator.ensure_weeks(&self.store, &self.ctx, agent, today) {
                Ok(generation) => {
                    summary.record(&generation);
                    events.push(generation_event(&generation));
                    Ok(generation)
                }
                Err(IncompleteGeneration { generation, error }) => {
                    // Weeks written before the failure are in the store; count them.
                    summary.weeks_generated += generation.created.len();
                    if !generation.created.is_empty() {
                        events.push(generation_event(&generation));
                    }
                    events.push(EngineEvent::ItemFailed {
                        item:  agent.agent_id.clone(),
                        error: error.to_string(),
                    });
                    Err(error)
                }
            }
        });

        summary.total_agents = outcome.attempted();
        summary.errors = outcome.failed.len();
        summary.cancelled = outcome.cancelled;

        log::info!(
            "week generation done: agents={} generated_for={} complete={} no_start={} weeks={} errors={}",
            summary.total_agents,
            summary.agents_with_generated_weeks,
            summary.agents_with_complete_weeks,
            summary.agents_without_start_date,
            summary.weeks_generated,
            summary.errors,
        );
        Ok(RunReport { summary, events })
    }

    /// Replace the entries of one week. The week must already exist.
    pub fn record_week_entries(
        &self,
        agent_id: &str,
        week_number: WeekNumber,
        entries: &WeekEntries,
    ) -> EngineResult<Week> {
        entries.validate()?;
        let week = self
            .store
            .list_weeks_for_agent(&self.ctx, agent_id)?
            .into_iter()
            .find(|w| w.week_number == week_number)
            .ok_or_else(|| EngineError::NotFound {
                kind: "week",
                id:   format!("{agent_id}#{week_number}"),
            })?;
        self.store.update_week_entries(&self.ctx, &week.week_id, entries)
    }

    // ── Metrics ────────────────────────────────────────────────

    pub fn get_summary_metrics(&self, agent_id: &str) -> EngineResult<SummaryMetrics> {
        let agent = self.store.get_agent(&self.ctx, agent_id)?;
        let weeks = self.store.list_weeks_for_agent(&self.ctx, agent_id)?;
        let as_of = match self.generator.elapsed_for(&agent, self.today()) {
            Ok(n) => n,
            Err(EngineError::MissingStartDate { .. }) => 0,
            Err(e) => return Err(e),
        };
        Ok(MetricsAggregator::summarize(&weeks, as_of))
    }

    // ── Promotion ──────────────────────────────────────────────

    /// Evaluate the agent against the next rank up.
    /// `None` when the agent already holds the highest rank.
    pub fn evaluate_promotion(&self, agent_id: &str) -> EngineResult<Option<EligibilityResult>> {
        let agent = self.store.get_agent(&self.ctx, agent_id)?;
        let ranks = self.store.list_ranks(&self.ctx)?;
        match next_rank(&ranks, agent.rank_id.as_deref())? {
            Some(rank) => self.evaluate_against(&agent, rank).map(Some),
            None => Ok(None),
        }
    }

    /// Evaluate the agent against a specific rank's conditions.
    pub fn evaluate_promotion_for_rank(&self, agent_id: &str, rank_id: &str)
        -> EngineResult<EligibilityResult>
    {
        let rank = self
            .store
            .list_ranks(&self.ctx)?
            .into_iter()
            .find(|r| r.rank_id == rank_id)
            .ok_or_else(|| EngineError::NotFound { kind: "rank", id: rank_id.to_string() })?;
        let agent = self.store.get_agent(&self.ctx, agent_id)?;
        self.evaluate_against(&agent, &rank)
    }

    fn evaluate_against(&self, agent: &Agent, rank: &Rank) -> EngineResult<EligibilityResult> {
        let kpis = self.store.list_kpis(&self.ctx)?;
        let conditions = self
            .store
            .list_promotion_conditions(&self.ctx, Some(&rank.rank_id))?;
        let history = self.store.list_weeks_for_agent(&self.ctx, &agent.agent_id)?;
        PromotionEvaluator::evaluate(agent, rank, &conditions, &kpis, &history, self.today())
    }

    /// Promote the agent to the next rank when eligible, tenure is met and
    /// the rank allows automatic promotion.
    pub fn apply_promotion(&self, agent_id: &str) -> EngineResult<PromotionDecision> {
        let Some(eligibility) = self.evaluate_promotion(agent_id)? else {
            return Ok(PromotionDecision::AtTopRank);
        };
        if !eligibility.eligible {
            return Ok(PromotionDecision::NotEligible { eligibility });
        }
        if eligibility.manual_promotion {
            log::info!("agent={agent_id} eligible for {} (manual review)", eligibility.rank_id);
            return Ok(PromotionDecision::ManualReview { eligibility });
        }
        if !eligibility.tenure.met {
            return Ok(PromotionDecision::TenureNotMet { eligibility });
        }

        let agent = self.store.get_agent(&self.ctx, agent_id)?;
        self.store
            .update_agent_rank(&self.ctx, agent_id, &eligibility.rank_id)?;
        log::info!(
            "agent={agent_id} promoted {:?} -> {}",
            agent.rank_id,
            eligibility.rank_id
        );
        Ok(PromotionDecision::Promoted {
            from_rank: agent.rank_id,
            to_rank: eligibility.rank_id.clone(),
            eligibility,
        })
    }

    /// Validate every draft up front, against the KPI catalogue as well,
    /// then create them one at a time.
    /// A malformed draft rejects the whole import before anything is written.
    pub fn create_promotion_conditions(
        &self,
        drafts: &[PromotionConditionDraft],
    ) -> EngineResult<ConditionImportReport> {
        let kpis = self.store.list_kpis(&self.ctx)?;
        let validated = drafts
            .iter()
            .enumerate()
            .map(|(i, d)| {
                d.validate()
                    .and_then(|c| c.check_subject(&kpis).map(|()| c))
                    .map_err(|e| EngineError::validation(format!("condition #{}: {e}", i + 1)))
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let mut events = Vec::new();
        let outcome = self.executor.run_sequential(validated, |condition| {
            let result = self.store.create_promotion_condition(&self.ctx, condition);
            match &result {
                Ok(created) => events.push(EngineEvent::ConditionCreated {
                    condition_id: created.condition_id.clone(),
                    rank_id:      created.rank_id.clone(),
                }),
                Err(error) => events.push(EngineEvent::ItemFailed {
                    item:  format!("condition for rank {}", condition.rank_id),
                    error: error.to_string(),
                }),
            }
            result
        });

        log::info!(
            "condition import: {} created, {} failed of {}",
            outcome.succeeded.len(),
            outcome.failed.len(),
            outcome.total
        );
        Ok(ConditionImportReport {
            total:     outcome.total,
            errors:    outcome.failed.len(),
            cancelled: outcome.cancelled,
            created:   outcome.succeeded,
            events,
        })
    }
}

impl CohortEngine<SqliteStore> {
    /// In-memory, migrated engine pinned to `today` with test config.
    pub fn build_test(today: NaiveDate) -> EngineResult<Self> {
        let store = SqliteStore::in_memory()?;
        store.migrate()?;
        Self::new(store, EngineConfig::default_test(), EngineClock::Fixed(today))
    }
}

fn generation_event(generation: &WeekGeneration) -> EngineEvent {
    if generation.skipped {
        EngineEvent::AgentSkipped {
            agent_id: generation.agent_id.clone(),
            reason:   "no starting date".into(),
        }
    } else if generation.created.is_empty() {
        EngineEvent::WeeksComplete {
            agent_id:      generation.agent_id.clone(),
            elapsed_weeks: generation.elapsed_weeks,
        }
    } else {
        EngineEvent::WeeksGenerated {
            agent_id:     generation.agent_id.clone(),
            week_numbers: generation.created.iter().map(|w| w.week_number).collect(),
        }
    }
}
