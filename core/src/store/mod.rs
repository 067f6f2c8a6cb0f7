//! Record store: the engine's only view of persisted data.
//!
//! RULE: The generator, evaluator and batch runner talk to `RecordStore`,
//! never to SQL. `SqliteStore` is the bundled implementation; anything that
//! speaks the same operations (a remote CRUD API, a test double) can stand in.
//!
//! Every call carries an explicit `StoreContext`. There is no ambient session.

use crate::{
    error::{EngineError, EngineResult},
    model::{
        Agent, CodeOfHonorRule, Kpi, KpiType, NewAgent, NewPromotionCondition, NewRank,
        PromotionCondition, Rank, Requirement, Week, WeekEntries,
    },
    types::{RankId, WeekNumber},
};
use chrono::NaiveDate;
use rusqlite::Connection;

mod agent;
mod condition;
mod reference;
mod week;

/// Credential/context threaded through every store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    /// Recorded as `created_by` / `updated_by` on writes.
    pub actor: String,
}

impl StoreContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self { actor: actor.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilter {
    pub rank_id:              Option<RankId>,
    /// Only agents that have a program start date.
    pub with_start_date_only: bool,
}

/// The operations the engine needs from its backing store.
/// Implementations must make each write atomic on its own.
pub trait RecordStore {
    // ── Agents ─────────────────────────────────────────────────
    fn list_agents(&self, ctx: &StoreContext, filter: &AgentFilter) -> EngineResult<Vec<Agent>>;
    fn get_agent(&self, ctx: &StoreContext, agent_id: &str) -> EngineResult<Agent>;
    fn create_agent(&self, ctx: &StoreContext, agent: &NewAgent) -> EngineResult<Agent>;
    fn update_agent_rank(&self, ctx: &StoreContext, agent_id: &str, rank_id: &str)
        -> EngineResult<()>;
    /// Rejected once the agent has any week; renumbering is not supported.
    fn update_agent_start_date(
        &self,
        ctx: &StoreContext,
        agent_id: &str,
        starting_date: Option<NaiveDate>,
    ) -> EngineResult<()>;

    // ── Weeks ──────────────────────────────────────────────────
    fn list_weeks_for_agent(&self, ctx: &StoreContext, agent_id: &str) -> EngineResult<Vec<Week>>;
    fn create_week(&self, ctx: &StoreContext, agent_id: &str, week_number: WeekNumber)
        -> EngineResult<Week>;
    fn update_week_entries(&self, ctx: &StoreContext, week_id: &str, entries: &WeekEntries)
        -> EngineResult<Week>;

    // ── Reference data ─────────────────────────────────────────
    fn list_kpis(&self, ctx: &StoreContext) -> EngineResult<Vec<Kpi>>;
    fn create_kpi(&self, ctx: &StoreContext, name: &str, kpi_type: KpiType) -> EngineResult<Kpi>;
    fn list_requirements(&self, ctx: &StoreContext) -> EngineResult<Vec<Requirement>>;
    fn create_requirement(&self, ctx: &StoreContext, name: &str) -> EngineResult<Requirement>;
    fn list_rules(&self, ctx: &StoreContext) -> EngineResult<Vec<CodeOfHonorRule>>;
    fn create_rule(&self, ctx: &StoreContext, name: &str) -> EngineResult<CodeOfHonorRule>;
    fn list_ranks(&self, ctx: &StoreContext) -> EngineResult<Vec<Rank>>;
    fn create_rank(&self, ctx: &StoreContext, rank: &NewRank) -> EngineResult<Rank>;

    // ── Promotion conditions ───────────────────────────────────
    fn list_promotion_conditions(&self, ctx: &StoreContext, rank_id: Option<&str>)
        -> EngineResult<Vec<PromotionCondition>>;
    fn create_promotion_condition(&self, ctx: &StoreContext, condition: &NewPromotionCondition)
        -> EngineResult<PromotionCondition>;
}

/// SQLite-backed record store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Database failures become store read errors tagged with the operation.
/// Validation and not-found outcomes pass through unchanged.
fn as_read<T>(op: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    result.map_err(|e| match e {
        EngineError::Database(err)      => EngineError::read(op, err),
        EngineError::Serialization(err) => EngineError::read(op, err),
        other                           => other,
    })
}

fn as_write<T>(op: &'static str, result: EngineResult<T>) -> EngineResult<T> {
    result.map_err(|e| match e {
        EngineError::Database(err)      => EngineError::write(op, err),
        EngineError::Serialization(err) => EngineError::write(op, err),
        other                           => other,
    })
}

impl RecordStore for SqliteStore {
    fn list_agents(&self, _ctx: &StoreContext, filter: &AgentFilter) -> EngineResult<Vec<Agent>> {
        as_read("list_agents", self.select_agents(filter))
    }

    fn get_agent(&self, _ctx: &StoreContext, agent_id: &str) -> EngineResult<Agent> {
        as_read("get_agent", self.select_agent(agent_id))
    }

    fn create_agent(&self, ctx: &StoreContext, agent: &NewAgent) -> EngineResult<Agent> {
        as_write("create_agent", self.insert_agent(&ctx.actor, agent))
    }

    fn update_agent_rank(&self, ctx: &StoreContext, agent_id: &str, rank_id: &str)
        -> EngineResult<()>
    {
        as_write("update_agent_rank", self.set_agent_rank(&ctx.actor, agent_id, rank_id))
    }

    fn update_agent_start_date(
        &self,
        ctx: &StoreContext,
        agent_id: &str,
        starting_date: Option<NaiveDate>,
    ) -> EngineResult<()> {
        as_write(
            "update_agent_start_date",
            self.set_agent_start_date(&ctx.actor, agent_id, starting_date),
        )
    }

    fn list_weeks_for_agent(&self, _ctx: &StoreContext, agent_id: &str) -> EngineResult<Vec<Week>> {
        as_read("list_weeks_for_agent", self.select_weeks(agent_id))
    }

    fn create_week(&self, ctx: &StoreContext, agent_id: &str, week_number: WeekNumber)
        -> EngineResult<Week>
    {
        as_write("create_week", self.insert_week(&ctx.actor, agent_id, week_number))
    }

    fn update_week_entries(&self, ctx: &StoreContext, week_id: &str, entries: &WeekEntries)
        -> EngineResult<Week>
    {
        as_write("update_week_entries", self.set_week_entries(&ctx.actor, week_id, entries))
    }

    fn list_kpis(&self, _ctx: &StoreContext) -> EngineResult<Vec<Kpi>> {
        as_read("list_kpis", self.select_kpis())
    }

    fn create_kpi(&self, ctx: &StoreContext, name: &str, kpi_type: KpiType) -> EngineResult<Kpi> {
        as_write("create_kpi", self.insert_kpi(&ctx.actor, name, kpi_type))
    }

    fn list_requirements(&self, _ctx: &StoreContext) -> EngineResult<Vec<Requirement>> {
        as_read("list_requirements", self.select_requirements())
    }

    fn create_requirement(&self, ctx: &StoreContext, name: &str) -> EngineResult<Requirement> {
        as_write("create_requirement", self.insert_requirement(&ctx.actor, name))
    }

    fn list_rules(&self, _ctx: &StoreContext) -> EngineResult<Vec<CodeOfHonorRule>> {
        as_read("list_rules", self.select_rules())
    }

    fn create_rule(&self, ctx: &StoreContext, name: &str) -> EngineResult<CodeOfHonorRule> {
        as_write("create_rule", self.insert_rule(&ctx.actor, name))
    }

    fn list_ranks(&self, _ctx: &StoreContext) -> EngineResult<Vec<Rank>> {
        as_read("list_ranks", self.select_ranks())
    }

    fn create_rank(&self, ctx: &StoreContext, rank: &NewRank) -> EngineResult<Rank> {
        as_write("create_rank", self.insert_rank(&ctx.actor, rank))
    }

    fn list_promotion_conditions(&self, _ctx: &StoreContext, rank_id: Option<&str>)
        -> EngineResult<Vec<PromotionCondition>>
    {
        as_read("list_promotion_conditions", self.select_conditions(rank_id))
    }

    fn create_promotion_condition(&self, ctx: &StoreContext, condition: &NewPromotionCondition)
        -> EngineResult<PromotionCondition>
    {
        as_write(
            "create_promotion_condition",
            self.insert_condition(&ctx.actor, condition),
        )
    }
}
