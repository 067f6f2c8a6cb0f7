use super::{new_id, AgentFilter, SqliteStore};
use crate::{
    error::{EngineError, EngineResult},
    model::{Agent, NewAgent, PropertyType},
};
use chrono::NaiveDate;
use rusqlite::{params, types::Type, OptionalExtension};

const DATE_FORMAT: &str = "%Y-%m-%d";

// Helper function for mapping agent rows
fn agent_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Agent> {
    let starting_date = row
        .get::<_, Option<String>>(2)?
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))
        })
        .transpose()?;
    let property_type = row
        .get::<_, String>(4)?
        .parse::<PropertyType>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Agent {
        agent_id: row.get(0)?,
        name: row.get(1)?,
        starting_date,
        rank_id: row.get(3)?,
        property_type,
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

impl SqliteStore {
    // ── Agent ─────────────────────────────────────────────────────

    pub(super) fn insert_agent(&self, actor: &str, agent: &NewAgent) -> EngineResult<Agent> {
        let agent_id = new_id("agent");
        self.conn.execute(
            "INSERT INTO agent (agent_id, name, starting_date, rank_id, property_type, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &agent_id,
                &agent.name,
                format_date(agent.starting_date),
                agent.rank_id.as_deref(),
                agent.property_type.as_str(),
                actor,
            ],
        )?;
        Ok(Agent {
            agent_id,
            name: agent.name.clone(),
            starting_date: agent.starting_date,
            rank_id: agent.rank_id.clone(),
            property_type: agent.property_type,
        })
    }

    pub(super) fn select_agent(&self, agent_id: &str) -> EngineResult<Agent> {
        self.conn
            .query_row(
                "SELECT agent_id, name, starting_date, rank_id, property_type
                 FROM agent WHERE agent_id = ?1",
                params![agent_id],
                agent_row_mapper,
            )
            .optional()?
            .ok_or_else(|| EngineError::NotFound { kind: "agent", id: agent_id.to_string() })
    }

    /// Agents in creation order.
    pub(super) fn select_agents(&self, filter: &AgentFilter) -> EngineResult<Vec<Agent>> {
        let mut stmt = self.conn.prepare(
            "SELECT agent_id, name, starting_date, rank_id, property_type
             FROM agent
             WHERE (?1 IS NULL OR rank_id = ?1)
               AND (?2 = 0 OR starting_date IS NOT NULL)
             ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(
            params![filter.rank_id.as_deref(), filter.with_start_date_only as i32],
            agent_row_mapper,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub(super) fn set_agent_rank(&self, actor: &str, agent_id: &str, rank_id: &str) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE agent SET rank_id = ?1, updated_by = ?2 WHERE agent_id = ?3",
            params![rank_id, actor, agent_id],
        )?;
        if changed == 0 {
            return Err(EngineError::NotFound { kind: "agent", id: agent_id.to_string() });
        }
        Ok(())
    }

    pub(super) fn set_agent_start_date(
        &self,
        actor: &str,
        agent_id: &str,
        starting_date: Option<NaiveDate>,
    ) -> EngineResult<()> {
        let existing = self.select_agent(agent_id)?;
        if existing.starting_date == starting_date {
            return Ok(());
        }
        let week_count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM week WHERE agent_id = ?1",
            params![agent_id],
            |row| row.get(0),
        )?;
        if week_count > 0 {
            return Err(EngineError::validation(format!(
                "agent '{agent_id}' already has {week_count} week(s); starting_date is locked"
            )));
        }
        self.conn.execute(
            "UPDATE agent SET starting_date = ?1, updated_by = ?2 WHERE agent_id = ?3",
            params![format_date(starting_date), actor, agent_id],
        )?;
        Ok(())
    }
}
