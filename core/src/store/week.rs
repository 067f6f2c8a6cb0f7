use super::{new_id, SqliteStore};
use crate::{
    error::{EngineError, EngineResult},
    model::{Week, WeekEntries},
    types::WeekNumber,
};
use rusqlite::{params, OptionalExtension};

struct WeekRow {
    week_id:      String,
    agent_id:     String,
    week_number:  WeekNumber,
    entries_json: String,
}

impl WeekRow {
    fn into_week(self) -> EngineResult<Week> {
        let entries: WeekEntries = serde_json::from_str(&self.entries_json)?;
        Ok(Week {
            week_id: self.week_id,
            agent_id: self.agent_id,
            week_number: self.week_number,
            entries,
        })
    }
}

fn week_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeekRow> {
    Ok(WeekRow {
        week_id: row.get(0)?,
        agent_id: row.get(1)?,
        week_number: row.get::<_, i64>(2)? as WeekNumber,
        entries_json: row.get(3)?,
    })
}

impl SqliteStore {
    // ── Week ──────────────────────────────────────────────────────

    /// Insert an empty week. The (agent_id, week_number) unique index
    /// turns a duplicate into a constraint error.
    pub(super) fn insert_week(
        &self,
        actor: &str,
        agent_id: &str,
        week_number: WeekNumber,
    ) -> EngineResult<Week> {
        if week_number == 0 {
            return Err(EngineError::validation("week_number starts at 1"));
        }
        let week = Week {
            week_id: new_id("week"),
            agent_id: agent_id.to_string(),
            week_number,
            entries: WeekEntries::default(),
        };
        self.conn.execute(
            "INSERT INTO week (week_id, agent_id, week_number, entries_json, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &week.week_id,
                agent_id,
                week_number as i64,
                serde_json::to_string(&week.entries)?,
                actor,
            ],
        )?;
        Ok(week)
    }

    /// All weeks for an agent, ascending by week number.
    pub(super) fn select_weeks(&self, agent_id: &str) -> EngineResult<Vec<Week>> {
        let mut stmt = self.conn.prepare(
            "SELECT week_id, agent_id, week_number, entries_json
             FROM week WHERE agent_id = ?1
             ORDER BY week_number ASC",
        )?;
        let rows = stmt
            .query_map(params![agent_id], week_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(WeekRow::into_week).collect()
    }

    pub(super) fn set_week_entries(
        &self,
        actor: &str,
        week_id: &str,
        entries: &WeekEntries,
    ) -> EngineResult<Week> {
        entries.validate()?;
        let changed = self.conn.execute(
            "UPDATE week SET entries_json = ?1, updated_by = ?2 WHERE week_id = ?3",
            params![serde_json::to_string(entries)?, actor, week_id],
        )?;
        if changed == 0 {
            return Err(EngineError::NotFound { kind: "week", id: week_id.to_string() });
        }
        let row = self
            .conn
            .query_row(
                "SELECT week_id, agent_id, week_number, entries_json
                 FROM week WHERE week_id = ?1",
                params![week_id],
                week_row_mapper,
            )
            .optional()?
            .ok_or_else(|| EngineError::NotFound { kind: "week", id: week_id.to_string() })?;
        row.into_week()
    }
}
