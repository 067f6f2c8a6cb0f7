//! Store methods for shared reference data: KPIs, requirements,
//! code-of-honor rules and ranks.

use super::{new_id, SqliteStore};
use crate::{
    error::EngineResult,
    model::{CodeOfHonorRule, Kpi, KpiType, NewRank, Rank, Requirement},
};
use rusqlite::{params, types::Type};

impl SqliteStore {
    // ── KPI ───────────────────────────────────────────────────────

    pub(super) fn insert_kpi(&self, actor: &str, name: &str, kpi_type: KpiType) -> EngineResult<Kpi> {
        let kpi_id = new_id("kpi");
        self.conn.execute(
            "INSERT INTO kpi (kpi_id, name, kpi_type, created_by) VALUES (?1, ?2, ?3, ?4)",
            params![&kpi_id, name, kpi_type.as_str(), actor],
        )?;
        Ok(Kpi { kpi_id, name: name.to_string(), kpi_type })
    }

    pub(super) fn select_kpis(&self) -> EngineResult<Vec<Kpi>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kpi_id, name, kpi_type FROM kpi ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| {
            let kpi_type = row
                .get::<_, String>(2)?
                .parse::<KpiType>()
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
            Ok(Kpi { kpi_id: row.get(0)?, name: row.get(1)?, kpi_type })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Requirement ───────────────────────────────────────────────

    pub(super) fn insert_requirement(&self, actor: &str, name: &str) -> EngineResult<Requirement> {
        let requirement_id = new_id("req");
        self.conn.execute(
            "INSERT INTO requirement (requirement_id, name, created_by) VALUES (?1, ?2, ?3)",
            params![&requirement_id, name, actor],
        )?;
        Ok(Requirement { requirement_id, name: name.to_string() })
    }

    pub(super) fn select_requirements(&self) -> EngineResult<Vec<Requirement>> {
        let mut stmt = self
            .conn
            .prepare("SELECT requirement_id, name FROM requirement ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Requirement { requirement_id: row.get(0)?, name: row.get(1)? })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Code of honor ─────────────────────────────────────────────

    pub(super) fn insert_rule(&self, actor: &str, name: &str) -> EngineResult<CodeOfHonorRule> {
        let rule_id = new_id("coh");
        self.conn.execute(
            "INSERT INTO coh_rule (rule_id, name, created_by) VALUES (?1, ?2, ?3)",
            params![&rule_id, name, actor],
        )?;
        Ok(CodeOfHonorRule { rule_id, name: name.to_string() })
    }

    pub(super) fn select_rules(&self) -> EngineResult<Vec<CodeOfHonorRule>> {
        let mut stmt = self
            .conn
            .prepare("SELECT rule_id, name FROM coh_rule ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(CodeOfHonorRule { rule_id: row.get(0)?, name: row.get(1)? })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ── Rank ──────────────────────────────────────────────────────

    pub(super) fn insert_rank(&self, actor: &str, rank: &NewRank) -> EngineResult<Rank> {
        let rank_id = new_id("rank");
        self.conn.execute(
            "INSERT INTO rank (rank_id, name, rank_level, time_requirement_months,
                               manual_promotion, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &rank_id,
                &rank.name,
                rank.rank_level as i64,
                rank.time_requirement_months as i64,
                if rank.manual_promotion { 1i32 } else { 0i32 },
                actor,
            ],
        )?;
        Ok(Rank {
            rank_id,
            name: rank.name.clone(),
            rank_level: rank.rank_level,
            time_requirement_months: rank.time_requirement_months,
            manual_promotion: rank.manual_promotion,
        })
    }

    /// Ranks ordered by level, lowest first.
    pub(super) fn select_ranks(&self) -> EngineResult<Vec<Rank>> {
        let mut stmt = self.conn.prepare(
            "SELECT rank_id, name, rank_level, time_requirement_months, manual_promotion
             FROM rank ORDER BY rank_level ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Rank {
                rank_id: row.get(0)?,
                name: row.get(1)?,
                rank_level: row.get::<_, i64>(2)? as u32,
                time_requirement_months: row.get::<_, i64>(3)? as u32,
                manual_promotion: row.get::<_, i32>(4)? != 0,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
