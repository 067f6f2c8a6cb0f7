use super::{new_id, SqliteStore};
use crate::{
    error::EngineResult,
    model::{
        ConditionSubject, ConditionTarget, NewPromotionCondition, PromotionCondition,
        PromotionConditionDraft,
    },
};
use rusqlite::params;

/// Rows are read back through the same validation as fresh input,
/// so a hand-edited database cannot smuggle in a malformed condition.
fn condition_row_mapper(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<(String, PromotionConditionDraft)> {
    Ok((
        row.get(0)?,
        PromotionConditionDraft {
            rank_id: row.get(1)?,
            kpi_id: row.get(2)?,
            requirement_id: row.get(3)?,
            is_property_specific: row.get::<_, i32>(4)? != 0,
            target_count_house: row.get::<_, i64>(5)? as u32,
            target_count_condo: row.get::<_, i64>(6)? as u32,
            minimum_skillset_score: row.get(7)?,
            timeframe_days: row.get::<_, i64>(8)? as u32,
        },
    ))
}

impl SqliteStore {
    // ── Promotion condition ───────────────────────────────────────

    pub(super) fn insert_condition(
        &self,
        actor: &str,
        c: &NewPromotionCondition,
    ) -> EngineResult<PromotionCondition> {
        let condition_id = new_id("cond");
        let (kpi_id, requirement_id) = match &c.subject {
            ConditionSubject::Kpi(id)         => (Some(id.as_str()), None),
            ConditionSubject::Requirement(id) => (None, Some(id.as_str())),
        };
        let (property_specific, house, condo) = match c.target {
            ConditionTarget::Uniform { count }          => (false, count, count),
            ConditionTarget::PropertySplit { house, condo } => (true, house, condo),
        };
        self.conn.execute(
            "INSERT INTO promotion_condition (
                condition_id, rank_id, kpi_id, requirement_id, is_property_specific,
                target_count_house, target_count_condo, minimum_skillset_score,
                timeframe_days, created_by
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                &condition_id,
                &c.rank_id,
                kpi_id,
                requirement_id,
                if property_specific { 1i32 } else { 0i32 },
                house as i64,
                condo as i64,
                c.minimum_skillset_score,
                c.timeframe_days as i64,
                actor,
            ],
        )?;
        Ok(c.clone().with_id(condition_id))
    }

    pub(super) fn select_conditions(&self, rank_id: Option<&str>) -> EngineResult<Vec<PromotionCondition>> {
        let mut stmt = self.conn.prepare(
            "SELECT condition_id, rank_id, kpi_id, requirement_id, is_property_specific,
                    target_count_house, target_count_condo, minimum_skillset_score,
                    timeframe_days
             FROM promotion_condition
             WHERE (?1 IS NULL OR rank_id = ?1)
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![rank_id], condition_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(condition_id, draft)| Ok(draft.validate()?.with_id(condition_id)))
            .collect()
    }
}
