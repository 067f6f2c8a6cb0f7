//! Summary metrics over an agent's week history. Pure; no I/O.
//!
//! Classification per week (see `Week::status`):
//!   Pending:  nothing recorded yet; counted neither passed nor failed.
//!   Failed:   an enabled action KPI or requirement missed its target,
//!             or an unresolved code-of-honor violation exists.
//!   Passed:   not failed.
//!   Perfect:  passed, and every skillset score met its target.
//!
//! A perfect week counts once in `weeks_passed` AND once in
//! `target_100_percent_weeks`. Weeks beyond `as_of_week` have not started
//! and are left out of the pass/fail counts. Violations always count.

use crate::{
    model::{Week, WeekStatus},
    types::WeekNumber,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SummaryMetrics {
    pub weeks_passed:             u32,
    pub target_100_percent_weeks: u32,
    pub target_failed_weeks:      u32,
    pub coh_warnings:             u32,
    pub pending_weeks:            u32,
}

pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Reduce `weeks` to summary counters as of the given elapsed week.
    pub fn summarize(weeks: &[Week], as_of_week: WeekNumber) -> SummaryMetrics {
        let mut metrics = SummaryMetrics::default();
        for week in weeks {
            metrics.coh_warnings += week.entries.violations.len() as u32;
            if week.week_number > as_of_week {
                continue;
            }
            let status = week.status();
            if status.is_passed() {
                metrics.weeks_passed += 1;
            }
            match status {
                WeekStatus::Pending => metrics.pending_weeks += 1,
                WeekStatus::Failed  => metrics.target_failed_weeks += 1,
                WeekStatus::Perfect => metrics.target_100_percent_weeks += 1,
                WeekStatus::Passed  => {}
            }
        }
        metrics
    }
}
