//! Engine clock: the single source of "today".
//!
//! RULE: Nothing in the engine reads the wall clock directly.
//! Week numbering and promotion windows are computed from the
//! date this clock returns, so tests pin it with `Fixed`.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "date", rename_all = "snake_case")]
pub enum EngineClock {
    /// Local calendar date of the host.
    System,
    /// A pinned date (tests, replays, the runner's `--today`).
    Fixed(NaiveDate),
}

impl EngineClock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Self::System       => Local::now().date_naive(),
            Self::Fixed(date)  => *date,
        }
    }
}

impl Default for EngineClock {
    fn default() -> Self { Self::System }
}
