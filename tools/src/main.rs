//! cohort-runner: operational entry point for the cohort engine.
//!
//! Usage:
//!   cohort-runner generate-weeks --db cohort.db [--today 2024-06-01] [--events]
//!   cohort-runner summary --db cohort.db --agent AGENT_ID
//!   cohort-runner summary --db cohort.db [--rank RANK_ID]   (every started agent)
//!   cohort-runner evaluate --db cohort.db --agent AGENT_ID [--rank RANK_ID]
//!   cohort-runner promote --db cohort.db --agent AGENT_ID
//!   cohort-runner import-conditions --db cohort.db --file conditions.json
//!   cohort-runner seed-demo --db cohort.db --seed 42 --agents 24
//!   cohort-runner demo --seed 42                 (seed + generate, in memory)
//!
//! `generate-weeks` and `demo` exit with status 1 when any agent failed.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use cohort_core::{
    clock::EngineClock,
    config::EngineConfig,
    demo::seed_demo_cohort,
    engine::{BatchSummary, CohortEngine, PromotionDecision, RunReport},
    model::PromotionConditionDraft,
    store::{AgentFilter, RecordStore, SqliteStore},
};
use std::env;
use std::path::Path;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");
    let seed = parse_arg(&args, "--seed", 42u64)?;
    let agent_count = parse_arg(&args, "--agents", 24usize)?;
    let show_events = args.iter().any(|a| a == "--events");
    let today = flag_value(&args, "--today")
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--today must be YYYY-MM-DD")?;

    if matches!(command, "help" | "--help" | "-h") {
        print_usage();
        return Ok(ExitCode::SUCCESS);
    }

    let config_path = format!("{data_dir}/engine_config.json");
    let config = if Path::new(&config_path).exists() {
        EngineConfig::load(data_dir)?
    } else {
        log::warn!("{config_path} not found, using defaults");
        EngineConfig::default()
    };
    let clock = today.map(EngineClock::Fixed).unwrap_or(EngineClock::System);

    let store = SqliteStore::open(db)?;
    store.migrate()?;
    let engine = CohortEngine::new(store, config, clock)?;

    match command {
        "generate-weeks" => {
            let report = engine.generate_missing_weeks_for_all_agents()?;
            print_report(&report, show_events)?;
            Ok(exit_for(&report.summary))
        }
        "summary" => {
            let agent_ids = match flag_value(&args, "--agent") {
                Some(agent_id) => vec![agent_id.to_string()],
                None => {
                    let filter = AgentFilter {
                        rank_id:              flag_value(&args, "--rank").map(str::to_string),
                        with_start_date_only: true,
                    };
                    engine
                        .store()
                        .list_agents(engine.context(), &filter)?
                        .into_iter()
                        .map(|a| a.agent_id)
                        .collect()
                }
            };
            for agent_id in &agent_ids {
                print_summary(&engine, agent_id)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        "evaluate" => {
            let agent_id = required(&args, "--agent")?;
            if let Some(rank_id) = flag_value(&args, "--rank") {
                let result = engine.evaluate_promotion_for_rank(agent_id, rank_id)?;
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(ExitCode::SUCCESS);
            }
            match engine.evaluate_promotion(agent_id)? {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => println!("{agent_id} already holds the highest rank"),
            }
            Ok(ExitCode::SUCCESS)
        }
        "promote" => {
            let agent_id = required(&args, "--agent")?;
            let decision = engine.apply_promotion(agent_id)?;
            match &decision {
                PromotionDecision::Promoted { to_rank, .. } => println!("promoted to {to_rank}"),
                PromotionDecision::NotEligible { .. }       => println!("not eligible"),
                PromotionDecision::TenureNotMet { .. }      => println!("eligible, tenure not met"),
                PromotionDecision::ManualReview { .. }      => println!("eligible, manual review required"),
                PromotionDecision::AtTopRank                => println!("already at the highest rank"),
            }
            if show_events {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        "import-conditions" => {
            let path = required(&args, "--file")?;
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read {path}"))?;
            let drafts: Vec<PromotionConditionDraft> = serde_json::from_str(&content)?;
            let report = engine.create_promotion_conditions(&drafts)?;
            println!("=== CONDITION IMPORT ===");
            println!("  total:   {}", report.total);
            println!("  created: {}", report.created.len());
            println!("  errors:  {}", report.errors);
            if show_events {
                for event in &report.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            }
            Ok(if report.errors > 0 || report.cancelled { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        "seed-demo" => {
            seed_demo(&engine, seed, agent_count)?;
            Ok(ExitCode::SUCCESS)
        }
        "demo" => {
            seed_demo(&engine, seed, agent_count)?;
            let report = engine.generate_missing_weeks_for_all_agents()?;
            print_report(&report, show_events)?;
            print_cohort(&engine)?;
            Ok(exit_for(&report.summary))
        }
        other => bail!("unknown command '{other}' (try `cohort-runner help`)"),
    }
}

fn seed_demo(engine: &CohortEngine<SqliteStore>, seed: u64, agent_count: usize) -> Result<()> {
    let cohort = seed_demo_cohort(
        engine.store(),
        engine.context(),
        seed,
        engine.today(),
        agent_count,
        engine.config().program_length_weeks,
    )?;
    println!("Cohort engine: demo data");
    println!("  seed:      {seed}");
    println!("  today:     {}", engine.today());
    println!("  agents:    {}", cohort.agent_ids.len());
    println!("  weeks:     {}", cohort.weeks_recorded);
    println!();
    Ok(())
}

fn print_summary(engine: &CohortEngine<SqliteStore>, agent_id: &str) -> Result<()> {
    let metrics = engine.get_summary_metrics(agent_id)?;
    println!("=== SUMMARY {agent_id} ===");
    println!("  weeks passed:      {}", metrics.weeks_passed);
    println!("  100% weeks:        {}", metrics.target_100_percent_weeks);
    println!("  failed weeks:      {}", metrics.target_failed_weeks);
    println!("  pending weeks:     {}", metrics.pending_weeks);
    println!("  coh warnings:      {}", metrics.coh_warnings);
    Ok(())
}

fn print_report(report: &RunReport, show_events: bool) -> Result<()> {
    let s = &report.summary;
    println!("=== WEEK GENERATION ===");
    println!("  agents processed:        {}", s.total_agents);
    println!("  already complete:        {}", s.agents_with_complete_weeks);
    println!("  missing start date:      {}", s.agents_without_start_date);
    println!("  weeks generated for:     {}", s.agents_with_generated_weeks);
    println!("  weeks generated:         {}", s.weeks_generated);
    println!("  errors:                  {}", s.errors);
    if s.cancelled {
        println!("  (run cancelled before all agents were processed)");
    }
    if show_events {
        for event in &report.events {
            println!("{}", serde_json::to_string(event)?);
        }
    }
    Ok(())
}

fn print_cohort(engine: &CohortEngine<SqliteStore>) -> Result<()> {
    println!();
    println!("=== COHORT ===");
    let agents = engine
        .store()
        .list_agents(engine.context(), &AgentFilter::default())?;
    for agent in agents {
        let metrics = engine.get_summary_metrics(&agent.agent_id)?;
        let eligible = match engine.evaluate_promotion(&agent.agent_id)? {
            Some(result) if result.eligible => "eligible",
            Some(_) => "-",
            None => "top rank",
        };
        let start = agent
            .starting_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "(none)".into());
        println!(
            "  {:<20} start {:<10} | passed {:>2} | 100% {:>2} | failed {:>2} | coh {} | {eligible}",
            agent.name,
            start,
            metrics.weeks_passed,
            metrics.target_100_percent_weeks,
            metrics.target_failed_weeks,
            metrics.coh_warnings,
        );
    }
    Ok(())
}

fn exit_for(summary: &BatchSummary) -> ExitCode {
    if summary.is_success() {
        return ExitCode::SUCCESS;
    }
    if summary.cancelled {
        log::error!("week generation cancelled after {} agent(s)", summary.total_agents);
    }
    if summary.errors > 0 {
        log::error!("{} agent(s) failed during week generation", summary.errors);
    }
    ExitCode::FAILURE
}

fn print_usage() {
    println!("cohort-runner <command> [flags]");
    println!();
    println!("commands: generate-weeks | summary | evaluate | promote | import-conditions | seed-demo | demo");
    println!("flags:    --db PATH  --data-dir DIR  --today YYYY-MM-DD  --agent ID  --rank ID  --file PATH");
    println!("          --seed N  --agents N  --events");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn required<'a>(args: &'a [String], flag: &str) -> Result<&'a str> {
    flag_value(args, flag).with_context(|| format!("{flag} is required for this command"))
}

/// `default` when the flag is absent; an error when its value does not parse.
fn parse_arg<T>(args: &[String], flag: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = flag_value(args, flag)
        .map(str::parse::<T>)
        .transpose()
        .with_context(|| format!("{flag} must be a non-negative integer"))?;
    Ok(value.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_arg_defaults_when_flag_is_absent() {
        let args = args(&["cohort-runner", "demo"]);
        assert_eq!(parse_arg(&args, "--seed", 42u64).unwrap(), 42);
    }

    #[test]
    fn parse_arg_reads_a_valid_value() {
        let args = args(&["cohort-runner", "demo", "--agents", "8"]);
        assert_eq!(parse_arg(&args, "--agents", 24usize).unwrap(), 8);
    }

    #[test]
    fn parse_arg_rejects_a_malformed_value() {
        let args = args(&["cohort-runner", "demo", "--seed", "forty-two"]);
        let err = parse_arg(&args, "--seed", 42u64).unwrap_err();
        assert!(err.to_string().contains("--seed"), "got {err:#}");
    }
}
