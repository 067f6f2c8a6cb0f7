//! Weekly cycle and promotion evaluation engine for an agent onboarding program.
//!
//! Module map:
//!   model            agents, reference data, conditions, weeks
//!   store            the record-store trait and its SQLite implementation
//!   week_generator   creates missing elapsed weeks
//!   metrics          summary counters over a week history
//!   promotion        per-rank condition evaluation
//!   batch            sequential, paced, failure-isolating executor
//!   engine           the operations callers use

pub mod batch;
pub mod clock;
pub mod config;
pub mod demo;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod model;
pub mod promotion;
pub mod rng;
pub mod store;
pub mod types;
pub mod week_generator;
