//! Decision engine, pattern/intelligence layer and agent memory subsystem
//! for the project orchestration service (`SPEC_FULL.md`).
//!
//! This crate has no HTTP surface of its own — `orchestrator-server` wires
//! it behind `axum`, and `orchestrator-storage` supplies the libsql-backed
//! [`memory::MemoryStore`] implementation used in production. Everything
//! here is backend-agnostic and exercised directly in unit/integration
//! tests via the in-memory implementations under [`memory::in_memory`] and
//! [`collaborators::fakes`].

pub mod advisor;
pub mod analyzer;
pub mod auditor;
pub mod backfill;
pub mod collaborators;
pub mod config;
pub mod cron;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod events;
pub mod evolution;
pub mod gate;
pub mod memory;
pub mod metrics;
pub mod modifier;
pub mod pattern_engine;
pub mod planner;
pub mod project_lock;
pub mod types;

pub use config::ConfigSnapshot;
pub use engine::{EnhancedDecisionEngine, OrchestrationOutcome};
pub use error::{Error, Result};
