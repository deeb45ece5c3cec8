//! Execution engine for aclsync
//!
//! The engine orchestrates:
//! 1. Planning - Pick each share's baseline and diff it against the config
//! 2. Displaying - Render the plan per share
//! 3. Executing - Apply plans with one cycle per share, shares in parallel

pub mod differ;
pub mod executor;
pub mod planner;

use anyhow::{Context as AnyhowContext, Result};

pub use executor::{ExecuteOptions, ExecuteResult, execute};
pub use planner::{Clients, PlanSet, clients_for, connect, plan_shares};

/// Bounded pool for per-share work
pub(crate) fn thread_pool(jobs: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create share thread pool")
}
