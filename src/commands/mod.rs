//! Subcommand implementations
//!
//! - `plan` - Show what apply would change
//! - `apply` - Make share ACLs match the config
//! - `status` - Show recorded state per share
//! - `refresh` - Read share ACLs from the cluster into the state file

pub mod apply;
pub mod plan;
pub mod refresh;
pub mod status;

use anyhow::{Result, bail};

use crate::Context;
use crate::config::{Config, ShareConfig};
use crate::state::AclState;

/// Load the config file named by the context
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let path = ctx.config_path()?;
    Config::load(&path)
}

/// Load the state file named by the context
pub(crate) fn load_state(ctx: &Context) -> Result<AclState> {
    let path = ctx.state_path()?;
    AclState::load(&path)
}

/// Shares matching a target, failing when the target matches nothing
pub(crate) fn select_shares<'a>(
    config: &'a Config,
    target: Option<&str>,
) -> Result<Vec<&'a ShareConfig>> {
    let shares = config.select(target);
    match (target, shares.is_empty()) {
        (Some(target), true) => bail!("No declared share matches '{target}'"),
        _ => Ok(shares),
    }
}
