//! `aclsync refresh` - read share ACLs from the cluster into the state file

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use declarative::Collection;
use rayon::prelude::*;

use crate::Context;
use crate::acl::AclEntry;
use crate::config::ShareConfig;
use crate::engine::{self, Clients};
use crate::progress;
use crate::state::AclState;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, jobs: usize) -> Result<()> {
    let config = super::load_config(ctx)?;
    let state_path = ctx.state_path()?;
    let mut state = AclState::load(&state_path)?;
    let shares = super::select_shares(&config, target)?;

    let clients = engine::clients_for(&config, &shares);
    let pool = engine::thread_pool(jobs)?;
    let pb = progress::bar(shares.len() as u64, "Reading", ctx.quiet);

    let results: Vec<(String, Result<Collection<AclEntry>>)> = pool.install(|| {
        shares
            .par_iter()
            .map(|share| {
                pb.set_message(share.id());
                let result = read_share(&clients, share);
                pb.inc(1);
                (share.id(), result)
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut failed = 0;
    let mut recorded = 0;
    for (id, result) in results {
        match result {
            Ok(acls) => {
                println!(
                    "  {} {} {}",
                    "✓".green(),
                    id,
                    format!("[{}]", ui::plural(acls.len(), "entry")).dimmed()
                );
                state.mark_refreshed(&id, acls);
                recorded += 1;
            }
            Err(e) => {
                failed += 1;
                ui::error(&format!("{id}: {e:#}"));
            }
        }
    }

    if target.is_none() {
        let declared: Vec<String> = shares.iter().map(|s| s.id()).collect();
        for id in state.prune(&declared) {
            ui::info(&format!("Forgot {id}, no longer declared"));
        }
    }

    state.touch(&state_path)?;
    ui::success(&format!(
        "Recorded {} in {}",
        ui::plural(recorded, "share"),
        state_path.display()
    ));

    if failed > 0 {
        bail!("Could not read {}", ui::plural(failed, "share"));
    }
    Ok(())
}

fn read_share(clients: &Clients, share: &ShareConfig) -> Result<Collection<AclEntry>> {
    let gateway = engine::connect(clients, share)?;
    let acls = gateway
        .fetch()
        .with_context(|| format!("Could not read ACL of {}", share.id()))?;
    log::debug!("{}: read {} entries", share.id(), acls.len());
    Ok(acls)
}
