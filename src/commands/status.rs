//! `aclsync status` - recorded state per share, without contacting clusters

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use declarative::{reconcile, Collection, Entry, PlanSummary, ReconcileError};

use crate::Context;
use crate::acl::{share_policy, AclEntry};
use crate::config::ShareConfig;
use crate::state::ShareState;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = super::load_config(ctx)?;
    let state = super::load_state(ctx)?;
    let shares = super::select_shares(&config, target)?;

    ui::header("Share ACL Status");
    if let Ok(path) = ctx.state_path() {
        ui::kv("State", &path.display().to_string());
    }
    println!();

    for share in &shares {
        show_share(share, state.share(&share.id()), ctx.verbose > 0);
    }

    if target.is_none() {
        let declared: Vec<String> = shares.iter().map(|s| s.id()).collect();
        let undeclared: Vec<&String> = state
            .shares
            .keys()
            .filter(|id| !declared.contains(id))
            .collect();
        if !undeclared.is_empty() {
            println!();
            ui::warn(&format!(
                "{} recorded but no longer declared: {}",
                ui::plural(undeclared.len(), "share"),
                undeclared
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            ui::dim("Run 'aclsync refresh' to forget them");
        }
    }

    Ok(())
}

fn show_share(share: &ShareConfig, recorded: Option<&ShareState>, verbose: bool) {
    let id = share.id();
    let Some(recorded) = recorded else {
        println!("  {} {} {}", "○".dimmed(), id, "(never applied)".dimmed());
        return;
    };

    let summary = match pending(&share.desired(), &recorded.acls) {
        Ok(summary) => summary,
        Err(e) => {
            println!("  {} {} {}", "✗".red(), id, e.to_string().red());
            return;
        }
    };

    let drift = summary.drift();
    let (icon, note) = if recorded.last_error.is_some() {
        ("✗".red(), "last apply failed".red().to_string())
    } else if drift > 0 {
        (
            "⚠".yellow(),
            format!("{} pending", ui::plural(drift, "change")).yellow().to_string(),
        )
    } else {
        ("✓".green(), "in sync".dimmed().to_string())
    };
    println!(
        "  {} {} {} {}",
        icon,
        id,
        format!("[{}]", ui::plural(recorded.acls.len(), "entry")).dimmed(),
        note
    );

    if let Some(error) = &recorded.last_error {
        ui::dim(&format!("  error: {error}"));
    }
    if summary.suppressed_defaults > 0 {
        ui::dim(&format!(
            "  {} to remove",
            ui::plural(summary.suppressed_defaults, "injected default")
        ));
    }
    ui::dim(&format!("  applied: {}", when(recorded.last_applied)));
    if recorded.last_refreshed.is_some() {
        ui::dim(&format!("  refreshed: {}", when(recorded.last_refreshed)));
    }

    if verbose {
        for entry in recorded.acls.sorted() {
            ui::dim(&format!("    {} {}", entry.key(), entry.permission));
        }
    }
}

/// Changes the next apply would make against the recorded ACL
fn pending(
    desired: &Collection<AclEntry>,
    recorded: &Collection<AclEntry>,
) -> Result<PlanSummary, ReconcileError> {
    Ok(reconcile(desired, recorded, &share_policy())?.summary())
}

fn when(timestamp: Option<DateTime<Utc>>) -> String {
    timestamp.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
