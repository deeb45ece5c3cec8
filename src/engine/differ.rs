//! Plan display - aclsync-specific UI

use colored::Colorize;
use declarative::{Collection, DeleteReason, Entry, Operation, PlanSummary};

use super::planner::{BaselineSource, PlanSet};
use crate::acl::AclEntry;
use crate::ui;

/// Display every share's plan in a user-friendly format
pub fn display_plans(set: &PlanSet) {
    if set.shares.is_empty() && set.failures.is_empty() {
        println!();
        println!("  {} No shares selected", "ℹ".blue());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Share ACL Plan".bold()
    );
    println!("│");

    let mut total = PlanSummary::default();
    for share in &set.shares {
        let origin = match share.source {
            BaselineSource::Recorded => String::new(),
            BaselineSource::Remote => " (baseline read from cluster)".dimmed().to_string(),
        };
        println!("│ {}{}", share.id.bold(), origin);

        match &share.plan {
            Err(e) => println!("│   {} {}", "✗".red(), e.to_string().red()),
            Ok(plan) if plan.is_empty() => println!("│   {} {}", "✓".green(), "in sync".dimmed()),
            Ok(plan) => {
                total.merge(&plan.summary());
                for op in plan.operations() {
                    println!("│   {}", format_operation(op, &share.baseline));
                }
            }
        }
        println!("│");
    }

    for failure in &set.failures {
        println!("│ {}", failure.id.bold());
        println!("│   {} {}", "✗".red(), failure.error.red());
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} ({} create, {} update, {} delete, {} default suppressed)",
        ui::plural(total.total(), "change").bold(),
        total.creates.to_string().green(),
        total.updates.to_string().yellow(),
        total.removals.to_string().red(),
        total.suppressed_defaults.to_string().dimmed()
    );
    if set.has_errors() {
        println!(
            "│ {} {} could not be planned",
            "⚠".yellow(),
            ui::plural(set.failures.len() + set.invalid(), "share")
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}

/// One plan line: symbol, key, permission change
pub fn format_operation(op: &Operation<AclEntry>, baseline: &Collection<AclEntry>) -> String {
    match op {
        Operation::Create(entry) => format!(
            "{} {:<40} {}",
            "+".green(),
            entry.key().to_string(),
            entry.permission.to_string().dimmed()
        ),
        Operation::Update { key, from, to } => format!(
            "{} {:<40} {}",
            "~".yellow(),
            key.to_string(),
            format!("{from} → {to}").dimmed()
        ),
        Operation::Delete {
            key,
            reason: DeleteReason::Removed,
        } => {
            let was = baseline
                .get(key)
                .map(|entry| format!("(was {})", entry.permission))
                .unwrap_or_default();
            format!("{} {:<40} {}", "-".red(), key.to_string(), was.dimmed())
        }
        Operation::Delete {
            key,
            reason: DeleteReason::SuppressDefault,
        } => format!(
            "{} {:<40} {}",
            "-".dimmed(),
            key.to_string(),
            "(remote default)".dimmed()
        ),
    }
}
