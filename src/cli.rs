use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aclsync")]
#[command(version)]
#[command(about = "Declarative CIFS share ACLs for ONTAP clusters", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file [default: ~/.config/aclsync/config.toml]
    #[arg(long, env = "ACLSYNC_CONFIG", global = true)]
    pub config: Option<String>,

    /// State file [default: ~/.local/state/aclsync/state.toml]
    #[arg(long, global = true)]
    pub state: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the changes apply would make
    Plan(TargetArgs),

    /// Make share ACLs match the config
    Apply(ApplyArgs),

    /// Show recorded state of each share
    Status(TargetArgs),

    /// Read share ACLs from the cluster into the state file
    Refresh(RefreshArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Parser)]
pub struct TargetArgs {
    /// Limit to shares matching svm/share, svm/ or share
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Limit to shares matching svm/share, svm/ or share
    pub target: Option<String>,

    /// Show what would change without calling the cluster
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of shares reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Re-read each share's ACL after applying
    #[arg(long)]
    pub refresh: bool,
}

#[derive(Parser)]
pub struct RefreshArgs {
    /// Limit to shares matching svm/share, svm/ or share
    pub target: Option<String>,

    /// Number of shares read in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "aclsync", "-vv", "apply", "svm1/eng", "--dry-run", "--jobs", "2", "--refresh",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.target.as_deref(), Some("svm1/eng"));
                assert!(args.dry_run);
                assert!(!args.yes);
                assert_eq!(args.jobs, 2);
                assert!(args.refresh);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_global_paths_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aclsync",
            "status",
            "--config",
            "/tmp/aclsync.toml",
            "--state",
            "/tmp/state.toml",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/aclsync.toml"));
        assert_eq!(cli.state.as_deref(), Some("/tmp/state.toml"));
        assert!(matches!(cli.command, Command::Status(TargetArgs { target: None })));
    }
}
