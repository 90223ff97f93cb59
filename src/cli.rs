//! Command-line surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "azure-pip-migration")]
#[command(about = "Migrate Basic SKU public IPs to Standard with a zero-downtime dual-address overlap", long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration document
    #[arg(short, long, default_value = "pip_migration.json", env = "PIP_MIGRATION_CONFIG")]
    pub config: PathBuf,

    /// Log intended actions without touching the provider or the inventory
    #[arg(long)]
    pub dry_run: bool,

    /// Override the configured batch size for this invocation
    #[arg(long)]
    pub batch_size: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan subscriptions and build the migration inventory
    Discovery,
    /// Allocate Standard SKU replacement addresses for pending records
    Create,
    /// Probe replacement addresses for reachability
    Validate,
    /// Delete legacy addresses once their soak period has elapsed
    Cleanup {
        /// Confirm that legacy addresses may actually be deleted
        #[arg(long)]
        confirm: bool,
    },
    /// Print a summary of the latest inventory snapshot
    Report,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cleanup_confirm_flag() {
        let cli = Cli::parse_from(["azure-pip-migration", "cleanup", "--confirm"]);
        match cli.command {
            Commands::Cleanup { confirm } => assert!(confirm),
            _ => panic!("expected cleanup"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "azure-pip-migration",
            "--dry-run",
            "--batch-size",
            "3",
            "create",
        ]);
        assert!(cli.dry_run);
        assert_eq!(cli.batch_size, Some(3));
        assert!(matches!(cli.command, Commands::Create));
    }
}
