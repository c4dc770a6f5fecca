//! call-ring: operator CLI for call ring locks.
//!
//! Works against the same files call-core hosts use on this machine.
//!
//! ## Subcommands
//!
//! - `acquire`: attempt the ring lock for a caller
//! - `release`: drop the ring lock for a caller
//! - `status`: show who holds the lock and how old it is
//! - `config`: show or edit the provider configuration

mod config_cmd;
mod logging;
mod ring;

use std::path::PathBuf;

use call_core::{load_provider_config, CallError, StorageConfig};
use clap::{Parser, Subcommand};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] CallError),
}

#[derive(Parser)]
#[command(name = "call-ring")]
#[command(about = "Call ring-lock inspector")]
#[command(version)]
struct Cli {
    /// Storage root (defaults to ~/.call-ring)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Try to take the ring lock for a caller; prints "ring" or "suppress"
    Acquire {
        #[arg(value_name = "CALLER_ID")]
        caller_id: String,

        /// Millisecond timestamp to use instead of the system clock
        #[arg(long)]
        now: Option<i64>,
    },

    /// Release the ring lock for a caller
    Release {
        #[arg(value_name = "CALLER_ID")]
        caller_id: String,
    },

    /// Show the ring lock entry for a caller
    Status {
        #[arg(value_name = "CALLER_ID")]
        caller_id: String,

        #[arg(long)]
        now: Option<i64>,
    },

    /// Provider configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current provider configuration
    Show,

    /// Turn verbose call-core logging on or off
    SetLogEnabled {
        #[arg(action = clap::ArgAction::Set, value_name = "BOOL")]
        enabled: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let storage = match cli.root {
        Some(root) => StorageConfig::with_root(root),
        None => match StorageConfig::new() {
            Ok(storage) => storage,
            Err(e) => {
                eprintln!("call-ring: {e}");
                std::process::exit(1);
            }
        },
    };

    let provider = load_provider_config(&storage);
    let _logging_guard = logging::init(&storage, provider.log_enabled);

    if let Err(e) = run(&storage, cli.command) {
        tracing::error!(error = %e, "call-ring failed");
        eprintln!("call-ring: {e}");
        std::process::exit(1);
    }
}

fn run(storage: &StorageConfig, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Acquire { caller_id, now } => {
            println!("{}", ring::acquire(storage, &caller_id, now)?);
        }
        Commands::Release { caller_id } => {
            ring::release(storage, &caller_id)?;
            println!("released");
        }
        Commands::Status { caller_id, now } => {
            println!("{}", ring::status(storage, &caller_id, now)?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = config_cmd::show(storage);
                println!("logEnabled: {}", config.log_enabled);
            }
            ConfigAction::SetLogEnabled { enabled } => {
                let config = config_cmd::set_log_enabled(storage, enabled)?;
                println!("logEnabled: {}", config.log_enabled);
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_set_log_enabled() {
        let cli = Cli::try_parse_from(["call-ring", "config", "set-log-enabled", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::SetLogEnabled { enabled: true }
            }
        ));
    }

    #[test]
    fn test_parses_acquire_with_clock_override() {
        let cli =
            Cli::try_parse_from(["call-ring", "--root", "/tmp/x", "acquire", "alice", "--now", "42"])
                .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(
            cli.command,
            Commands::Acquire { ref caller_id, now: Some(42) } if caller_id == "alice"
        ));
    }
}
