//! Command-line interface for destinasi.
//!
//! This module provides the CLI structure for the `destinasi` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, DbCommand, RoleArg, SeedCommand, ServeCommand, UserCommand};

use crate::logging::Verbosity;

/// destinasi - Tourism destination catalog
///
/// Serves the public destination catalog and the admin API, and manages
/// the database behind them.
#[derive(Debug, Parser)]
#[command(name = "destinasi")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Manage the database
    #[command(subcommand)]
    Db(DbCommand),

    /// Manage accounts
    #[command(subcommand)]
    User(UserCommand),

    /// Import destinations from a JSON file
    Seed(SeedCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn cli_with(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            command: Command::Serve(ServeCommand { bind: None }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "destinasi");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(cli_with(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(cli_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(cli_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(cli_with(3, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["destinasi", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Command::Serve(serve) => assert_eq!(serve.bind.as_deref(), Some("0.0.0.0:9000")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_db_stats() {
        let cli = Cli::try_parse_from(["destinasi", "db", "stats", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Db(DbCommand::Stats { json: true })));
    }

    #[test]
    fn test_parse_user_create() {
        let cli = Cli::try_parse_from([
            "destinasi",
            "user",
            "create",
            "--name",
            "Root",
            "--email",
            "root@example.com",
            "--password",
            "rahasia123",
            "--role",
            "superadmin",
        ])
        .unwrap();
        match cli.command {
            Command::User(UserCommand::Create { role, phone, .. }) => {
                assert_eq!(role, RoleArg::Superadmin);
                assert!(phone.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_user_create_defaults_to_admin() {
        let cli = Cli::try_parse_from([
            "destinasi", "user", "create", "-n", "A", "-e", "a@example.com", "-p", "rahasia123",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::User(UserCommand::Create {
                role: RoleArg::Admin,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_seed_requires_pic() {
        assert!(Cli::try_parse_from(["destinasi", "seed", "data.json"]).is_err());
        let cli = Cli::try_parse_from(["destinasi", "seed", "data.json", "--pic", "1"]).unwrap();
        match cli.command {
            Command::Seed(seed) => {
                assert_eq!(seed.file, PathBuf::from("data.json"));
                assert_eq!(seed.pic, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["destinasi", "-c", "/custom/config.toml", "config", "path"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["destinasi", "db", "init", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = Cli::try_parse_from(["destinasi", "db", "init", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
