//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::models::Role;

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on, overriding `server.bind`
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Database maintenance commands.
#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Create the database and apply migrations
    Init,

    /// Show record counts and schema version
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Account commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create an account
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Login email
        #[arg(short, long)]
        email: String,

        /// Password (at least 8 characters)
        #[arg(short, long)]
        password: String,

        /// Account role
        #[arg(short, long, value_enum, default_value = "admin")]
        role: RoleArg,

        /// Contact number
        #[arg(long)]
        phone: Option<String>,
    },
}

/// Seed command arguments.
#[derive(Debug, Args)]
pub struct SeedCommand {
    /// JSON file with destination records
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Id of the user to assign as PIC of every imported destination
    #[arg(long, value_name = "USER_ID")]
    pub pic: i64,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration, with secrets masked
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Role argument for account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Manages their own destinations
    Admin,
    /// Manages everything
    Superadmin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Admin => Self::Admin,
            RoleArg::Superadmin => Self::Superadmin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(Role::from(RoleArg::Admin), Role::Admin);
        assert_eq!(Role::from(RoleArg::Superadmin), Role::Superadmin);
    }

    #[test]
    fn test_user_command_debug() {
        let cmd = UserCommand::Create {
            name: "Budi".to_string(),
            email: "budi@example.com".to_string(),
            password: "rahasia123".to_string(),
            role: RoleArg::Admin,
            phone: None,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Create"));
        assert!(debug_str.contains("budi@example.com"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
