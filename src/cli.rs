//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// BookHaven - online bookstore backend
#[derive(Parser)]
#[command(name = "bookhaven")]
#[command(version)]
#[command(about = "Online bookstore backend service", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

/// User management commands
#[derive(Subcommand)]
pub enum UserCommands {
    /// Grant the admin role to an existing account
    Promote {
        /// Account email
        email: String,
    },

    /// Set a new password for an account
    ResetPassword {
        /// Account email
        email: String,

        /// New password (if not provided, will prompt interactively)
        #[arg(long)]
        password: Option<String>,

        /// Read password from stdin (for scripting)
        #[arg(long)]
        stdin: bool,
    },
}
