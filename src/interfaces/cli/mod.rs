//! CLI interface module
//!
//! 维护命令：生成示例配置、提升管理员、重置用户密码。

pub mod commands;

use crate::cli::{Commands, ConfigCommands, UserCommands};
use crate::services::AppServices;
use crate::storage::StorageFactory;
use commands::{config_generate, promote_user, reset_user_password};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    InputError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::InputError(msg) => format!("Input error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::InputError(msg) => {
                format!("{} {}", "Input error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::BookhavenError> for CliError {
    fn from(err: crate::errors::BookhavenError) -> Self {
        use crate::errors::BookhavenError;
        match err {
            BookhavenError::DatabaseConfig(_)
            | BookhavenError::DatabaseConnection(_)
            | BookhavenError::DatabaseOperation(_) => CliError::StorageError(err.to_string()),
            BookhavenError::Validation(_) => CliError::InputError(err.to_string()),
            _ => CliError::CommandError(err.to_string()),
        }
    }
}

async fn open_services() -> Result<AppServices, CliError> {
    let storage = StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))?;
    Ok(AppServices::from_config(storage)?)
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        // 不需要数据库
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => config_generate(output_path, force).await,

        Commands::User { action } => {
            let services = open_services().await?;
            match action {
                UserCommands::Promote { email } => promote_user(&services, &email).await,
                UserCommands::ResetPassword {
                    email,
                    password,
                    stdin,
                } => reset_user_password(&services, &email, password, stdin).await,
            }
        }

        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by the server mode".to_string(),
        )),
    }
}
