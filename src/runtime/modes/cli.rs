//! CLI mode
//!
//! 维护命令（生成配置、提升管理员、重置密码），委托给 interfaces::cli。

use crate::cli::Commands;
use crate::interfaces::cli::CliError;

pub async fn run_cli(command: Commands) -> Result<(), CliError> {
    crate::interfaces::cli::run_cli_command(command).await
}
