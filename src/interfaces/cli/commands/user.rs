//! 用户维护命令

use std::io::{self, BufRead, IsTerminal, Write};

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::services::AppServices;

/// 从不同来源获取密码
fn get_password(password: Option<String>, stdin: bool) -> Result<String, CliError> {
    if stdin {
        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| CliError::InputError(format!("Failed to read from stdin: {}", e)))?;
        Ok(line.trim().to_string())
    } else if let Some(pwd) = password {
        Ok(pwd)
    } else {
        prompt_password_with_confirm()
    }
}

/// 交互式输入密码（带确认）
fn prompt_password_with_confirm() -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::InputError(
            "No password provided. Use --password or --stdin flag, or run interactively."
                .to_string(),
        ));
    }

    let read = |prompt: &str| -> Result<String, CliError> {
        print!("{}", prompt);
        io::stdout()
            .flush()
            .map_err(|e| CliError::InputError(e.to_string()))?;
        rpassword::read_password()
            .map_err(|e| CliError::InputError(format!("Failed to read password: {}", e)))
    };

    let password = read("Enter new password: ")?;
    let confirm = read("Confirm password: ")?;

    if password != confirm {
        return Err(CliError::InputError("Passwords do not match".to_string()));
    }

    Ok(password)
}

pub async fn promote_user(services: &AppServices, email: &str) -> Result<(), CliError> {
    let user = services.auth.promote_user(email).await?;
    println!(
        "{} {} ({}) is now an administrator",
        "✓".green().bold(),
        user.name.cyan(),
        user.email
    );
    Ok(())
}

/// 密码规则由 AuthService 校验
pub async fn reset_user_password(
    services: &AppServices,
    email: &str,
    password: Option<String>,
    stdin: bool,
) -> Result<(), CliError> {
    let new_password = get_password(password, stdin)?;
    let user = services
        .auth
        .set_password_by_email(email, &new_password)
        .await?;
    println!(
        "{} Password reset for {}",
        "✓".green().bold(),
        user.email.cyan()
    );
    Ok(())
}
