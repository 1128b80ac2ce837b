//! 邮件通知
//!
//! `Mailer` 负责投递，`Notifier` 负责拼装具体的通知内容。
//! 投递失败只记录日志，不影响发起请求的业务流程。

mod http;
mod log_mailer;
mod memory;
mod notifier;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::MailConfig;
use crate::errors::{BookhavenError, Result};

pub use http::HttpMailer;
pub use log_mailer::LogMailer;
pub use memory::MemoryMailer;
pub use notifier::Notifier;

/// 一封纯文本邮件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// 根据配置创建 Mailer
pub fn create_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>> {
    match config.provider.as_str() {
        "log" => Ok(Arc::new(LogMailer::new(&config.from))),
        "memory" => Ok(Arc::new(MemoryMailer::new())),
        "http" => {
            let endpoint = config.endpoint.as_deref().filter(|e| !e.is_empty()).ok_or_else(|| {
                BookhavenError::validation("mail.endpoint is required for the http provider")
            })?;
            Ok(Arc::new(HttpMailer::new(
                endpoint,
                config.api_key.clone(),
                &config.from,
                config.timeout_secs,
            )))
        }
        other => Err(BookhavenError::validation(format!(
            "Unknown mail provider '{}'. Valid: log, http, memory",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mailer() {
        let mut config = MailConfig::default();
        assert_eq!(create_mailer(&config).unwrap().name(), "log");

        config.provider = "memory".into();
        assert_eq!(create_mailer(&config).unwrap().name(), "memory");

        config.provider = "http".into();
        assert!(create_mailer(&config).is_err());
        config.endpoint = Some("https://mail.example.com/send".into());
        assert_eq!(create_mailer(&config).unwrap().name(), "http");

        config.provider = "pigeon".into();
        assert!(create_mailer(&config).is_err());
    }
}
