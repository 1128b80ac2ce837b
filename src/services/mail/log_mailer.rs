use async_trait::async_trait;
use tracing::info;

use super::{Email, Mailer};
use crate::errors::Result;

/// 只写日志，不真正发送（开发环境默认）
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            "Outgoing email\n{}",
            email.body
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
