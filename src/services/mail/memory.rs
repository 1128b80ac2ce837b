use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Email, Mailer};
use crate::errors::{BookhavenError, Result};

/// 内存发件箱，供测试断言
#[derive(Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<Email>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次发送都失败的实例
    pub fn failing() -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn outbox(&self) -> Vec<Email> {
        self.outbox.lock().clone()
    }

    /// 发给指定地址的邮件
    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.outbox
            .lock()
            .iter()
            .filter(|e| e.to == address)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.outbox.lock().clear();
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<()> {
        if self.fail {
            return Err(BookhavenError::mail("memory mailer configured to fail"));
        }
        self.outbox.lock().push(email);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> Email {
        Email {
            to: to.to_string(),
            subject: "Hello".to_string(),
            body: "Body".to_string(),
        }
    }

    #[tokio::test]
    async fn test_outbox_records_messages() {
        let mailer = MemoryMailer::new();
        mailer.send(email("a@example.com")).await.unwrap();
        mailer.send(email("b@example.com")).await.unwrap();

        assert_eq!(mailer.outbox().len(), 2);
        assert_eq!(mailer.sent_to("b@example.com").len(), 1);

        mailer.clear();
        assert!(mailer.outbox().is_empty());
    }

    #[tokio::test]
    async fn test_failing_mailer() {
        let mailer = MemoryMailer::failing();
        assert!(mailer.send(email("a@example.com")).await.is_err());
        assert!(mailer.outbox().is_empty());
    }
}
