//! 通过 HTTP API 投递（事务邮件服务）
//!
//! POST JSON `{from, to, subject, text}`，`Authorization: Bearer <api_key>`

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use ureq::Agent;

use super::{Email, Mailer};
use crate::errors::{BookhavenError, Result};

#[derive(Serialize)]
struct SendPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

pub struct HttpMailer {
    agent: Agent,
    endpoint: String,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, api_key: Option<String>, from: &str, timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
            .build()
            .into();
        Self {
            agent,
            endpoint: endpoint.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            from: from.to_string(),
        }
    }

    /// 同步发送，在 spawn_blocking 中调用
    fn send_sync(
        agent: &Agent,
        endpoint: &str,
        api_key: Option<&str>,
        from: &str,
        email: &Email,
    ) -> Result<()> {
        let payload = SendPayload {
            from,
            to: &email.to,
            subject: &email.subject,
            text: &email.body,
        };

        let mut request = agent.post(endpoint);
        if let Some(key) = api_key {
            request = request.header("Authorization", &format!("Bearer {}", key));
        }

        request
            .send_json(&payload)
            .map_err(|e| BookhavenError::mail(format!("Mail API request failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<()> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let from = self.from.clone();

        debug!("Sending email to {} via {}", email.to, endpoint);
        tokio::task::spawn_blocking(move || {
            Self::send_sync(&agent, &endpoint, api_key.as_deref(), &from, &email)
        })
        .await
        .map_err(|e| BookhavenError::mail(format!("Mail task panicked: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
