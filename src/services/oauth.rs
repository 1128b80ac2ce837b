//! OAuth 2.0 authorization-code flow
//!
//! - `OAuthStateStore`：一次性 state，带 TTL
//! - `OAuthExchange`：用 code 换取用户资料，HTTP 实现基于 ureq，测试中可替换

use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use serde_json::Value;
use tracing::debug;
use ureq::Agent;
use url::Url;

use crate::config::{OAuthConfig, OAuthProviderConfig};
use crate::errors::{BookhavenError, Result};
use crate::utils::generate_secure_token;

const USER_AGENT: &str = concat!("bookhaven/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// 第三方账号资料
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub subject: String,
    pub email: Option<String>,
    /// 只有已验证的邮箱才会用于关联现有账号
    pub email_verified: bool,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// 已配置的提供方（client_id 为空视为未启用）
pub fn provider_config<'a>(oauth: &'a OAuthConfig, provider: &str) -> Option<&'a OAuthProviderConfig> {
    let config = match provider {
        "google" => oauth.google.as_ref(),
        "github" => oauth.github.as_ref(),
        _ => None,
    }?;
    (!config.client_id.is_empty()).then_some(config)
}

/// 拼接授权地址
pub fn authorize_url(config: &OAuthProviderConfig, state: &str) -> Result<String> {
    let mut url = Url::parse(&config.auth_url)
        .map_err(|e| BookhavenError::oauth(format!("Invalid auth_url: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_url)
        .append_pair("response_type", "code")
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", state);
    Ok(url.into())
}

// ============ State store ============

/// state → provider
pub struct OAuthStateStore {
    states: Cache<String, String>,
}

impl OAuthStateStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            states: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(ttl_secs.max(1)))
                .build(),
        }
    }

    pub fn issue(&self, provider: &str) -> String {
        let state = generate_secure_token(24);
        self.states.insert(state.clone(), provider.to_string());
        state
    }

    /// 取出并作废；provider 不匹配同样视为无效
    pub fn consume(&self, state: &str, provider: &str) -> bool {
        self.states
            .remove(state)
            .is_some_and(|stored| stored == provider)
    }
}

// ============ Profile exchange ============

#[async_trait]
pub trait OAuthExchange: Send + Sync {
    async fn exchange(
        &self,
        provider: &str,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile>;
}

fn json_str(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 解析 userinfo 响应
///
/// Google/OIDC：sub、email、email_verified、name、picture
/// GitHub：id、email、name / login、avatar_url（GitHub 返回的 email 均已验证）
pub fn profile_from_userinfo(provider: &str, info: &Value) -> Result<OAuthProfile> {
    let subject = json_str(info, "sub")
        .or_else(|| json_str(info, "id"))
        .ok_or_else(|| BookhavenError::oauth("Provider response has no user id"))?;

    let email = json_str(info, "email").map(|e| e.to_lowercase());
    let email_verified = match provider {
        "github" => email.is_some(),
        _ => info
            .get("email_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };

    Ok(OAuthProfile {
        subject,
        email,
        email_verified,
        name: json_str(info, "name").or_else(|| json_str(info, "login")),
        avatar_url: json_str(info, "picture").or_else(|| json_str(info, "avatar_url")),
    })
}

/// GitHub `/user/emails`：取已验证的主邮箱
fn primary_verified_email(emails: &Value) -> Option<String> {
    emails
        .as_array()?
        .iter()
        .filter(|e| e.get("verified").and_then(Value::as_bool) == Some(true))
        .max_by_key(|e| e.get("primary").and_then(Value::as_bool) == Some(true))
        .and_then(|e| json_str(e, "email"))
        .map(|e| e.to_lowercase())
}

pub struct HttpOAuthExchange {
    agent: Agent,
}

impl HttpOAuthExchange {
    pub fn new(timeout_secs: u64) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout_secs.max(1))))
            .build()
            .into();
        Self { agent }
    }

    fn get_json(agent: &Agent, url: &str, access_token: &str) -> Result<Value> {
        agent
            .get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| BookhavenError::oauth(format!("GET {} failed: {}", url, e)))?
            .into_body()
            .read_json::<Value>()
            .map_err(|e| BookhavenError::oauth(format!("Invalid JSON from {}: {}", url, e)))
    }

    fn exchange_sync(
        agent: &Agent,
        provider: &str,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile> {
        let token: Value = agent
            .post(&config.token_url)
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send_form([
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("redirect_uri", config.redirect_url.as_str()),
            ])
            .map_err(|e| BookhavenError::oauth(format!("Token exchange failed: {}", e)))?
            .into_body()
            .read_json()
            .map_err(|e| BookhavenError::oauth(format!("Invalid token response: {}", e)))?;

        let access_token = json_str(&token, "access_token").ok_or_else(|| {
            let reason = json_str(&token, "error_description")
                .or_else(|| json_str(&token, "error"))
                .unwrap_or_else(|| "no access_token".to_string());
            BookhavenError::oauth(format!("Token exchange rejected: {}", reason))
        })?;

        let info = Self::get_json(agent, &config.userinfo_url, &access_token)?;
        let mut profile = profile_from_userinfo(provider, &info)?;

        // GitHub 用户可以隐藏公开邮箱
        if provider == "github" && profile.email.is_none() {
            let emails_url = format!("{}/emails", config.userinfo_url.trim_end_matches('/'));
            if let Ok(emails) = Self::get_json(agent, &emails_url, &access_token) {
                profile.email = primary_verified_email(&emails);
                profile.email_verified = profile.email.is_some();
            }
        }

        debug!("OAuth {} profile resolved: subject={}", provider, profile.subject);
        Ok(profile)
    }
}

#[async_trait]
impl OAuthExchange for HttpOAuthExchange {
    async fn exchange(
        &self,
        provider: &str,
        config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile> {
        let agent = self.agent.clone();
        let provider = provider.to_string();
        let config = config.clone();
        let code = code.to_string();

        tokio::task::spawn_blocking(move || Self::exchange_sync(&agent, &provider, &config, &code))
            .await
            .map_err(|e| BookhavenError::oauth(format!("OAuth task panicked: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authorize_url_contains_params() {
        let mut config = OAuthProviderConfig::github_template();
        config.client_id = "abc".into();
        let url = authorize_url(&config, "xyz").unwrap();
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=abc"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("scope=read%3Auser+user%3Aemail"));
        assert!(url.contains("response_type=code"));
    }

    #[test]
    fn test_state_is_single_use_and_bound_to_provider() {
        let store = OAuthStateStore::new(60);
        let state = store.issue("google");
        assert!(!store.consume(&state, "github"));
        // provider 不匹配时 state 也已作废
        assert!(!store.consume(&state, "google"));

        let state = store.issue("google");
        assert!(store.consume(&state, "google"));
        assert!(!store.consume(&state, "google"));
        assert!(!store.consume("forged", "google"));
    }

    #[test]
    fn test_google_profile() {
        let info = json!({
            "sub": "1098",
            "email": "Reader@Example.com",
            "email_verified": true,
            "name": "Reader",
            "picture": "https://lh3.example/photo.jpg"
        });
        let p = profile_from_userinfo("google", &info).unwrap();
        assert_eq!(p.subject, "1098");
        assert_eq!(p.email.as_deref(), Some("reader@example.com"));
        assert!(p.email_verified);
        assert_eq!(p.avatar_url.as_deref(), Some("https://lh3.example/photo.jpg"));
    }

    #[test]
    fn test_github_profile_uses_numeric_id_and_login() {
        let info = json!({
            "id": 583231,
            "login": "octocat",
            "name": null,
            "email": null,
            "avatar_url": "https://avatars.example/u/583231"
        });
        let p = profile_from_userinfo("github", &info).unwrap();
        assert_eq!(p.subject, "583231");
        assert_eq!(p.name.as_deref(), Some("octocat"));
        assert_eq!(p.email, None);
        assert!(!p.email_verified);
    }

    #[test]
    fn test_primary_verified_email() {
        let emails = json!([
            {"email": "old@example.com", "primary": false, "verified": true},
            {"email": "Main@Example.com", "primary": true, "verified": true},
            {"email": "spam@example.com", "primary": false, "verified": false}
        ]);
        assert_eq!(
            primary_verified_email(&emails).as_deref(),
            Some("main@example.com")
        );
        assert_eq!(primary_verified_email(&json!([])), None);
    }

    #[test]
    fn test_provider_config_requires_client_id() {
        let mut oauth = OAuthConfig::default();
        assert!(provider_config(&oauth, "google").is_none());
        oauth.google = Some(OAuthProviderConfig::google_template());
        assert!(provider_config(&oauth, "google").is_none());
        if let Some(g) = oauth.google.as_mut() {
            g.client_id = "id".into();
        }
        assert!(provider_config(&oauth, "google").is_some());
        assert!(provider_config(&oauth, "twitter").is_none());
    }
}
