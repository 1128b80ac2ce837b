//! Accounts, sessions and OAuth login

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use ts_rs::TS;

use crate::api::jwt::{JwtService, get_jwt_service};
use crate::config::{OAuthConfig, TS_EXPORT_PATH};
use crate::errors::{BookhavenError, Result};
use crate::services::mail::Notifier;
use crate::services::oauth::{
    OAuthExchange, OAuthProfile, OAuthStateStore, authorize_url, provider_config,
};
use crate::storage::{NewUser, SeaOrmStorage, User, UserRole};
use crate::utils::password::{
    check_password_policy, hash_password, password_fingerprint, verify_password,
};
use crate::utils::url_validator::validate_optional_url;
use crate::utils::validation::{is_valid_email, normalize_email};

/// 登录失败统一提示，不区分账号不存在与密码错误
const INVALID_CREDENTIALS: &str = "Invalid email or password";
const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// access token 有效期（秒）
    #[ts(type = "number")]
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: AuthTokens,
}

fn checked_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(BookhavenError::validation(format!(
            "Name must be 1-{} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

pub struct AuthService {
    storage: Arc<SeaOrmStorage>,
    notifier: Notifier,
    oauth_config: OAuthConfig,
    oauth_states: OAuthStateStore,
    oauth_exchange: Arc<dyn OAuthExchange>,
    min_password_length: usize,
}

impl AuthService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        notifier: Notifier,
        oauth_config: OAuthConfig,
        oauth_exchange: Arc<dyn OAuthExchange>,
        min_password_length: usize,
    ) -> Self {
        Self {
            storage,
            notifier,
            oauth_states: OAuthStateStore::new(oauth_config.state_ttl_secs),
            oauth_config,
            oauth_exchange,
            min_password_length,
        }
    }

    fn jwt(&self) -> &'static JwtService {
        get_jwt_service()
    }

    fn issue_session(&self, user: User) -> Result<AuthSession> {
        let jwt = self.jwt();
        let tokens = AuthTokens {
            access_token: jwt.generate_access_token(&user)?,
            refresh_token: jwt.generate_refresh_token(&user)?,
            expires_in: jwt.access_token_minutes() * 60,
        };
        Ok(AuthSession { user, tokens })
    }

    fn hash_new_password(&self, password: &str) -> Result<String> {
        check_password_policy(password, self.min_password_length)
            .map_err(BookhavenError::validation)?;
        Ok(hash_password(password)?)
    }

    async fn require_user(&self, id: i32) -> Result<User> {
        self.storage
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("User {} not found", id)))
    }

    // ============ Local accounts ============

    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(BookhavenError::validation("Invalid email address"));
        }
        let name = checked_name(name)?;
        let password_hash = self.hash_new_password(password)?;

        if self.storage.find_user_by_email(&email).await?.is_some() {
            return Err(BookhavenError::conflict("Email already registered"));
        }

        let user = self
            .storage
            .create_user(
                NewUser {
                    email,
                    name,
                    password_hash: Some(password_hash),
                    role: UserRole::Customer,
                    oauth_provider: None,
                    oauth_subject: None,
                    avatar_url: None,
                },
                true,
            )
            .await?;

        info!("AuthService: registered user {} ({})", user.id, user.role);
        self.notifier.welcome(&user).await;
        self.issue_session(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = normalize_email(email);
        let user = self
            .storage
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| BookhavenError::auth_failed(INVALID_CREDENTIALS))?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(BookhavenError::auth_failed(INVALID_CREDENTIALS));
        };
        if !verify_password(password, hash)? {
            warn!("AuthService: failed login for user {}", user.id);
            return Err(BookhavenError::auth_failed(INVALID_CREDENTIALS));
        }

        info!("AuthService: user {} logged in", user.id);
        self.issue_session(user)
    }

    /// 用 refresh token 换新的 access token，refresh token 原样返回
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let claims = self.jwt().validate_refresh_token(refresh_token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| BookhavenError::token_invalid("Malformed token subject"))?;
        // 用户可能已被删除
        let user = self
            .storage
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| BookhavenError::token_invalid("Account no longer exists"))?;

        let jwt = self.jwt();
        let tokens = AuthTokens {
            access_token: jwt.generate_access_token(&user)?,
            refresh_token: refresh_token.to_string(),
            expires_in: jwt.access_token_minutes() * 60,
        };
        Ok(AuthSession { user, tokens })
    }

    /// avatar_url 传空字符串表示清除
    pub async fn update_profile(
        &self,
        user_id: i32,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<User> {
        let name = name.map(checked_name).transpose()?;
        let avatar_url = match avatar_url {
            Some(url) => Some(
                validate_optional_url(Some(url))
                    .map_err(|e| BookhavenError::validation(format!("Invalid avatar URL: {}", e)))?,
            ),
            None => None,
        };
        self.storage
            .update_user_profile(user_id, name, avatar_url)
            .await
    }

    /// 纯 OAuth 账号第一次设置密码时不需要 current
    pub async fn change_password(
        &self,
        user_id: i32,
        current: Option<&str>,
        new_password: &str,
    ) -> Result<()> {
        let user = self.require_user(user_id).await?;
        if let Some(hash) = user.password_hash.as_deref() {
            let current = current
                .filter(|c| !c.is_empty())
                .ok_or_else(|| BookhavenError::validation("Current password is required"))?;
            if !verify_password(current, hash)? {
                return Err(BookhavenError::auth_failed("Current password is incorrect"));
            }
        }

        let new_hash = self.hash_new_password(new_password)?;
        self.storage.set_password_hash(user.id, new_hash).await
    }

    /// 总是返回成功，避免探测注册邮箱
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = normalize_email(email);
        let Some(user) = self.storage.find_user_by_email(&email).await? else {
            info!("AuthService: password reset requested for unknown email");
            return Ok(());
        };

        let jwt = self.jwt();
        let fingerprint = password_fingerprint(user.password_hash.as_deref());
        let token = jwt.generate_reset_token(user.id, &fingerprint)?;
        self.notifier
            .password_reset(&user, &token, jwt.reset_token_minutes())
            .await;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let claims = self.jwt().validate_reset_token(token)?;
        let user_id = claims
            .user_id()
            .ok_or_else(|| BookhavenError::token_invalid("Malformed token subject"))?;
        let user = self
            .storage
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| BookhavenError::token_invalid("Reset link is no longer valid"))?;

        // 指纹不一致说明密码已改过，token 已用过
        if password_fingerprint(user.password_hash.as_deref()) != claims.pwd {
            return Err(BookhavenError::token_invalid(
                "Reset link has already been used",
            ));
        }

        let new_hash = self.hash_new_password(new_password)?;
        self.storage.set_password_hash(user.id, new_hash).await?;
        info!("AuthService: password reset for user {}", user.id);
        Ok(())
    }

    // ============ OAuth ============

    /// 已启用的提供方
    pub fn oauth_providers(&self) -> Vec<&'static str> {
        ["google", "github"]
            .into_iter()
            .filter(|p| provider_config(&self.oauth_config, p).is_some())
            .collect()
    }

    /// 生成授权跳转地址
    pub fn oauth_start(&self, provider: &str) -> Result<String> {
        let config = provider_config(&self.oauth_config, provider).ok_or_else(|| {
            BookhavenError::not_found(format!("OAuth provider '{}' is not enabled", provider))
        })?;
        let state = self.oauth_states.issue(provider);
        authorize_url(config, &state)
    }

    pub async fn oauth_callback(
        &self,
        provider: &str,
        code: &str,
        state: &str,
    ) -> Result<AuthSession> {
        let config = provider_config(&self.oauth_config, provider).ok_or_else(|| {
            BookhavenError::not_found(format!("OAuth provider '{}' is not enabled", provider))
        })?;
        if !self.oauth_states.consume(state, provider) {
            return Err(BookhavenError::oauth("Invalid or expired OAuth state"));
        }
        if code.is_empty() {
            return Err(BookhavenError::oauth("Missing authorization code"));
        }

        let profile = self.oauth_exchange.exchange(provider, config, code).await?;
        let user = self.resolve_oauth_user(provider, profile).await?;
        info!("AuthService: user {} signed in with {}", user.id, provider);
        self.issue_session(user)
    }

    /// (provider, subject) → 已验证邮箱 → 新建
    async fn resolve_oauth_user(&self, provider: &str, profile: OAuthProfile) -> Result<User> {
        if let Some(user) = self
            .storage
            .find_user_by_oauth(provider, &profile.subject)
            .await?
        {
            return Ok(user);
        }

        let email = profile
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| is_valid_email(e))
            .ok_or_else(|| {
                BookhavenError::oauth(format!("{} did not share an email address", provider))
            })?;

        if let Some(existing) = self.storage.find_user_by_email(&email).await? {
            if !profile.email_verified {
                return Err(BookhavenError::oauth(
                    "Email is registered but not verified by the provider",
                ));
            }
            return self
                .storage
                .link_oauth_identity(existing.id, provider, &profile.subject, profile.avatar_url)
                .await;
        }

        let name = profile
            .name
            .as_deref()
            .and_then(|n| checked_name(n).ok())
            .or_else(|| email.split('@').next().map(str::to_string))
            .unwrap_or_else(|| "Reader".to_string());

        let user = self
            .storage
            .create_user(
                NewUser {
                    email,
                    name,
                    password_hash: None,
                    role: UserRole::Customer,
                    oauth_provider: Some(provider.to_string()),
                    oauth_subject: Some(profile.subject),
                    avatar_url: profile.avatar_url,
                },
                true,
            )
            .await?;
        self.notifier.welcome(&user).await;
        Ok(user)
    }

    // ============ CLI helpers ============

    pub async fn promote_user(&self, email: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = self
            .storage
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("No user with email {}", email)))?;
        self.storage.set_user_role(user.id, UserRole::Admin).await
    }

    /// 管理员直接设置密码（不校验旧密码）
    pub async fn set_password_by_email(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let user = self
            .storage
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("No user with email {}", email)))?;
        let hash = self.hash_new_password(password)?;
        self.storage.set_password_hash(user.id, hash).await?;
        Ok(user)
    }
}
