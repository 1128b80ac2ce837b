use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::storage::{User, UserRole};

/// Global cached JwtService instance
static JWT_SERVICE: OnceLock<JwtService> = OnceLock::new();

/// Get the cached JwtService instance
///
/// The service is initialized once from config on first use.
pub fn get_jwt_service() -> &'static JwtService {
    JWT_SERVICE.get_or_init(JwtService::from_config)
}

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";
const RESET: &str = "reset";

/// Access Token Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// user id
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl AccessClaims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Refresh Token Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl RefreshClaims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// Password reset claims
///
/// `pwd` 是签发时密码哈希的指纹，密码一旦修改 token 即失效
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: String,
    pub pwd: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub token_type: String,
}

impl ResetClaims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

/// JWT Service for generating and validating tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_minutes: u64,
    refresh_token_days: u64,
    reset_token_minutes: u64,
}

fn invalid_token() -> jsonwebtoken::errors::Error {
    jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidToken)
}

impl JwtService {
    pub fn new(
        secret: &str,
        access_token_minutes: u64,
        refresh_token_days: u64,
        reset_token_minutes: u64,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_minutes,
            refresh_token_days,
            reset_token_minutes,
        }
    }

    /// Create JwtService from config
    pub fn from_config() -> Self {
        let auth = &crate::config::get_config().auth;

        // 未配置时随机生成，重启后所有 token 失效
        let jwt_secret = if auth.jwt_secret.is_empty() {
            tracing::warn!("JWT secret not configured, generating a random one");
            crate::utils::generate_secure_token(32)
        } else {
            auth.jwt_secret.clone()
        };

        Self::new(
            &jwt_secret,
            auth.access_token_minutes,
            auth.refresh_token_days,
            auth.reset_token_minutes,
        )
    }

    pub fn access_token_minutes(&self) -> u64 {
        self.access_token_minutes
    }

    pub fn refresh_token_days(&self) -> u64 {
        self.refresh_token_days
    }

    pub fn reset_token_minutes(&self) -> u64 {
        self.reset_token_minutes
    }

    /// Generate Access Token (short-lived)
    pub fn generate_access_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.access_token_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: ACCESS.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Generate Refresh Token (long-lived)
    pub fn generate_refresh_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.refresh_token_days as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: REFRESH.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Generate password reset token bound to the current password fingerprint
    pub fn generate_reset_token(
        &self,
        user_id: i32,
        fingerprint: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = ResetClaims {
            sub: user_id.to_string(),
            pwd: fingerprint.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.reset_token_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: RESET.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    /// Validate Access Token
    pub fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != ACCESS {
            return Err(invalid_token());
        }

        Ok(token_data.claims)
    }

    /// Validate Refresh Token
    pub fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
        let token_data =
            decode::<RefreshClaims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != REFRESH {
            return Err(invalid_token());
        }

        Ok(token_data.claims)
    }

    pub fn validate_reset_token(
        &self,
        token: &str,
    ) -> Result<ResetClaims, jsonwebtoken::errors::Error> {
        let token_data = decode::<ResetClaims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != RESET {
            return Err(invalid_token());
        }

        Ok(token_data.claims)
    }
}
