//! 认证相关端点

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, Result as ActixResult, web};
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::constants;
use crate::config::get_config;
use crate::errors::BookhavenError;
use crate::services::{AuthService, AuthSession};
use crate::utils::generate_secure_token;

use super::helpers::{CookieBuilder, error_from_bookhaven, json_response, success_response};
use super::error_code::ErrorCode;
use super::types::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, OAuthCallbackQuery,
    RefreshRequest, RegisterRequest, ResetPasswordRequest,
};

/// 基于连接 IP 的限流 key
///
/// 无法取得 peer 地址时（如进程内测试请求）归入同一个桶。
#[derive(Clone, Copy)]
pub struct PeerIpKeyExtractor;

impl KeyExtractor for PeerIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        let key = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(key)
    }
}

/// 认证端点限流器
///
/// 每秒补充 1 个令牌，突发最多 5 次请求，超限返回 429
pub fn auth_rate_limiter() -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let config = GovernorConfigBuilder::default()
        .seconds_per_request(1)
        .burst_size(5)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!("Auth rate limiter created: 1 req/s, burst 5");
    Governor::new(&config)
}

/// CSRF Token（32 bytes，base64url）
fn generate_csrf_token() -> String {
    generate_secure_token(32)
}

/// 带上 access / refresh / csrf cookie 的会话响应
fn session_response(status: StatusCode, session: AuthSession) -> HttpResponse {
    let cookie_builder = CookieBuilder::from_config();
    let cookies = [
        cookie_builder.build_access_cookie(session.tokens.access_token.clone()),
        cookie_builder.build_refresh_cookie(session.tokens.refresh_token.clone()),
        cookie_builder.build_csrf_cookie(generate_csrf_token()),
    ];

    let mut response = json_response(
        status,
        ErrorCode::Success,
        "OK",
        Some(AuthResponse::from(session)),
    );
    for cookie in &cookies {
        if let Err(e) = response.add_cookie(cookie) {
            warn!("API: failed to set cookie {}: {}", cookie.name(), e);
        }
    }
    response
}

pub async fn register(
    body: web::Json<RegisterRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    let body = body.into_inner();
    info!("API: register request");

    match auth.register(&body.email, &body.name, &body.password).await {
        Ok(session) => Ok(session_response(StatusCode::CREATED, session)),
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

pub async fn login(
    body: web::Json<LoginRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    match auth.login(&body.email, &body.password).await {
        Ok(session) => Ok(session_response(StatusCode::OK, session)),
        Err(e) => {
            warn!("API: login failed: {}", e);
            Ok(error_from_bookhaven(&e))
        }
    }
}

/// 刷新 access token；refresh token 可放在请求体或 Cookie 中
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    let token = body
        .and_then(|b| b.into_inner().refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            req.cookie(constants::REFRESH_COOKIE_NAME)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
        });

    let Some(token) = token else {
        return Ok(error_from_bookhaven(&BookhavenError::token_invalid(
            "Refresh token not found",
        )));
    };

    match auth.refresh(&token).await {
        Ok(session) => Ok(session_response(StatusCode::OK, session)),
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

/// 登出 - 清除 cookies
pub async fn logout() -> ActixResult<impl Responder> {
    let cookie_builder = CookieBuilder::from_config();
    Ok(HttpResponse::Ok()
        .cookie(cookie_builder.build_expired_access_cookie())
        .cookie(cookie_builder.build_expired_refresh_cookie())
        .cookie(cookie_builder.build_expired_csrf_cookie())
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(super::types::ApiResponse {
            code: ErrorCode::Success as i32,
            message: "OK".to_string(),
            data: Some(MessageResponse::new("Logout successful")),
        }))
}

/// 无论邮箱是否存在都返回相同结果
pub async fn forgot_password(
    body: web::Json<ForgotPasswordRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    match auth.forgot_password(&body.email).await {
        Ok(()) => Ok(success_response(MessageResponse::new(
            "If the address is registered, a reset link has been sent",
        ))),
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

pub async fn reset_password(
    body: web::Json<ResetPasswordRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    match auth.reset_password(&body.token, &body.new_password).await {
        Ok(()) => Ok(success_response(MessageResponse::new("Password updated"))),
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

pub async fn oauth_providers(auth: web::Data<Arc<AuthService>>) -> ActixResult<impl Responder> {
    Ok(success_response(auth.oauth_providers()))
}

/// 跳转到提供方授权页
pub async fn oauth_start(
    path: web::Path<String>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    let provider = path.into_inner();
    match auth.oauth_start(&provider) {
        Ok(url) => Ok(HttpResponse::Found()
            .insert_header(("Location", url))
            .finish()),
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

fn frontend_callback_url(error: Option<&str>) -> String {
    let base = format!(
        "{}/oauth/callback",
        get_config().server.frontend_url.trim_end_matches('/')
    );
    match error {
        Some(message) => {
            let encoded: String = url::form_urlencoded::byte_serialize(message.as_bytes()).collect();
            format!("{}?error={}", base, encoded)
        }
        None => base,
    }
}

/// 提供方回调：成功时写入 Cookie 并回跳前端，失败时把错误带在 query 中
pub async fn oauth_callback(
    path: web::Path<String>,
    query: web::Query<OAuthCallbackQuery>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    let provider = path.into_inner();
    let query = query.into_inner();

    if let Some(error) = query.error.as_deref() {
        warn!("API: OAuth provider {} returned error: {}", provider, error);
        return Ok(HttpResponse::Found()
            .insert_header(("Location", frontend_callback_url(Some(error))))
            .finish());
    }

    let result = auth
        .oauth_callback(
            &provider,
            query.code.as_deref().unwrap_or_default(),
            query.state.as_deref().unwrap_or_default(),
        )
        .await;

    match result {
        Ok(session) => {
            let cookie_builder = CookieBuilder::from_config();
            Ok(HttpResponse::Found()
                .cookie(cookie_builder.build_access_cookie(session.tokens.access_token))
                .cookie(cookie_builder.build_refresh_cookie(session.tokens.refresh_token))
                .cookie(cookie_builder.build_csrf_cookie(generate_csrf_token()))
                .insert_header(("Location", frontend_callback_url(None)))
                .finish())
        }
        Err(e) => {
            warn!("API: OAuth login via {} failed: {}", provider, e);
            Ok(HttpResponse::Found()
                .insert_header(("Location", frontend_callback_url(Some(e.message()))))
                .finish())
        }
    }
}
