use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{Method, StatusCode},
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use jsonwebtoken::errors::ErrorKind;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, trace};

use crate::api::constants;
use crate::api::jwt::get_jwt_service;
use crate::api::services::v1::{ErrorCode, error_response};
use crate::errors::BookhavenError;
use crate::storage::{SeaOrmStorage, User, UserRole};

/// 认证方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    Cookie,
}

/// 已通过 token 校验的请求上下文，由中间件写入 request extensions
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i32,
    pub role: UserRole,
    pub method: AuthMethod,
}

/// 用户认证中间件
///
/// `require_admin` 为 true 时按 token 中的角色拦截非管理员；
/// handler 侧的 [`AdminUser`] 会再以数据库中的角色复核一次。
#[derive(Clone, Copy)]
pub struct UserAuth {
    require_admin: bool,
}

impl UserAuth {
    pub fn customer() -> Self {
        Self {
            require_admin: false,
        }
    }

    pub fn admin() -> Self {
        Self {
            require_admin: true,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for UserAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = UserAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(UserAuthMiddleware {
            service: Rc::new(service),
            require_admin: self.require_admin,
        }))
    }
}

pub struct UserAuthMiddleware<S> {
    service: Rc<S>,
    require_admin: bool,
}

impl<S, B> UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn reject(
        req: ServiceRequest,
        status: StatusCode,
        code: ErrorCode,
        message: &str,
    ) -> ServiceResponse<EitherBody<B>> {
        req.into_response(error_response(status, code, message).map_into_right_body())
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<String> {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Bearer 优先，其次 Cookie
    fn extract_token(req: &ServiceRequest) -> Option<(String, AuthMethod)> {
        if let Some(token) = Self::extract_bearer_token(req) {
            return Some((token, AuthMethod::Bearer));
        }
        req.cookie(constants::ACCESS_COOKIE_NAME)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .map(|token| (token, AuthMethod::Cookie))
    }
}

impl<S, B> Service<ServiceRequest> for UserAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let require_admin = self.require_admin;

        Box::pin(async move {
            // CORS 预检直接放行
            if req.method() == Method::OPTIONS {
                let response = srv.call(req).await?.map_into_left_body();
                return Ok(response);
            }

            let Some((token, method)) = Self::extract_token(&req) else {
                debug!("Request to {} without access token", req.path());
                return Ok(Self::reject(
                    req,
                    StatusCode::UNAUTHORIZED,
                    ErrorCode::Unauthorized,
                    "Authentication required",
                ));
            };

            let claims = match get_jwt_service().validate_access_token(&token) {
                Ok(claims) => claims,
                Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                    trace!("Access token expired");
                    return Ok(Self::reject(
                        req,
                        StatusCode::UNAUTHORIZED,
                        ErrorCode::TokenExpired,
                        "Access token expired",
                    ));
                }
                Err(e) => {
                    info!("Access token validation failed: {}", e);
                    return Ok(Self::reject(
                        req,
                        StatusCode::UNAUTHORIZED,
                        ErrorCode::TokenInvalid,
                        "Invalid access token",
                    ));
                }
            };

            let Some(user_id) = claims.user_id() else {
                return Ok(Self::reject(
                    req,
                    StatusCode::UNAUTHORIZED,
                    ErrorCode::TokenInvalid,
                    "Invalid access token",
                ));
            };

            if require_admin && claims.role != UserRole::Admin {
                info!("User {} denied access to {}", user_id, req.path());
                return Ok(Self::reject(
                    req,
                    StatusCode::FORBIDDEN,
                    ErrorCode::Forbidden,
                    "Administrator access required",
                ));
            }

            trace!("User {} authenticated via {:?}", user_id, method);
            req.extensions_mut().insert(AuthContext {
                user_id,
                role: claims.role,
                method,
            });
            let response = srv.call(req).await?.map_into_left_body();
            Ok(response)
        })
    }
}

async fn load_current_user(req: HttpRequest) -> Result<User, BookhavenError> {
    let context = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| BookhavenError::auth_failed("Authentication required"))?;

    let storage = req
        .app_data::<web::Data<Arc<SeaOrmStorage>>>()
        .ok_or_else(|| BookhavenError::database_connection("Storage is not configured"))?
        .get_ref()
        .clone();

    storage
        .find_user_by_id(context.user_id)
        .await?
        .ok_or_else(|| BookhavenError::token_invalid("Account no longer exists"))
}

/// 当前登录用户（从数据库加载的最新数据）
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = BookhavenError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { load_current_user(req).await.map(CurrentUser) })
    }
}

/// 当前管理员；角色以数据库为准，token 签发后被降级的用户会被拒绝
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = BookhavenError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let user = load_current_user(req).await?;
            if !user.is_admin() {
                return Err(BookhavenError::forbidden("Administrator access required"));
            }
            Ok(AdminUser(user))
        })
    }
}

