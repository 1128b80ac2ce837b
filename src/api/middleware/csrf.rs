//! CSRF 防护中间件
//!
//! 双令牌模式：Cookie 会话的写请求必须在 `X-CSRF-Token` header 中
//! 回传 `bookhaven_csrf` Cookie 的值。
//!
//! 跳过：安全方法（GET, HEAD, OPTIONS）与 Bearer 认证的请求。
//! 需挂在 [`UserAuth`](super::UserAuth) 内层，依赖其写入的 [`AuthContext`]。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{Method, StatusCode},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use subtle::ConstantTimeEq;
use tracing::{trace, warn};

use crate::api::constants;
use crate::api::services::v1::{ErrorCode, error_response};

use super::auth::{AuthContext, AuthMethod};

#[derive(Clone, Copy)]
pub struct CsrfGuard;

impl<S, B> Transform<S, ServiceRequest> for CsrfGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = CsrfMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CsrfMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct CsrfMiddleware<S> {
    service: Rc<S>,
}

fn is_safe_method(method: &Method) -> bool {
    matches!(method, &Method::GET | &Method::HEAD | &Method::OPTIONS)
}

/// Cookie 与 header 必须同时存在且相等（常量时间比较）
fn tokens_match(cookie: Option<&str>, header: Option<&str>) -> bool {
    let Some(cookie) = cookie.filter(|c| !c.is_empty()) else {
        warn!("CSRF cookie not found");
        return false;
    };
    let Some(header) = header else {
        warn!("{} header not found", constants::CSRF_HEADER_NAME);
        return false;
    };
    let valid: bool = cookie.as_bytes().ct_eq(header.as_bytes()).into();
    if !valid {
        warn!("CSRF token mismatch");
    }
    valid
}

fn validate_csrf_token(req: &ServiceRequest) -> bool {
    let cookie = req
        .cookie(constants::CSRF_COOKIE_NAME)
        .map(|c| c.value().to_string());
    let header = req
        .headers()
        .get(constants::CSRF_HEADER_NAME)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string());

    tokens_match(cookie.as_deref(), header.as_deref())
}

impl<S, B> Service<ServiceRequest> for CsrfMiddleware<S>
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

        Box::pin(async move {
            if is_safe_method(req.method()) {
                trace!("CSRF skipped: safe method {}", req.method());
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            let is_bearer_auth = req
                .extensions()
                .get::<AuthContext>()
                .is_some_and(|ctx| ctx.method == AuthMethod::Bearer);
            if is_bearer_auth {
                trace!("CSRF skipped: Bearer token authentication");
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            if !validate_csrf_token(&req) {
                warn!("CSRF validation failed for {} {}", req.method(), req.path());
                return Ok(req.into_response(
                    error_response(
                        StatusCode::FORBIDDEN,
                        ErrorCode::CsrfInvalid,
                        "CSRF token missing or invalid",
                    )
                    .map_into_right_body(),
                ));
            }

            trace!("CSRF validation passed");
            Ok(srv.call(req).await?.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match(Some("abc"), Some("abc")));
        assert!(!tokens_match(Some("abc"), Some("abd")));
        assert!(!tokens_match(Some("abc"), None));
        assert!(!tokens_match(None, Some("abc")));
        assert!(!tokens_match(Some(""), Some("")));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
