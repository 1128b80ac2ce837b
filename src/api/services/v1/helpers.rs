//! API v1 帮助函数

use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::api::constants;
use crate::config::SameSitePolicy;
use crate::errors::BookhavenError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 201 Created
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, ErrorCode::Success, "Created", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 BookhavenError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_bookhaven(err: &BookhavenError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        tracing::error!("{}: {}", err.error_type(), err.message());
    }
    error_response(status, ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<BookhavenError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_bookhaven(&e.into()),
    }
}

/// 提取器失败时同样返回统一的 JSON 包装
impl ResponseError for BookhavenError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        error_from_bookhaven(self)
    }
}

/// Cookie 构建器
pub struct CookieBuilder {
    same_site: SameSite,
    secure: bool,
    domain: Option<String>,
    access_token_minutes: u64,
    refresh_token_days: u64,
}

impl CookieBuilder {
    pub fn from_config() -> Self {
        let config = crate::config::get_config();

        let same_site = match config.auth.cookie_same_site {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::None => SameSite::None,
            SameSitePolicy::Lax => SameSite::Lax,
        };

        Self {
            same_site,
            secure: config.auth.cookie_secure,
            domain: config.auth.cookie_domain.clone(),
            access_token_minutes: config.auth.access_token_minutes,
            refresh_token_days: config.auth.refresh_token_days,
        }
    }

    fn build_cookie_base(
        &self,
        name: &str,
        value: String,
        path: &str,
        max_age: actix_web::cookie::time::Duration,
    ) -> Cookie<'static> {
        let mut cookie = Cookie::new(name.to_string(), value);
        cookie.set_path(path.to_string());
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(self.same_site);
        cookie.set_max_age(max_age);
        if let Some(ref domain) = self.domain {
            cookie.set_domain(domain.clone());
        }
        cookie
    }

    pub fn build_access_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::ACCESS_COOKIE_NAME,
            token,
            "/",
            actix_web::cookie::time::Duration::minutes(self.access_token_minutes as i64),
        )
    }

    pub fn build_refresh_cookie(&self, token: String) -> Cookie<'static> {
        self.build_cookie_base(
            constants::REFRESH_COOKIE_NAME,
            token,
            constants::REFRESH_COOKIE_PATH,
            actix_web::cookie::time::Duration::days(self.refresh_token_days as i64),
        )
    }

    pub fn build_expired_access_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::ACCESS_COOKIE_NAME,
            String::new(),
            "/",
            actix_web::cookie::time::Duration::ZERO,
        )
    }

    pub fn build_expired_refresh_cookie(&self) -> Cookie<'static> {
        self.build_cookie_base(
            constants::REFRESH_COOKIE_NAME,
            String::new(),
            constants::REFRESH_COOKIE_PATH,
            actix_web::cookie::time::Duration::ZERO,
        )
    }

    /// CSRF Cookie 不能是 HttpOnly，前端需要读取后放入 header
    pub fn build_csrf_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = self.build_cookie_base(
            constants::CSRF_COOKIE_NAME,
            token,
            "/",
            actix_web::cookie::time::Duration::minutes(self.access_token_minutes as i64),
        );
        cookie.set_http_only(false);
        cookie
    }

    pub fn build_expired_csrf_cookie(&self) -> Cookie<'static> {
        let mut cookie = self.build_cookie_base(
            constants::CSRF_COOKIE_NAME,
            String::new(),
            "/",
            actix_web::cookie::time::Duration::ZERO,
        );
        cookie.set_http_only(false);
        cookie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let response = success_response("success_data");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_api_result_maps_error_status() {
        let result: Result<(), BookhavenError> = Err(BookhavenError::out_of_stock("sold out"));
        assert_eq!(api_result(result).status(), StatusCode::CONFLICT);

        let result: Result<(), BookhavenError> = Err(BookhavenError::payment_declined("no"));
        assert_eq!(api_result(result).status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_csrf_cookie_is_readable_by_frontend() {
        let builder = CookieBuilder {
            same_site: SameSite::Lax,
            secure: true,
            domain: None,
            access_token_minutes: 15,
            refresh_token_days: 7,
        };
        let cookie = builder.build_csrf_cookie("token".to_string());
        assert_eq!(cookie.name(), constants::CSRF_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(false));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(
            builder.build_access_cookie("t".to_string()).http_only(),
            Some(true)
        );
    }

    #[test]
    fn test_error_response_not_found() {
        let response = error_response(
            StatusCode::NOT_FOUND,
            ErrorCode::NotFound,
            "Resource not found",
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
