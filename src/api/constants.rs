//! API 模块常量定义

/// Access Token Cookie 名称
pub const ACCESS_COOKIE_NAME: &str = "bookhaven_access";

/// Refresh Token Cookie 名称
pub const REFRESH_COOKIE_NAME: &str = "bookhaven_refresh";

/// Refresh cookie 只在刷新接口上发送
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

/// CSRF Cookie 名称（非 HttpOnly，前端读取后回传到 header）
pub const CSRF_COOKIE_NAME: &str = "bookhaven_csrf";

pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

pub const API_PREFIX: &str = "/api/v1";
