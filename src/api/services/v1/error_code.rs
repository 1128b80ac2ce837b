//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::errors::BookhavenError;

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，ts-rs 自动生成 TypeScript 类型。
/// 按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 认证错误
/// - 3000-3099: 图书目录
/// - 4000-4099: 购物车
/// - 5000-5099: 优惠券
/// - 6000-6099: 订单
/// - 7000-7099: 导入导出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[ts(rename = "ErrorCode")]
#[ts(repr(enum))]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,
    Conflict = 1009,
    FileTooLarge = 1011,
    ServiceUnavailable = 1030,

    // 认证错误 2000-2099
    AuthFailed = 2000,
    TokenExpired = 2001,
    TokenInvalid = 2002,
    CsrfInvalid = 2003,
    RateLimitExceeded = 2004,
    OAuthFailed = 2010,

    // 图书目录 3000-3099
    BookNotFound = 3000,

    // 购物车 4000-4099
    OutOfStock = 4000,
    CartEmpty = 4001,

    // 优惠券 5000-5099
    CouponInvalid = 5000,

    // 订单 6000-6099
    PaymentDeclined = 6000,
    InvalidOrderTransition = 6001,

    // 导入导出 7000-7099
    ImportFailed = 7000,
    ExportFailed = 7001,
    InvalidMultipartData = 7002,
    CsvFileMissing = 7004,
}

impl From<&BookhavenError> for ErrorCode {
    fn from(err: &BookhavenError) -> Self {
        match err {
            BookhavenError::Validation(_) => ErrorCode::BadRequest,
            BookhavenError::NotFound(_) => ErrorCode::NotFound,
            BookhavenError::Conflict(_) => ErrorCode::Conflict,
            BookhavenError::AuthFailed(_) => ErrorCode::AuthFailed,
            BookhavenError::TokenInvalid(_) => ErrorCode::TokenInvalid,
            BookhavenError::TokenExpired(_) => ErrorCode::TokenExpired,
            BookhavenError::Forbidden(_) => ErrorCode::Forbidden,
            BookhavenError::OAuth(_) => ErrorCode::OAuthFailed,
            BookhavenError::OutOfStock(_) => ErrorCode::OutOfStock,
            BookhavenError::CartEmpty(_) => ErrorCode::CartEmpty,
            BookhavenError::CouponInvalid(_) => ErrorCode::CouponInvalid,
            BookhavenError::PaymentDeclined(_) => ErrorCode::PaymentDeclined,
            BookhavenError::InvalidOrderTransition(_) => ErrorCode::InvalidOrderTransition,
            BookhavenError::ImportFailed(_) => ErrorCode::ImportFailed,
            BookhavenError::Serialization(_) => ErrorCode::ExportFailed,
            BookhavenError::DatabaseConnection(_) => ErrorCode::ServiceUnavailable,
            BookhavenError::DatabaseConfig(_)
            | BookhavenError::DatabaseOperation(_)
            | BookhavenError::FileOperation(_)
            | BookhavenError::PasswordHash(_)
            | BookhavenError::Mail(_) => ErrorCode::InternalServerError,
        }
    }
}
