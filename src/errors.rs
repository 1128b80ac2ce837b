use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum BookhavenError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Conflict(String),
    Serialization(String),
    AuthFailed(String),
    TokenInvalid(String),
    TokenExpired(String),
    Forbidden(String),
    PasswordHash(String),
    OAuth(String),
    OutOfStock(String),
    CartEmpty(String),
    CouponInvalid(String),
    PaymentDeclined(String),
    InvalidOrderTransition(String),
    Mail(String),
    ImportFailed(String),
}

impl BookhavenError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            BookhavenError::DatabaseConfig(_) => "E001",
            BookhavenError::DatabaseConnection(_) => "E002",
            BookhavenError::DatabaseOperation(_) => "E003",
            BookhavenError::FileOperation(_) => "E004",
            BookhavenError::Validation(_) => "E005",
            BookhavenError::NotFound(_) => "E006",
            BookhavenError::Conflict(_) => "E007",
            BookhavenError::Serialization(_) => "E008",
            BookhavenError::AuthFailed(_) => "E009",
            BookhavenError::TokenInvalid(_) => "E010",
            BookhavenError::TokenExpired(_) => "E011",
            BookhavenError::Forbidden(_) => "E012",
            BookhavenError::PasswordHash(_) => "E013",
            BookhavenError::OAuth(_) => "E014",
            BookhavenError::OutOfStock(_) => "E015",
            BookhavenError::CartEmpty(_) => "E016",
            BookhavenError::CouponInvalid(_) => "E017",
            BookhavenError::PaymentDeclined(_) => "E018",
            BookhavenError::InvalidOrderTransition(_) => "E019",
            BookhavenError::Mail(_) => "E020",
            BookhavenError::ImportFailed(_) => "E021",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            BookhavenError::DatabaseConfig(_) => "Database Configuration Error",
            BookhavenError::DatabaseConnection(_) => "Database Connection Error",
            BookhavenError::DatabaseOperation(_) => "Database Operation Error",
            BookhavenError::FileOperation(_) => "File Operation Error",
            BookhavenError::Validation(_) => "Validation Error",
            BookhavenError::NotFound(_) => "Resource Not Found",
            BookhavenError::Conflict(_) => "Conflict",
            BookhavenError::Serialization(_) => "Serialization Error",
            BookhavenError::AuthFailed(_) => "Authentication Failed",
            BookhavenError::TokenInvalid(_) => "Invalid Token",
            BookhavenError::TokenExpired(_) => "Token Expired",
            BookhavenError::Forbidden(_) => "Forbidden",
            BookhavenError::PasswordHash(_) => "Password Hash Error",
            BookhavenError::OAuth(_) => "OAuth Error",
            BookhavenError::OutOfStock(_) => "Out Of Stock",
            BookhavenError::CartEmpty(_) => "Cart Empty",
            BookhavenError::CouponInvalid(_) => "Coupon Invalid",
            BookhavenError::PaymentDeclined(_) => "Payment Declined",
            BookhavenError::InvalidOrderTransition(_) => "Invalid Order Transition",
            BookhavenError::Mail(_) => "Mail Delivery Error",
            BookhavenError::ImportFailed(_) => "Import Failed",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            BookhavenError::DatabaseConfig(msg)
            | BookhavenError::DatabaseConnection(msg)
            | BookhavenError::DatabaseOperation(msg)
            | BookhavenError::FileOperation(msg)
            | BookhavenError::Validation(msg)
            | BookhavenError::NotFound(msg)
            | BookhavenError::Conflict(msg)
            | BookhavenError::Serialization(msg)
            | BookhavenError::AuthFailed(msg)
            | BookhavenError::TokenInvalid(msg)
            | BookhavenError::TokenExpired(msg)
            | BookhavenError::Forbidden(msg)
            | BookhavenError::PasswordHash(msg)
            | BookhavenError::OAuth(msg)
            | BookhavenError::OutOfStock(msg)
            | BookhavenError::CartEmpty(msg)
            | BookhavenError::CouponInvalid(msg)
            | BookhavenError::PaymentDeclined(msg)
            | BookhavenError::InvalidOrderTransition(msg)
            | BookhavenError::Mail(msg)
            | BookhavenError::ImportFailed(msg) => msg,
        }
    }

    /// HTTP 状态码映射
    pub fn http_status(&self) -> StatusCode {
        match self {
            BookhavenError::Validation(_)
            | BookhavenError::CartEmpty(_)
            | BookhavenError::CouponInvalid(_)
            | BookhavenError::ImportFailed(_) => StatusCode::BAD_REQUEST,
            BookhavenError::AuthFailed(_)
            | BookhavenError::TokenInvalid(_)
            | BookhavenError::TokenExpired(_) => StatusCode::UNAUTHORIZED,
            BookhavenError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
            BookhavenError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookhavenError::NotFound(_) => StatusCode::NOT_FOUND,
            BookhavenError::Conflict(_)
            | BookhavenError::OutOfStock(_)
            | BookhavenError::InvalidOrderTransition(_) => StatusCode::CONFLICT,
            BookhavenError::OAuth(_) => StatusCode::BAD_GATEWAY,
            BookhavenError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookhavenError::DatabaseConfig(_)
            | BookhavenError::DatabaseOperation(_)
            | BookhavenError::FileOperation(_)
            | BookhavenError::Serialization(_)
            | BookhavenError::PasswordHash(_)
            | BookhavenError::Mail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为彩色输出（用于 CLI 模式）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for BookhavenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for BookhavenError {}

// 便捷的构造函数
impl BookhavenError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        BookhavenError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        BookhavenError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        BookhavenError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        BookhavenError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        BookhavenError::NotFound(msg.into())
    }

    pub fn conflict<T: Into<String>>(msg: T) -> Self {
        BookhavenError::Conflict(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        BookhavenError::Serialization(msg.into())
    }

    pub fn auth_failed<T: Into<String>>(msg: T) -> Self {
        BookhavenError::AuthFailed(msg.into())
    }

    pub fn token_invalid<T: Into<String>>(msg: T) -> Self {
        BookhavenError::TokenInvalid(msg.into())
    }

    pub fn forbidden<T: Into<String>>(msg: T) -> Self {
        BookhavenError::Forbidden(msg.into())
    }

    pub fn password_hash<T: Into<String>>(msg: T) -> Self {
        BookhavenError::PasswordHash(msg.into())
    }

    pub fn oauth<T: Into<String>>(msg: T) -> Self {
        BookhavenError::OAuth(msg.into())
    }

    pub fn out_of_stock<T: Into<String>>(msg: T) -> Self {
        BookhavenError::OutOfStock(msg.into())
    }

    pub fn cart_empty<T: Into<String>>(msg: T) -> Self {
        BookhavenError::CartEmpty(msg.into())
    }

    pub fn coupon_invalid<T: Into<String>>(msg: T) -> Self {
        BookhavenError::CouponInvalid(msg.into())
    }

    pub fn payment_declined<T: Into<String>>(msg: T) -> Self {
        BookhavenError::PaymentDeclined(msg.into())
    }

    pub fn invalid_order_transition<T: Into<String>>(msg: T) -> Self {
        BookhavenError::InvalidOrderTransition(msg.into())
    }

    pub fn mail<T: Into<String>>(msg: T) -> Self {
        BookhavenError::Mail(msg.into())
    }

    pub fn import_failed<T: Into<String>>(msg: T) -> Self {
        BookhavenError::ImportFailed(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for BookhavenError {
    fn from(err: sea_orm::DbErr) -> Self {
        BookhavenError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for BookhavenError {
    fn from(err: std::io::Error) -> Self {
        BookhavenError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for BookhavenError {
    fn from(err: serde_json::Error) -> Self {
        BookhavenError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for BookhavenError {
    fn from(err: csv::Error) -> Self {
        BookhavenError::ImportFailed(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for BookhavenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => BookhavenError::TokenExpired("Token expired".into()),
            _ => BookhavenError::TokenInvalid(err.to_string()),
        }
    }
}

impl From<crate::utils::password::PasswordError> for BookhavenError {
    fn from(err: crate::utils::password::PasswordError) -> Self {
        BookhavenError::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BookhavenError>;
