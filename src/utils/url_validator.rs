//! 外部链接校验（封面图、头像）
//!
//! 只允许 http(s)，拒绝 javascript:/data: 等可执行协议

use url::Url;

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    UnsupportedScheme(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "Unsupported URL scheme '{}': only http and https are allowed",
                scheme
            ),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 校验并返回去掉首尾空白的 URL
pub fn validate_url(url: &str) -> Result<String, UrlValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let parsed = Url::parse(url).map_err(|e| {
        // "javascript:alert(1)" 之类能被解析，解析失败的多半是相对路径
        UrlValidationError::InvalidFormat(e.to_string())
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlValidationError::InvalidFormat("missing host".to_string()));
    }

    Ok(url.to_string())
}

/// 可选 URL：空字符串视为未设置
pub fn validate_optional_url(url: Option<&str>) -> Result<Option<String>, UrlValidationError> {
    match url.map(str::trim) {
        None | Some("") => Ok(None),
        Some(u) => validate_url(u).map(Some),
    }
}
