pub mod csv_handler;
pub mod password;
pub mod url_validator;
pub mod validation;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    // 去掉易混淆的 0/O、1/I
    let chars = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    iter::repeat_with(|| chars[rand::random_range(0..chars.len())] as char)
        .take(length)
        .collect()
}

/// 生成 URL 安全的随机令牌（base64url，无填充）
pub fn generate_secure_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::fill(buf.as_mut_slice());
    URL_SAFE_NO_PAD.encode(buf)
}

/// 订单号：BH-YYYYMMDD-XXXXXX
pub fn generate_order_number() -> String {
    format!(
        "BH-{}-{}",
        chrono::Utc::now().format("%Y%m%d"),
        generate_random_code(6)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_code() {
        let code = generate_random_code(12);
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!code.contains('0') && !code.contains('O'));
    }

    #[test]
    fn test_generate_secure_token() {
        let a = generate_secure_token(32);
        let b = generate_secure_token(32);
        assert_ne!(a, b);
        // 32 字节 base64url 无填充为 43 字符
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
    }

    #[test]
    fn test_generate_order_number() {
        let number = generate_order_number();
        assert!(number.starts_with("BH-"));
        assert_eq!(number.len(), "BH-20260101-ABCDEF".len());
    }
}
