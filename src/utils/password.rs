//! 密码哈希工具模块
//!
//! 使用 Argon2id 算法进行密码哈希和验证

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use xxhash_rust::xxh64::xxh64;

/// 密码最大长度（防止超长输入拖慢 Argon2）
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// 密码哈希错误
#[derive(Debug)]
pub enum PasswordError {
    HashError(String),
    VerifyError(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HashError(msg) => write!(f, "Password hash error: {}", msg),
            Self::VerifyError(msg) => write!(f, "Password verify error: {}", msg),
        }
    }
}

impl std::error::Error for PasswordError {}

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// 验证密码是否匹配哈希
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::VerifyError(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 检测字符串是否是 Argon2 哈希格式
pub fn is_argon2_hash(s: &str) -> bool {
    s.starts_with("$argon2")
}

/// 检查新密码长度，返回面向用户的错误描述
pub fn check_password_policy(password: &str, min_length: usize) -> Result<(), String> {
    let len = password.chars().count();
    if len < min_length {
        return Err(format!(
            "Password must be at least {} characters long",
            min_length
        ));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at most {} characters long",
            MAX_PASSWORD_LENGTH
        ));
    }
    if password.trim().is_empty() {
        return Err("Password must not be blank".to_string());
    }
    Ok(())
}

/// 密码哈希指纹
///
/// 写入重置令牌；密码一旦修改指纹随之变化，旧令牌失效。
/// 无密码（纯 OAuth 账号）时为 "none"。
pub fn password_fingerprint(hash: Option<&str>) -> String {
    match hash {
        Some(h) => format!("{:016x}", xxh64(h.as_bytes(), 0)),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).expect("hash should succeed");

        assert!(is_argon2_hash(&hash));
        assert!(verify_password(password, &hash).expect("verify should succeed"));
        assert!(!verify_password("wrong_password", &hash).expect("verify should succeed"));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(verify_password("whatever", "not-a-hash").is_err());
    }

    #[test]
    fn test_is_argon2_hash() {
        assert!(is_argon2_hash("$argon2id$v=19$m=19456,t=2,p=1$xxx"));
        assert!(!is_argon2_hash("plaintext_password"));
        assert!(!is_argon2_hash("$2b$12$bcrypthash"));
    }

    #[test]
    fn test_password_policy() {
        assert!(check_password_policy("short", 8).is_err());
        assert!(check_password_policy("long enough", 8).is_ok());
        assert!(check_password_policy("        ", 8).is_err());
        assert!(check_password_policy(&"x".repeat(200), 8).is_err());
    }

    #[test]
    fn test_fingerprint_changes_with_hash() {
        let a = password_fingerprint(Some("$argon2id$aaa"));
        let b = password_fingerprint(Some("$argon2id$bbb"));
        assert_ne!(a, b);
        assert_eq!(a.len(), 16);
        assert_eq!(a, password_fingerprint(Some("$argon2id$aaa")));
        assert_eq!(password_fingerprint(None), "none");
    }
}
