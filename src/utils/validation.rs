//! 输入校验：邮箱、ISBN、银行卡号（Luhn）

/// 规范化邮箱：去空白、转小写
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// 简单的邮箱格式检查
///
/// local@domain.tld，不含空白，domain 至少包含一个点且两侧非空
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2 && !domain.starts_with('.'),
        None => false,
    }
}

/// ISBN 规范化：去掉连字符与空格，末位 x 转大写
pub fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// 校验 ISBN-10 / ISBN-13 校验位（输入需已规范化）
pub fn is_valid_isbn(isbn: &str) -> bool {
    match isbn.len() {
        10 => is_valid_isbn10(isbn),
        13 => is_valid_isbn13(isbn),
        _ => false,
    }
}

fn is_valid_isbn10(isbn: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'X' if i == 9 => 10,
            _ => return false,
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

fn is_valid_isbn13(isbn: &str) -> bool {
    if !isbn.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = isbn
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 { digit } else { digit * 3 }
        })
        .sum();
    sum % 10 == 0
}

/// Luhn 校验（输入只含数字）
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let mut d = (b - b'0') as u32;
            if i % 2 == 1 {
                d *= 2;
                if d > 9 {
                    d -= 9;
                }
            }
            d
        })
        .sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert_eq!(normalize_email("  Reader@Example.COM "), "reader@example.com");
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("a.b+tag@sub.example.co"));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("reader@@example.com"));
        assert!(!is_valid_email("read er@example.com"));
        assert!(!is_valid_email("reader@.com"));
    }

    #[test]
    fn test_isbn() {
        assert_eq!(normalize_isbn("978-0-306-40615-7"), "9780306406157");
        assert!(is_valid_isbn("9780306406157"));
        assert!(!is_valid_isbn("9780306406158"));

        assert_eq!(normalize_isbn("0-8044-2957-x"), "080442957X");
        assert!(is_valid_isbn("080442957X"));
        assert!(is_valid_isbn("0306406152"));
        assert!(!is_valid_isbn("0306406153"));
        assert!(!is_valid_isbn("X306406152"));
        assert!(!is_valid_isbn("12345"));
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4242424242424242"));
        assert!(luhn_valid("4000000000000002"));
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("4242424242424241"));
        assert!(!luhn_valid("4242-4242"));
        assert!(!luhn_valid(""));
    }
}
