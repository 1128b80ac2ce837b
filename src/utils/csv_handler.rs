//! 图书 CSV 导入导出
//!
//! 价格列使用两位小数的字符串（"12.99"），避免浮点误差

use chrono::Utc;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::errors::{BookhavenError, Result};
use crate::storage::Book;

/// CSV 行数据结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvBookRow {
    #[serde(default)]
    pub isbn: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub genre: String,
    pub price: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub description: String,
}

impl From<&Book> for CsvBookRow {
    fn from(book: &Book) -> Self {
        Self {
            isbn: book.isbn.clone().unwrap_or_default(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            price: format_price(book.price_cents),
            stock: book.stock,
            published_year: book.published_year,
            cover_url: book.cover_url.clone().unwrap_or_default(),
            description: book.description.clone(),
        }
    }
}

/// 一行解析结果：CSV 行号（含表头，从 2 开始）与内容
pub type ParsedRow = (usize, std::result::Result<CsvBookRow, String>);

/// 分转为 "12.99"
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// 单价上限 1,000,000.00
///
/// 购物车与报价中的金额运算以此为界，不会溢出 i64。
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

/// "12.99" / "12.9" / "12" 转为分，超过 [`MAX_PRICE_CENTS`] 报错
pub fn parse_price(raw: &str) -> std::result::Result<i64, String> {
    let raw = raw.trim().trim_start_matches('$');
    if raw.is_empty() {
        return Err("Price is required".to_string());
    }
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    if whole.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || frac.len() > 2
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(format!("Invalid price: '{}'", raw));
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| format!("Invalid price: '{}'", raw))?;
    let frac_cents = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().unwrap_or(0) * 10,
        _ => frac.parse::<i64>().unwrap_or(0),
    };

    whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(frac_cents))
        .filter(|cents| *cents <= MAX_PRICE_CENTS)
        .ok_or_else(|| format!("Price out of range: '{}'", raw))
}

/// 导出图书为 CSV 字节
pub fn export_books_csv(books: &[Book]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    for book in books {
        writer.serialize(CsvBookRow::from(book)).map_err(|e| {
            BookhavenError::serialization(format!("Failed to write CSV row: {}", e))
        })?;
    }

    writer
        .into_inner()
        .map_err(|e| BookhavenError::serialization(format!("Failed to flush CSV: {}", e)))
}

/// 解析 CSV；单行错误不会中断整体解析
pub fn parse_books_csv(data: &[u8]) -> Result<Vec<ParsedRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    // 表头缺失或不可读时整体失败
    let headers = reader.headers()?.clone();
    for required in ["title", "author", "price"] {
        if !headers.iter().any(|h| h == required) {
            return Err(BookhavenError::import_failed(format!(
                "CSV header is missing required column '{}'",
                required
            )));
        }
    }

    Ok(reader
        .deserialize::<CsvBookRow>()
        .enumerate()
        .map(|(idx, result)| {
            (
                idx + 2,
                result.map_err(|e| format!("CSV parse error: {}", e)),
            )
        })
        .collect())
}

/// 默认导出文件名（带时间戳）
pub fn generate_export_filename() -> String {
    format!("books_export_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> Book {
        Book {
            id: 1,
            title: "The Hobbit".to_string(),
            author: "J. R. R. Tolkien".to_string(),
            isbn: Some("9780261103344".to_string()),
            description: "There and back again, with \"quotes\", commas".to_string(),
            genre: "Fantasy".to_string(),
            price_cents: 1099,
            stock: 12,
            cover_url: None,
            published_year: Some(1937),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(1099), "10.99");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(0), "0.00");
        assert_eq!(parse_price("10.99"), Ok(1099));
        assert_eq!(parse_price("$7.5"), Ok(750));
        assert_eq!(parse_price("12"), Ok(1200));
        assert!(parse_price("12.999").is_err());
        assert!(parse_price("-1.00").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("").is_err());
        assert_eq!(parse_price("1000000"), Ok(MAX_PRICE_CENTS));
        assert!(parse_price("1000000.01").is_err());
        assert!(parse_price("92233720368547758.07").is_err());
    }

    #[test]
    fn test_export_then_parse_keeps_quoted_fields() {
        let data = export_books_csv(&[sample_book()]).unwrap();
        let text = String::from_utf8(data.clone()).unwrap();
        assert!(text.starts_with("isbn,title,author,genre,price"));

        let rows = parse_books_csv(&data).unwrap();
        assert_eq!(rows.len(), 1);
        let (line, row) = &rows[0];
        assert_eq!(*line, 2);
        let row = row.as_ref().unwrap();
        assert_eq!(row.description, "There and back again, with \"quotes\", commas");
        assert_eq!(row.price, "10.99");
        assert_eq!(row.published_year, Some(1937));
    }

    #[test]
    fn test_parse_reports_bad_rows_individually() {
        let csv = "title,author,price,stock\nGood,Someone,9.99,3\nBad,Someone,9.99,many\n";
        let rows = parse_books_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].1.is_ok());
        assert_eq!(rows[1].0, 3);
        assert!(rows[1].1.is_err());
    }

    #[test]
    fn test_parse_requires_headers() {
        let csv = "name,writer\nx,y\n";
        assert!(parse_books_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_generate_export_filename() {
        let filename = generate_export_filename();
        assert!(filename.starts_with("books_export_"));
        assert!(filename.ends_with(".csv"));
    }
}
