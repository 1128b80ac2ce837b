//! Book catalog service
//!
//! 目录浏览对所有人开放，增删改与 CSV 导入导出仅限后台。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::errors::{BookhavenError, Result};
use crate::services::effective_page_size;
use crate::storage::{Book, BookDraft, BookFilter, Page, SeaOrmStorage};
use crate::utils::csv_handler::{
    CsvBookRow, MAX_PRICE_CENTS, export_books_csv, format_price, parse_books_csv, parse_price,
};
use crate::utils::url_validator::validate_optional_url;
use crate::utils::validation::{is_valid_isbn, normalize_isbn};

// ============ Request/Response DTOs ============

/// 新建图书
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    #[ts(type = "number")]
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
}

/// 部分更新；None 表示保持原值，isbn / cover_url 传空字符串表示清除
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    #[ts(type = "number | null")]
    pub price_cents: Option<i64>,
    pub stock: Option<i32>,
    pub cover_url: Option<String>,
    pub published_year: Option<i32>,
}

/// 导入冲突处理方式（按 ISBN 判断）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// 跳过已存在的图书
    #[default]
    Skip,
    /// 覆盖已存在的图书
    Overwrite,
    /// 已存在的行记为失败
    Error,
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ImportResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<ImportRowError>,
}

/// 单行导入错误
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ImportRowError {
    /// CSV 行号（表头为第 1 行）
    pub line: usize,
    pub isbn: Option<String>,
    pub message: String,
}

// ============ Validation ============

fn required_text(value: &str, field: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BookhavenError::validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(BookhavenError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// 空字符串视为未设置
fn checked_isbn(isbn: Option<&str>) -> Result<Option<String>> {
    match isbn.map(normalize_isbn) {
        None => Ok(None),
        Some(isbn) if isbn.is_empty() => Ok(None),
        Some(isbn) if is_valid_isbn(&isbn) => Ok(Some(isbn)),
        Some(isbn) => Err(BookhavenError::validation(format!(
            "Invalid ISBN: {}",
            isbn
        ))),
    }
}

/// 统一的图书字段校验
pub fn validate_draft(draft: BookDraft) -> Result<BookDraft> {
    if draft.price_cents < 0 {
        return Err(BookhavenError::validation("Price cannot be negative"));
    }
    if draft.price_cents > MAX_PRICE_CENTS {
        return Err(BookhavenError::validation(format!(
            "Price cannot exceed {}",
            format_price(MAX_PRICE_CENTS)
        )));
    }
    if draft.stock < 0 {
        return Err(BookhavenError::validation("Stock cannot be negative"));
    }
    if let Some(year) = draft.published_year
        && !(0..=9999).contains(&year)
    {
        return Err(BookhavenError::validation(format!(
            "Invalid publication year: {}",
            year
        )));
    }

    Ok(BookDraft {
        title: required_text(&draft.title, "Title", 300)?,
        author: required_text(&draft.author, "Author", 200)?,
        isbn: checked_isbn(draft.isbn.as_deref())?,
        description: draft.description.trim().to_string(),
        genre: draft.genre.trim().to_string(),
        cover_url: validate_optional_url(draft.cover_url.as_deref())
            .map_err(|e| BookhavenError::validation(format!("Invalid cover URL: {}", e)))?,
        ..draft
    })
}

impl From<BookInput> for BookDraft {
    fn from(input: BookInput) -> Self {
        Self {
            title: input.title,
            author: input.author,
            isbn: input.isbn,
            description: input.description,
            genre: input.genre,
            price_cents: input.price_cents,
            stock: input.stock,
            cover_url: input.cover_url,
            published_year: input.published_year,
        }
    }
}

fn draft_from_book(book: Book) -> BookDraft {
    BookDraft {
        title: book.title,
        author: book.author,
        isbn: book.isbn,
        description: book.description,
        genre: book.genre,
        price_cents: book.price_cents,
        stock: book.stock,
        cover_url: book.cover_url,
        published_year: book.published_year,
    }
}

impl BookPatch {
    fn apply(self, mut draft: BookDraft) -> BookDraft {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(author) = self.author {
            draft.author = author;
        }
        if let Some(isbn) = self.isbn {
            draft.isbn = Some(isbn);
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(genre) = self.genre {
            draft.genre = genre;
        }
        if let Some(price) = self.price_cents {
            draft.price_cents = price;
        }
        if let Some(stock) = self.stock {
            draft.stock = stock;
        }
        if let Some(cover_url) = self.cover_url {
            draft.cover_url = Some(cover_url);
        }
        if let Some(year) = self.published_year {
            draft.published_year = Some(year);
        }
        draft
    }
}

fn draft_from_csv(row: CsvBookRow) -> Result<BookDraft> {
    let price_cents = parse_price(&row.price).map_err(BookhavenError::validation)?;
    validate_draft(BookDraft {
        title: row.title,
        author: row.author,
        isbn: Some(row.isbn),
        description: row.description,
        genre: row.genre,
        price_cents,
        stock: row.stock,
        cover_url: Some(row.cover_url),
        published_year: row.published_year,
    })
}

// ============ BookService Implementation ============

pub struct BookService {
    storage: Arc<SeaOrmStorage>,
}

impl BookService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn list(&self, filter: BookFilter, page: u64, page_size: u64) -> Result<Page<Book>> {
        if let (Some(min), Some(max)) = (filter.min_price_cents, filter.max_price_cents)
            && min > max
        {
            return Err(BookhavenError::validation(
                "min_price cannot be greater than max_price",
            ));
        }
        let page = page.max(1);
        self.storage
            .list_books(&filter, page, effective_page_size(page_size))
            .await
    }

    pub async fn get(&self, id: i32) -> Result<Book> {
        self.storage
            .get_book(id)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("Book {} not found", id)))
    }

    pub async fn genres(&self) -> Result<Vec<String>> {
        self.storage.list_genres().await
    }

    async fn ensure_isbn_free(&self, isbn: Option<&str>, except: Option<i32>) -> Result<()> {
        if let Some(isbn) = isbn
            && let Some(existing) = self.storage.find_book_by_isbn(isbn).await?
            && Some(existing.id) != except
        {
            return Err(BookhavenError::conflict(format!(
                "A book with ISBN {} already exists",
                isbn
            )));
        }
        Ok(())
    }

    pub async fn create(&self, input: BookInput) -> Result<Book> {
        let draft = validate_draft(input.into())?;
        self.ensure_isbn_free(draft.isbn.as_deref(), None).await?;
        self.storage.create_book(&draft).await
    }

    pub async fn update(&self, id: i32, patch: BookPatch) -> Result<Book> {
        let existing = self.get(id).await?;
        let draft = validate_draft(patch.apply(draft_from_book(existing)))?;
        self.ensure_isbn_free(draft.isbn.as_deref(), Some(id)).await?;
        self.storage.update_book(id, &draft).await
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        self.storage.delete_book(id).await
    }

    // ============ CSV ============

    pub async fn export_csv(&self) -> Result<Vec<u8>> {
        let books = self.storage.all_books().await?;
        info!("BookService: exporting {} books", books.len());
        export_books_csv(&books)
    }

    /// 导入 CSV
    ///
    /// 无 ISBN 的行总是新增；同一文件中重复的 ISBN 记为失败。
    pub async fn import_csv(&self, data: &[u8], mode: ImportMode) -> Result<ImportResult> {
        let rows = parse_books_csv(data)?;
        let mut result = ImportResult::default();

        // Step 1: 逐行校验
        let mut valid: Vec<(usize, BookDraft)> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for (line, row) in rows {
            let raw_isbn = row
                .as_ref()
                .ok()
                .map(|r| normalize_isbn(&r.isbn))
                .filter(|s| !s.is_empty());
            let draft = match row.map_err(BookhavenError::validation).and_then(draft_from_csv) {
                Ok(draft) => draft,
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(ImportRowError {
                        line,
                        isbn: raw_isbn,
                        message: e.message().to_string(),
                    });
                    continue;
                }
            };
            if let Some(isbn) = &draft.isbn
                && !seen.insert(isbn.clone())
            {
                result.failed += 1;
                result.errors.push(ImportRowError {
                    line,
                    isbn: Some(isbn.clone()),
                    message: "Duplicate ISBN within file".to_string(),
                });
                continue;
            }
            valid.push((line, draft));
        }

        // Step 2: 批量查询已存在的 ISBN
        let isbns: Vec<String> = seen.into_iter().collect();
        let existing: HashMap<String, Book> = self.storage.find_books_by_isbns(&isbns).await?;

        // Step 3: 按模式分流
        let mut inserts = Vec::new();
        let mut overwrites = Vec::new();
        for (line, draft) in valid {
            let Some(book) = draft.isbn.as_ref().and_then(|isbn| existing.get(isbn)) else {
                inserts.push(draft);
                continue;
            };
            match mode {
                ImportMode::Skip => result.skipped += 1,
                ImportMode::Overwrite => overwrites.push((book.id, draft)),
                ImportMode::Error => {
                    result.failed += 1;
                    result.errors.push(ImportRowError {
                        line,
                        isbn: draft.isbn,
                        message: "Already exists".to_string(),
                    });
                }
            }
        }

        let (inserted, updated) = self.storage.import_books(inserts, overwrites).await?;
        result.success = inserted + updated;

        if result.failed > 0 {
            warn!(
                "BookService: import finished with {} failed rows",
                result.failed
            );
        }
        info!(
            "BookService: import done, success={} skipped={} failed={}",
            result.success, result.skipped, result.failed
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BookDraft {
        BookDraft {
            title: "  Dune ".into(),
            author: "Frank Herbert".into(),
            isbn: Some("978-0-441-17271-9".into()),
            description: String::new(),
            genre: "Sci-Fi".into(),
            price_cents: 999,
            stock: 3,
            cover_url: Some(String::new()),
            published_year: Some(1965),
        }
    }

    #[test]
    fn test_validate_draft_normalizes() {
        let d = validate_draft(draft()).unwrap();
        assert_eq!(d.title, "Dune");
        assert_eq!(d.isbn.as_deref(), Some("9780441172719"));
        assert_eq!(d.cover_url, None);
    }

    #[test]
    fn test_validate_draft_rejects_bad_fields() {
        let mut d = draft();
        d.isbn = Some("9780441172710".into());
        assert!(matches!(validate_draft(d), Err(BookhavenError::Validation(_))));

        let mut d = draft();
        d.author = "   ".into();
        assert!(validate_draft(d).is_err());

        let mut d = draft();
        d.price_cents = -1;
        assert!(validate_draft(d).is_err());

        let mut d = draft();
        d.price_cents = i64::MAX / 2;
        assert!(matches!(validate_draft(d), Err(BookhavenError::Validation(_))));

        let mut d = draft();
        d.price_cents = MAX_PRICE_CENTS;
        assert!(validate_draft(d).is_ok());

        let mut d = draft();
        d.stock = -5;
        assert!(validate_draft(d).is_err());

        let mut d = draft();
        d.cover_url = Some("ftp://covers/dune.jpg".into());
        assert!(validate_draft(d).is_err());
    }

    #[test]
    fn test_patch_keeps_unset_fields_and_clears_isbn() {
        let base = validate_draft(draft()).unwrap();
        let patch = BookPatch {
            price_cents: Some(1299),
            isbn: Some(String::new()),
            ..Default::default()
        };
        let patched = validate_draft(patch.apply(base)).unwrap();
        assert_eq!(patched.price_cents, 1299);
        assert_eq!(patched.title, "Dune");
        assert_eq!(patched.isbn, None);
    }

    #[test]
    fn test_draft_from_csv_parses_price() {
        let row = CsvBookRow {
            isbn: String::new(),
            title: "Emma".into(),
            author: "Jane Austen".into(),
            genre: "Classics".into(),
            price: "7.5".into(),
            stock: 2,
            published_year: None,
            cover_url: String::new(),
            description: String::new(),
        };
        let d = draft_from_csv(row).unwrap();
        assert_eq!(d.price_cents, 750);
        assert_eq!(d.isbn, None);
    }
}
