//! SeaORM storage backend
//!
//! SQLite（默认）、MySQL/MariaDB、PostgreSQL 均通过同一套实体访问。
//! 每张表的读写拆分在独立文件中。

mod books;
mod carts;
mod connection;
mod converters;
mod coupons;
mod orders;
pub mod retry;
mod stats;
mod users;

use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::warn;

use crate::errors::{BookhavenError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{
    book_draft_to_active_model, model_to_book, model_to_coupon, model_to_order, model_to_user,
};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(BookhavenError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 图书排序方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BookSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Title,
}

/// 图书过滤条件
#[derive(Default, Clone, Debug)]
pub struct BookFilter {
    /// 模糊搜索 title / author / isbn
    pub search: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    /// 只返回有库存的
    pub in_stock: bool,
    pub sort: BookSort,
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(BookhavenError::database_config(
                "database_url 未设置".to_string(),
            ));
        }

        let config = crate::config::get_config();
        let retry_config = retry::RetryConfig::from(&config.database);

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_config,
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// 获取数据库连接
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 健康检查用的轻量查询
    pub async fn ping(&self) -> Result<()> {
        let db = &self.db;
        retry::with_retry("ping", self.retry_config, || async {
            db.execute_unprepared("SELECT 1").await.map(|_| ())
        })
        .await
        .map_err(|e| BookhavenError::database_connection(format!("数据库不可用: {}", e.message())))
    }
}

/// 写操作错误转换：唯一约束冲突映射为 Conflict
pub(crate) fn write_error(e: sea_orm::DbErr, context: &str) -> BookhavenError {
    match e.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) => {
            BookhavenError::conflict(format!("{}: {}", context, detail))
        }
        _ => BookhavenError::database_operation(format!("{}: {}", context, e)),
    }
}

/// 页码与每页数量换算为 (page_index, page_size)
pub(crate) fn page_bounds(page: u64, page_size: u64) -> (u64, u64) {
    (page.max(1) - 1, page_size.max(1))
}
