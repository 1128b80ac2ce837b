//! 存储层瞬时故障重试
//!
//! 书目、购物车、订单等读路径在连接池耗尽、SQLite 写锁或死锁时按退避重试。
//! 重试用尽仍失败的报告为 `DatabaseConnection`（HTTP 503），
//! 其余错误立即转成 `BookhavenError` 返回。

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use std::future::Future;
use std::ops::Deref;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::errors::{BookhavenError, Result};

/// 可以等一等再试的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transient {
    /// 连接池取不到连接，或连接中途断开
    Connection,
    /// 锁竞争：导入/结账事务占着写锁时的并发读写
    LockContention,
}

/// SQLite BUSY/LOCKED（含扩展码）、MySQL 死锁/锁等待超时、PostgreSQL 序列化失败/死锁/拿不到锁
const LOCK_CODES: &[&str] = &[
    "5", "6", "261", "262", "517", "1205", "1213", "40001", "40P01", "55P03",
];

/// 驱动没给错误码时按消息判断
const LOCK_MESSAGES: &[&str] = &[
    "database is locked",
    "database table is locked",
    "deadlock",
    "lock wait timeout",
    "could not serialize",
];

pub(crate) fn classify(err: &DbErr) -> Option<Transient> {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Some(Transient::Connection),
        DbErr::Exec(runtime) | DbErr::Query(runtime) => {
            is_lock_contention(runtime).then_some(Transient::LockContention)
        }
        _ => None,
    }
}

fn is_lock_contention(err: &RuntimeErr) -> bool {
    let message = match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            if let Some(code) = sqlx_err.deref().as_database_error().and_then(|e| e.code()) {
                let code: &str = &code;
                return LOCK_CODES.contains(&code);
            }
            sqlx_err.to_string()
        }
        RuntimeErr::Internal(msg) => msg.clone(),
        #[allow(unreachable_patterns)]
        _ => return false,
    };
    let message = message.to_lowercase();
    LOCK_MESSAGES.iter().any(|m| message.contains(m))
}

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl From<&crate::config::DatabaseConfig> for RetryConfig {
    fn from(config: &crate::config::DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }
}

impl RetryConfig {
    /// 第 `retry` 次重试前的等待：base * 2^(retry-1)，封顶 max，再加最多 25% 抖动
    fn delay_before(&self, retry: u32) -> Duration {
        let doubling = retry.saturating_sub(1).min(20);
        let capped = self
            .base_delay_ms
            .saturating_mul(1u64 << doubling)
            .min(self.max_delay_ms);
        let jitter = rand::random_range(0..=capped / 4);
        Duration::from_millis(capped.saturating_add(jitter))
    }
}

/// 执行一次存储读操作，瞬时故障时重试
pub async fn with_retry<T, F, Fut>(operation: &str, config: RetryConfig, mut run: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, DbErr>>,
{
    let mut retries = 0;
    loop {
        let err = match run().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("Storage: '{}' recovered after {} retries", operation, retries);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let Some(kind) = classify(&err) else {
            debug!("Storage: '{}' failed: {}", operation, err);
            return Err(err.into());
        };

        if retries >= config.max_retries {
            error!(
                "Storage: '{}' gave up after {} attempts ({:?}): {}",
                operation,
                retries + 1,
                kind,
                err
            );
            return Err(BookhavenError::database_connection(format!(
                "{} 暂不可用: {}",
                operation, err
            )));
        }

        retries += 1;
        let delay = config.delay_before(retries);
        warn!(
            "Storage: '{}' hit {:?} ({}), retry {}/{} in {:?}",
            operation, kind, err, retries, config.max_retries, delay
        );
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    fn locked() -> DbErr {
        DbErr::Query(RuntimeErr::Internal("database is locked".to_string()))
    }

    #[test]
    fn test_classify_storage_failures() {
        assert_eq!(
            classify(&DbErr::ConnectionAcquire(sea_orm::error::ConnAcquireErr::Timeout)),
            Some(Transient::Connection)
        );
        assert_eq!(classify(&locked()), Some(Transient::LockContention));
        assert_eq!(
            classify(&DbErr::Exec(RuntimeErr::Internal(
                "Deadlock found when trying to get lock; try restarting transaction".to_string()
            ))),
            Some(Transient::LockContention)
        );

        // 重复 ISBN 是业务冲突，重试没有意义
        assert_eq!(
            classify(&DbErr::Exec(RuntimeErr::Internal(
                "UNIQUE constraint failed: books.isbn".to_string()
            ))),
            None
        );
        assert_eq!(
            classify(&DbErr::RecordNotFound("order 42".to_string())),
            None
        );
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 300,
        };
        let ms = |retry| config.delay_before(retry).as_millis() as u64;
        assert!((100..=125).contains(&ms(1)));
        assert!((200..=250).contains(&ms(2)));
        assert!((300..=375).contains(&ms(3)));
        assert!((300..=375).contains(&ms(40)));
    }

    #[test]
    fn test_retry_config_from_database_config() {
        let db = crate::config::DatabaseConfig {
            retry_count: 5,
            retry_base_delay_ms: 20,
            retry_max_delay_ms: 500,
            ..Default::default()
        };
        let config = RetryConfig::from(&db);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.base_delay_ms, 20);
        assert_eq!(config.max_delay_ms, 500);
    }

    #[tokio::test]
    async fn test_cart_read_recovers_after_write_lock_released() {
        let calls = AtomicU32::new(0);

        let items = with_retry("cart_entries", fast(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(locked())
                } else {
                    Ok(vec![(7, 2)])
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![(7, 2)]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_as_unavailable() {
        let calls = AtomicU32::new(0);

        let err = with_retry("get_order(42)", fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(DbErr::ConnectionAcquire(
                    sea_orm::error::ConnAcquireErr::Timeout,
                ))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, BookhavenError::DatabaseConnection(_)));
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.message().contains("get_order(42)"));
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);

        let err = with_retry("get_books_by_ids", fast(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(DbErr::Query(RuntimeErr::Internal(
                    "no such column: books.subtitle".to_string(),
                )))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, BookhavenError::DatabaseOperation(_)));
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
