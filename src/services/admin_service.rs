//! Back-office operations

use std::sync::Arc;

use tracing::info;

use crate::errors::{BookhavenError, Result};
use crate::services::effective_page_size;
use crate::storage::{Page, SeaOrmStorage, StoreStats, User, UserRole};

pub struct AdminService {
    storage: Arc<SeaOrmStorage>,
    low_stock_threshold: i32,
}

impl AdminService {
    pub fn new(storage: Arc<SeaOrmStorage>, low_stock_threshold: i32) -> Self {
        Self {
            storage,
            low_stock_threshold,
        }
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        self.storage.store_stats(self.low_stock_threshold).await
    }

    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<Page<User>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.storage
            .list_users(search, page, effective_page_size(page_size))
            .await
    }

    /// 管理员不能降级自己，避免锁死后台
    pub async fn set_role(&self, actor: &User, user_id: i32, role: UserRole) -> Result<User> {
        if actor.id == user_id && role != UserRole::Admin {
            return Err(BookhavenError::forbidden("You cannot remove your own admin role"));
        }
        let user = self.storage.set_user_role(user_id, role).await?;
        info!("AdminService: user {} set role of {} to {}", actor.id, user_id, role);
        Ok(user)
    }
}
