//! 后台统计（SeaORM DSL 聚合查询）

use sea_orm::{
    ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QuerySelect,
};
use tracing::error;

use super::SeaOrmStorage;
use crate::errors::Result;
use crate::storage::models::{OrderStatus, StoreStats};

use migration::entities::{book, book_order, user};

#[derive(Debug, FromQueryResult)]
struct RevenueResult {
    revenue: Option<i64>,
}

impl SeaOrmStorage {
    /// `low_stock_threshold`：库存小于等于该值的图书计入低库存
    pub async fn store_stats(&self, low_stock_threshold: i32) -> Result<StoreStats> {
        let db = &self.db;

        let total_users = user::Entity::find().count(db).await?;
        let total_books = book::Entity::find().count(db).await?;
        let total_orders = book_order::Entity::find().count(db).await?;

        let low_stock_books = book::Entity::find()
            .filter(book::Column::Stock.lte(low_stock_threshold))
            .count(db)
            .await?;

        let pending_orders = book_order::Entity::find()
            .filter(book_order::Column::Status.is_in([
                OrderStatus::Pending.as_ref(),
                OrderStatus::Paid.as_ref(),
            ]))
            .count(db)
            .await?;

        // SUM(total_cents) WHERE status != 'cancelled'
        let revenue = book_order::Entity::find()
            .select_only()
            .column_as(book_order::Column::TotalCents.sum(), "revenue")
            .filter(book_order::Column::Status.ne(OrderStatus::Cancelled.as_ref()))
            .into_model::<RevenueResult>()
            .one(db)
            .await;

        let revenue_cents = match revenue {
            Ok(Some(r)) => r.revenue.unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                // PostgreSQL 的 SUM(bigint) 返回 numeric，解码失败时不影响其他指标
                error!("营收统计查询失败: {}", e);
                0
            }
        };

        Ok(StoreStats {
            total_users,
            total_books,
            total_orders,
            revenue_cents,
            low_stock_books,
            pending_orders,
        })
    }
}
