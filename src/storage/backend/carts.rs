//! 购物车与心愿单

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::debug;

use super::converters::{model_to_cart_entry, model_to_wishlist_entry};
use super::{SeaOrmStorage, retry};
use crate::errors::Result;
use crate::storage::models::{CartEntry, WishlistEntry};

use migration::entities::{cart_item, wishlist_item};

/// 写入购物车行的最终数量（已存在则覆盖）
async fn put_cart_quantity<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    book_id: i32,
    quantity: i32,
) -> std::result::Result<cart_item::Model, sea_orm::DbErr> {
    let existing = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::BookId.eq(book_id))
        .one(conn)
        .await?;

    match existing {
        Some(model) => {
            let mut active: cart_item::ActiveModel = model.into();
            active.quantity = Set(quantity);
            active.update(conn).await
        }
        None => {
            cart_item::ActiveModel {
                id: NotSet,
                user_id: Set(user_id),
                book_id: Set(book_id),
                quantity: Set(quantity),
                added_at: Set(Utc::now()),
            }
            .insert(conn)
            .await
        }
    }
}

impl SeaOrmStorage {
    pub async fn cart_entries(&self, user_id: i32) -> Result<Vec<CartEntry>> {
        let db = &self.db;
        let models = retry::with_retry("cart_entries", self.retry_config, || async {
            cart_item::Entity::find()
                .filter(cart_item::Column::UserId.eq(user_id))
                .order_by_asc(cart_item::Column::AddedAt)
                .order_by_asc(cart_item::Column::Id)
                .all(db)
                .await
        })
        .await?;
        Ok(models.into_iter().map(model_to_cart_entry).collect())
    }

    pub async fn find_cart_entry(&self, user_id: i32, book_id: i32) -> Result<Option<CartEntry>> {
        let model = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::BookId.eq(book_id))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_cart_entry))
    }

    pub async fn set_cart_quantity(
        &self,
        user_id: i32,
        book_id: i32,
        quantity: i32,
    ) -> Result<CartEntry> {
        let model = put_cart_quantity(&self.db, user_id, book_id, quantity).await?;
        debug!("Cart of user {}: book {} x{}", user_id, book_id, quantity);
        Ok(model_to_cart_entry(model))
    }

    /// 返回是否确实删除了一行
    pub async fn remove_cart_entry(&self, user_id: i32, book_id: i32) -> Result<bool> {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::BookId.eq(book_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn clear_cart(&self, user_id: i32) -> Result<u64> {
        let result = cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn wishlist_entries(&self, user_id: i32) -> Result<Vec<WishlistEntry>> {
        let db = &self.db;
        let models = retry::with_retry("wishlist_entries", self.retry_config, || async {
            wishlist_item::Entity::find()
                .filter(wishlist_item::Column::UserId.eq(user_id))
                .order_by_desc(wishlist_item::Column::AddedAt)
                .order_by_desc(wishlist_item::Column::Id)
                .all(db)
                .await
        })
        .await?;
        Ok(models.into_iter().map(model_to_wishlist_entry).collect())
    }

    /// 加入心愿单，已存在时返回 false
    pub async fn add_wishlist_entry(&self, user_id: i32, book_id: i32) -> Result<bool> {
        let exists = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::BookId.eq(book_id))
            .one(&self.db)
            .await?
            .is_some();
        if exists {
            return Ok(false);
        }

        let inserted = wishlist_item::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            book_id: Set(book_id),
            added_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await;

        match inserted {
            Ok(_) => Ok(true),
            // 并发插入同一行时唯一索引兜底
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn remove_wishlist_entry(&self, user_id: i32, book_id: i32) -> Result<bool> {
        let result = wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::BookId.eq(book_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// 心愿单条目移入购物车（同一事务）
    pub async fn move_wishlist_entry_to_cart(
        &self,
        user_id: i32,
        book_id: i32,
        cart_quantity: i32,
    ) -> Result<CartEntry> {
        let txn = self.db.begin().await?;

        let model = put_cart_quantity(&txn, user_id, book_id, cart_quantity).await?;
        wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .filter(wishlist_item::Column::BookId.eq(book_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(model_to_cart_entry(model))
    }
}
