//! 订单读写
//!
//! 下单与状态变更都在事务中完成：库存扣减 / 回补、优惠券计数、
//! 订单行快照、清空购物车，任何一步失败整体回滚。

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, Condition,
    ConnectionTrait, EntityTrait, ExprTrait, PaginatorTrait, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::Expr,
};
use tracing::info;

use super::converters::model_to_order;
use super::{SeaOrmStorage, page_bounds, retry};
use crate::errors::{BookhavenError, Result};
use crate::storage::models::{Order, OrderDraft, OrderItem, OrderStatus, Page};

use migration::entities::{book, book_order, cart_item, coupon, order_item};

/// 加载一批订单的订单行
async fn attach_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<book_order::Model>,
) -> std::result::Result<Vec<Order>, sea_orm::DbErr> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(ids))
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?;

    let mut grouped: HashMap<i32, Vec<order_item::Model>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|o| {
            let items = grouped.remove(&o.id).unwrap_or_default();
            model_to_order(o, items)
        })
        .collect())
}

/// 回补库存
async fn restock<C: ConnectionTrait>(
    conn: &C,
    items: &[OrderItem],
) -> std::result::Result<(), sea_orm::DbErr> {
    let now = Utc::now();
    for item in items {
        // 图书可能已被删除，影响 0 行即可
        book::Entity::update_many()
            .col_expr(
                book::Column::Stock,
                Expr::col(book::Column::Stock).add(item.quantity),
            )
            .col_expr(book::Column::UpdatedAt, Expr::value(now))
            .filter(book::Column::Id.eq(item.book_id))
            .exec(conn)
            .await?;
    }
    Ok(())
}

impl SeaOrmStorage {
    /// 下单
    ///
    /// 库存按 `stock >= quantity` 条件扣减；优惠券按
    /// `active AND (max_uses IS NULL OR used_count < max_uses)` 条件计数。
    pub async fn place_order(&self, draft: OrderDraft) -> Result<Order> {
        if draft.items.is_empty() {
            return Err(BookhavenError::cart_empty("Cannot place an empty order"));
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        for item in &draft.items {
            let result = book::Entity::update_many()
                .col_expr(
                    book::Column::Stock,
                    Expr::col(book::Column::Stock).sub(item.quantity),
                )
                .col_expr(book::Column::UpdatedAt, Expr::value(now))
                .filter(book::Column::Id.eq(item.book_id))
                .filter(book::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(BookhavenError::out_of_stock(format!(
                    "Not enough stock for \"{}\"",
                    item.title
                )));
            }
        }

        if let Some(code) = &draft.coupon_code {
            let result = coupon::Entity::update_many()
                .col_expr(
                    coupon::Column::UsedCount,
                    Expr::col(coupon::Column::UsedCount).add(1),
                )
                .filter(coupon::Column::Code.eq(code.as_str()))
                .filter(coupon::Column::Active.eq(true))
                .filter(
                    Condition::any()
                        .add(coupon::Column::MaxUses.is_null())
                        .add(
                            Expr::col(coupon::Column::UsedCount)
                                .lt(Expr::col(coupon::Column::MaxUses)),
                        ),
                )
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(BookhavenError::coupon_invalid(format!(
                    "Coupon {} is no longer available",
                    code
                )));
            }
        }

        let address = &draft.shipping_address;
        let order = book_order::ActiveModel {
            id: NotSet,
            order_number: Set(draft.order_number.clone()),
            user_id: Set(draft.user_id),
            status: Set(draft.status.as_ref().to_string()),
            subtotal_cents: Set(draft.subtotal_cents),
            discount_cents: Set(draft.discount_cents),
            shipping_cents: Set(draft.shipping_cents),
            tax_cents: Set(draft.tax_cents),
            total_cents: Set(draft.total_cents),
            coupon_code: Set(draft.coupon_code.clone()),
            ship_name: Set(address.name.clone()),
            ship_line1: Set(address.line1.clone()),
            ship_line2: Set(address.line2.clone()),
            ship_city: Set(address.city.clone()),
            ship_postal_code: Set(address.postal_code.clone()),
            ship_country: Set(address.country.clone()),
            payment_last4: Set(draft.payment_last4.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let item_models: Vec<order_item::ActiveModel> = draft
            .items
            .iter()
            .map(|item| order_item::ActiveModel {
                id: NotSet,
                order_id: Set(order.id),
                book_id: Set(item.book_id),
                title: Set(item.title.clone()),
                author: Set(item.author.clone()),
                unit_price_cents: Set(item.unit_price_cents),
                quantity: Set(item.quantity),
            })
            .collect();
        order_item::Entity::insert_many(item_models)
            .exec(&txn)
            .await?;

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(draft.user_id))
            .exec(&txn)
            .await?;

        let mut placed = attach_items(&txn, vec![order]).await?;
        txn.commit().await?;

        let placed = placed
            .pop()
            .ok_or_else(|| BookhavenError::database_operation("Order vanished after insert"))?;
        info!(
            "Order {} placed by user {}: total={} items={}",
            placed.order_number,
            placed.user_id,
            placed.total_cents,
            placed.items.len()
        );
        Ok(placed)
    }

    pub async fn get_order(&self, id: i32) -> Result<Option<Order>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_order({})", id), self.retry_config, || async {
            book_order::Entity::find_by_id(id).one(db).await
        })
        .await?;

        match model {
            Some(model) => Ok(attach_items(db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    /// 分页列出订单；user_id 为 None 时列出全部（后台）
    pub async fn list_orders(
        &self,
        user_id: Option<i32>,
        status: Option<OrderStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<Page<Order>> {
        let mut condition = Condition::all();
        if let Some(user_id) = user_id {
            condition = condition.add(book_order::Column::UserId.eq(user_id));
        }
        if let Some(status) = status {
            condition = condition.add(book_order::Column::Status.eq(status.as_ref()));
        }

        let db = &self.db;
        let (index, size) = page_bounds(page, page_size);

        let total = retry::with_retry("list_orders(count)", self.retry_config, || async {
            book_order::Entity::find()
                .filter(condition.clone())
                .count(db)
                .await
        })
        .await?;

        let models = retry::with_retry("list_orders(data)", self.retry_config, || async {
            book_order::Entity::find()
                .filter(condition.clone())
                .order_by_desc(book_order::Column::CreatedAt)
                .order_by_desc(book_order::Column::Id)
                .paginate(db, size)
                .fetch_page(index)
                .await
        })
        .await?;

        Ok(Page {
            items: attach_items(db, models).await?,
            total,
            page: index + 1,
            page_size: size,
        })
    }

    /// 状态变更
    ///
    /// 以 `status = from` 为条件更新，并发修改时返回 InvalidOrderTransition。
    /// 转为 Cancelled 时回补库存。
    pub async fn transition_order(
        &self,
        id: i32,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order> {
        let txn = self.db.begin().await?;

        let result = book_order::Entity::update_many()
            .col_expr(book_order::Column::Status, Expr::value(to.as_ref()))
            .col_expr(book_order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(book_order::Column::Id.eq(id))
            .filter(book_order::Column::Status.eq(from.as_ref()))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(BookhavenError::invalid_order_transition(format!(
                "Order {} is no longer {}",
                id, from
            )));
        }

        let model = book_order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("Order {} not found", id)))?;
        let order = attach_items(&txn, vec![model])
            .await?
            .pop()
            .ok_or_else(|| BookhavenError::not_found(format!("Order {} not found", id)))?;

        if to == OrderStatus::Cancelled {
            restock(&txn, &order.items).await?;
        }

        txn.commit().await?;
        info!("Order {} moved {} -> {}", order.order_number, from, to);
        Ok(order)
    }
}
