//! 优惠券表读写

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter,
    QueryOrder,
};
use tracing::info;

use super::converters::model_to_coupon;
use super::{SeaOrmStorage, retry, write_error};
use crate::errors::{BookhavenError, Result};
use crate::storage::models::{Coupon, CouponDraft};

use migration::entities::coupon;

fn draft_to_active_model(draft: &CouponDraft) -> coupon::ActiveModel {
    coupon::ActiveModel {
        id: NotSet,
        code: Set(draft.code.clone()),
        description: Set(draft.description.clone()),
        discount_type: Set(draft.discount_type.as_ref().to_string()),
        value: Set(draft.value),
        min_order_cents: Set(draft.min_order_cents),
        max_uses: Set(draft.max_uses),
        used_count: NotSet,
        expires_at: Set(draft.expires_at),
        active: Set(draft.active),
        created_at: NotSet,
    }
}

impl SeaOrmStorage {
    pub async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let models = coupon::Entity::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .order_by_desc(coupon::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_coupon).collect())
    }

    /// code 需已规范化为大写
    pub async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let db = &self.db;
        let model = retry::with_retry("find_coupon_by_code", self.retry_config, || async {
            coupon::Entity::find()
                .filter(coupon::Column::Code.eq(code))
                .one(db)
                .await
        })
        .await?;
        Ok(model.map(model_to_coupon))
    }

    pub async fn create_coupon(&self, draft: &CouponDraft) -> Result<Coupon> {
        let mut active = draft_to_active_model(draft);
        active.used_count = Set(0);
        active.created_at = Set(Utc::now());

        let model = active
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "Coupon code already exists"))?;
        info!("Coupon created: {}", model.code);
        Ok(model_to_coupon(model))
    }

    /// 更新优惠券，已使用次数保持不变
    pub async fn update_coupon(&self, id: i32, draft: &CouponDraft) -> Result<Coupon> {
        let mut active = draft_to_active_model(draft);
        active.id = Set(id);
        let model = active.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                BookhavenError::not_found(format!("Coupon {} not found", id))
            }
            other => write_error(other, "Coupon code already exists"),
        })?;
        info!("Coupon updated: {}", model.code);
        Ok(model_to_coupon(model))
    }

    pub async fn delete_coupon(&self, id: i32) -> Result<()> {
        let result = coupon::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(BookhavenError::not_found(format!("Coupon {} not found", id)));
        }
        info!("Coupon {} deleted", id);
        Ok(())
    }
}
