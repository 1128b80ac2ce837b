//! Coupon management and discount calculation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::errors::{BookhavenError, Result};
use crate::services::CartService;
use crate::services::pricing::{PriceQuote, PricingRules};
use crate::storage::{Coupon, CouponDraft, DiscountType, SeaOrmStorage};

/// 规范化券码：去空白、转大写
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// 检查优惠券对给定小计是否可用
pub fn validate_coupon(coupon: &Coupon, subtotal_cents: i64, now: DateTime<Utc>) -> Result<()> {
    if !coupon.active {
        return Err(BookhavenError::coupon_invalid(format!(
            "Coupon {} is not active",
            coupon.code
        )));
    }
    if coupon.expires_at.is_some_and(|exp| exp <= now) {
        return Err(BookhavenError::coupon_invalid(format!(
            "Coupon {} has expired",
            coupon.code
        )));
    }
    if coupon.max_uses.is_some_and(|max| coupon.used_count >= max) {
        return Err(BookhavenError::coupon_invalid(format!(
            "Coupon {} has reached its usage limit",
            coupon.code
        )));
    }
    if subtotal_cents < coupon.min_order_cents {
        return Err(BookhavenError::coupon_invalid(format!(
            "Coupon {} requires a minimum order of {} cents",
            coupon.code, coupon.min_order_cents
        )));
    }
    Ok(())
}

/// 折扣金额
///
/// - percentage: subtotal * value / 100，向下取整
/// - fixed: min(value, subtotal)
pub fn discount_for(coupon: &Coupon, subtotal_cents: i64) -> i64 {
    let subtotal = subtotal_cents.max(0);
    match coupon.discount_type {
        DiscountType::Percentage => subtotal * coupon.value.clamp(0, 100) / 100,
        DiscountType::Fixed => coupon.value.clamp(0, subtotal),
    }
}

/// 创建 / 更新优惠券的输入
#[derive(Debug, Clone)]
pub struct CouponInput {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_order_cents: i64,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl CouponInput {
    fn into_draft(self) -> Result<CouponDraft> {
        let code = normalize_coupon_code(&self.code);
        if code.len() < 3 || code.len() > 32 {
            return Err(BookhavenError::validation(
                "Coupon code must be 3-32 characters",
            ));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BookhavenError::validation(
                "Coupon code may only contain letters, digits, '-' and '_'",
            ));
        }
        match self.discount_type {
            DiscountType::Percentage if !(1..=100).contains(&self.value) => {
                return Err(BookhavenError::validation(
                    "Percentage coupons need a value between 1 and 100",
                ));
            }
            DiscountType::Fixed if self.value <= 0 => {
                return Err(BookhavenError::validation(
                    "Fixed coupons need a positive value",
                ));
            }
            _ => {}
        }
        if self.min_order_cents < 0 {
            return Err(BookhavenError::validation(
                "Minimum order cannot be negative",
            ));
        }
        if self.max_uses.is_some_and(|m| m < 1) {
            return Err(BookhavenError::validation("max_uses must be at least 1"));
        }

        Ok(CouponDraft {
            code,
            description: self.description.trim().to_string(),
            discount_type: self.discount_type,
            value: self.value,
            min_order_cents: self.min_order_cents,
            max_uses: self.max_uses,
            expires_at: self.expires_at,
            active: self.active,
        })
    }
}

/// 优惠券预览结果
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CouponPreview {
    pub code: String,
    pub description: String,
    #[ts(type = "number")]
    pub discount_cents: i64,
    pub quote: PriceQuote,
}

pub struct CouponService {
    storage: Arc<SeaOrmStorage>,
    cart: Arc<CartService>,
    pricing: PricingRules,
}

impl CouponService {
    pub fn new(storage: Arc<SeaOrmStorage>, cart: Arc<CartService>, pricing: PricingRules) -> Self {
        Self {
            storage,
            cart,
            pricing,
        }
    }

    /// 查找并校验优惠券
    pub async fn resolve(&self, code: &str, subtotal_cents: i64) -> Result<Coupon> {
        let code = normalize_coupon_code(code);
        let coupon = self
            .storage
            .find_coupon_by_code(&code)
            .await?
            .ok_or_else(|| BookhavenError::coupon_invalid(format!("Unknown coupon {}", code)))?;
        validate_coupon(&coupon, subtotal_cents, Utc::now())?;
        Ok(coupon)
    }

    /// 针对当前购物车预览优惠
    pub async fn preview(&self, user_id: i32, code: &str) -> Result<CouponPreview> {
        let cart = self.cart.get_cart(user_id).await?;
        if cart.items.is_empty() {
            return Err(BookhavenError::cart_empty("Your cart is empty"));
        }
        let coupon = self.resolve(code, cart.subtotal_cents).await?;
        let discount = discount_for(&coupon, cart.subtotal_cents);
        let quote = self.pricing.quote(cart.subtotal_cents, discount);

        Ok(CouponPreview {
            code: coupon.code,
            description: coupon.description,
            discount_cents: quote.discount_cents,
            quote,
        })
    }

    pub async fn list(&self) -> Result<Vec<Coupon>> {
        self.storage.list_coupons().await
    }

    pub async fn create(&self, input: CouponInput) -> Result<Coupon> {
        let draft = input.into_draft()?;
        if self.storage.find_coupon_by_code(&draft.code).await?.is_some() {
            return Err(BookhavenError::conflict(format!(
                "Coupon {} already exists",
                draft.code
            )));
        }
        let coupon = self.storage.create_coupon(&draft).await?;
        info!("CouponService: created coupon {}", coupon.code);
        Ok(coupon)
    }

    pub async fn update(&self, id: i32, input: CouponInput) -> Result<Coupon> {
        let draft = input.into_draft()?;
        if let Some(other) = self.storage.find_coupon_by_code(&draft.code).await?
            && other.id != id
        {
            return Err(BookhavenError::conflict(format!(
                "Coupon {} already exists",
                draft.code
            )));
        }
        self.storage.update_coupon(id, &draft).await
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        self.storage.delete_coupon(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        Coupon {
            id: 1,
            code: "READMORE".into(),
            description: String::new(),
            discount_type,
            value,
            min_order_cents: 0,
            max_uses: None,
            used_count: 0,
            expires_at: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage_discount_floors() {
        let c = coupon(DiscountType::Percentage, 15);
        // 999 * 15 / 100 = 149.85 → 149
        assert_eq!(discount_for(&c, 999), 149);
        assert_eq!(discount_for(&c, 0), 0);
        assert_eq!(discount_for(&coupon(DiscountType::Percentage, 100), 1234), 1234);
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let c = coupon(DiscountType::Fixed, 500);
        assert_eq!(discount_for(&c, 2000), 500);
        assert_eq!(discount_for(&c, 300), 300);
    }

    #[test]
    fn test_validate_coupon_reasons() {
        let now = Utc::now();

        let mut c = coupon(DiscountType::Fixed, 500);
        assert!(validate_coupon(&c, 1000, now).is_ok());

        c.active = false;
        let err = validate_coupon(&c, 1000, now).unwrap_err();
        assert!(err.message().contains("not active"));

        let mut c = coupon(DiscountType::Fixed, 500);
        c.expires_at = Some(now - Duration::minutes(1));
        assert!(validate_coupon(&c, 1000, now).unwrap_err().message().contains("expired"));

        let mut c = coupon(DiscountType::Fixed, 500);
        c.max_uses = Some(3);
        c.used_count = 3;
        assert!(validate_coupon(&c, 1000, now).unwrap_err().message().contains("usage limit"));

        let mut c = coupon(DiscountType::Fixed, 500);
        c.min_order_cents = 2500;
        assert!(validate_coupon(&c, 2499, now).is_err());
        assert!(validate_coupon(&c, 2500, now).is_ok());
    }

    #[test]
    fn test_coupon_input_validation() {
        let base = CouponInput {
            code: " summer-25 ".into(),
            description: "Summer sale".into(),
            discount_type: DiscountType::Percentage,
            value: 25,
            min_order_cents: 0,
            max_uses: Some(100),
            expires_at: None,
            active: true,
        };
        let draft = base.clone().into_draft().unwrap();
        assert_eq!(draft.code, "SUMMER-25");

        let mut bad = base.clone();
        bad.value = 150;
        assert!(bad.into_draft().is_err());

        let mut bad = base.clone();
        bad.code = "no spaces".into();
        assert!(bad.into_draft().is_err());

        let mut bad = base.clone();
        bad.discount_type = DiscountType::Fixed;
        bad.value = 0;
        assert!(bad.into_draft().is_err());

        let mut bad = base;
        bad.max_uses = Some(0);
        assert!(bad.into_draft().is_err());
    }
}
