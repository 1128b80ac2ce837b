//! Checkout and order history

use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::errors::{BookhavenError, Result};
use crate::services::coupon_service::discount_for;
use crate::services::effective_page_size;
use crate::services::mail::Notifier;
use crate::services::pricing::PricingRules;
use crate::services::{CartService, CouponService};
use crate::storage::{
    Order, OrderDraft, OrderItem, OrderStatus, Page, SeaOrmStorage, ShippingAddress, User,
};
use crate::utils::generate_order_number;
use crate::utils::validation::luhn_valid;

/// 模拟支付中会被拒绝的卡号尾号
pub const DECLINED_CARD_SUFFIX: &str = "0002";

/// 模拟支付信息，只保留卡号后四位落库
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PaymentDetails {
    pub card_number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvc: String,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
    pub payment: PaymentDetails,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// 校验收货地址，返回去掉首尾空白后的副本
pub fn validate_address(address: &ShippingAddress) -> Result<ShippingAddress> {
    let field = |value: &str, name: &str| -> Result<String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(BookhavenError::validation(format!(
                "Shipping address: {} is required",
                name
            )));
        }
        if value.chars().count() > 200 {
            return Err(BookhavenError::validation(format!(
                "Shipping address: {} is too long",
                name
            )));
        }
        Ok(value.to_string())
    };

    Ok(ShippingAddress {
        name: field(&address.name, "name")?,
        line1: field(&address.line1, "line1")?,
        line2: address
            .line2
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string),
        city: field(&address.city, "city")?,
        postal_code: field(&address.postal_code, "postal_code")?,
        country: field(&address.country, "country")?,
    })
}

/// 模拟扣款，成功时返回卡号后四位
///
/// 卡号 12-19 位且通过 Luhn 校验，有效期不早于当月，CVC 3-4 位。
pub fn simulate_payment(payment: &PaymentDetails, today: chrono::NaiveDate) -> Result<String> {
    let digits: String = payment
        .card_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if !(12..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(BookhavenError::validation("Card number must be 12-19 digits"));
    }
    if !luhn_valid(&digits) {
        return Err(BookhavenError::validation("Card number is invalid"));
    }
    if !(1..=12).contains(&payment.exp_month) {
        return Err(BookhavenError::validation("Expiry month must be 1-12"));
    }
    if (payment.exp_year, payment.exp_month) < (today.year(), today.month()) {
        return Err(BookhavenError::payment_declined("Card has expired"));
    }
    let cvc = payment.cvc.trim();
    if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
        return Err(BookhavenError::validation("CVC must be 3 or 4 digits"));
    }
    if digits.ends_with(DECLINED_CARD_SUFFIX) {
        return Err(BookhavenError::payment_declined(
            "The card was declined by the issuer",
        ));
    }

    Ok(digits[digits.len() - 4..].to_string())
}

pub struct OrderService {
    storage: Arc<SeaOrmStorage>,
    cart: Arc<CartService>,
    coupons: Arc<CouponService>,
    notifier: Notifier,
    pricing: PricingRules,
}

impl OrderService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        cart: Arc<CartService>,
        coupons: Arc<CouponService>,
        notifier: Notifier,
        pricing: PricingRules,
    ) -> Self {
        Self {
            storage,
            cart,
            coupons,
            notifier,
            pricing,
        }
    }

    /// 结账
    ///
    /// 库存与优惠券在 place_order 的事务中再次以条件更新确认，
    /// 这里的检查只用于提前给出更明确的错误。
    pub async fn checkout(&self, user: &User, req: CheckoutRequest) -> Result<Order> {
        let cart = self.cart.get_cart(user.id).await?;
        if cart.items.is_empty() {
            return Err(BookhavenError::cart_empty("Your cart is empty"));
        }

        let address = validate_address(&req.shipping_address)?;

        for line in &cart.items {
            if line.quantity > line.book.stock {
                return Err(BookhavenError::out_of_stock(format!(
                    "Only {} copies of \"{}\" left in stock",
                    line.book.stock.max(0),
                    line.book.title
                )));
            }
        }

        let coupon = match req.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                Some(self.coupons.resolve(code, cart.subtotal_cents).await?)
            }
            _ => None,
        };
        let discount = coupon
            .as_ref()
            .map_or(0, |c| discount_for(c, cart.subtotal_cents));
        let quote = self.pricing.quote(cart.subtotal_cents, discount);

        // 支付放在所有校验之后
        let last4 = simulate_payment(&req.payment, Utc::now().date_naive())?;

        let draft = OrderDraft {
            order_number: generate_order_number(),
            user_id: user.id,
            status: OrderStatus::Paid,
            subtotal_cents: quote.subtotal_cents,
            discount_cents: quote.discount_cents,
            shipping_cents: quote.shipping_cents,
            tax_cents: quote.tax_cents,
            total_cents: quote.total_cents,
            coupon_code: coupon.map(|c| c.code),
            shipping_address: address,
            payment_last4: last4,
            items: cart
                .items
                .iter()
                .map(|line| OrderItem {
                    book_id: line.book.id,
                    title: line.book.title.clone(),
                    author: line.book.author.clone(),
                    unit_price_cents: line.book.price_cents,
                    quantity: line.quantity,
                })
                .collect(),
        };

        let order = self.storage.place_order(draft).await?;
        self.notifier.order_confirmation(user, &order).await;
        Ok(order)
    }

    pub async fn list_orders(&self, user: &User, page: u64, page_size: u64) -> Result<Page<Order>> {
        self.storage
            .list_orders(Some(user.id), None, page, effective_page_size(page_size))
            .await
    }

    /// 其他用户的订单对普通用户表现为不存在
    pub async fn get_order(&self, user: &User, id: i32) -> Result<Order> {
        match self.storage.get_order(id).await? {
            Some(order) if order.user_id == user.id || user.is_admin() => Ok(order),
            _ => Err(BookhavenError::not_found(format!("Order {} not found", id))),
        }
    }

    /// 顾客取消自己的订单（发货前）
    pub async fn cancel_order(&self, user: &User, id: i32) -> Result<Order> {
        let order = match self.storage.get_order(id).await? {
            Some(order) if order.user_id == user.id => order,
            _ => return Err(BookhavenError::not_found(format!("Order {} not found", id))),
        };
        if !order.status.is_cancellable() {
            return Err(BookhavenError::invalid_order_transition(format!(
                "Order {} is {} and can no longer be cancelled",
                order.order_number, order.status
            )));
        }

        let cancelled = self
            .storage
            .transition_order(id, order.status, OrderStatus::Cancelled)
            .await?;
        info!("Order {} cancelled by customer", cancelled.order_number);
        self.notifier.order_status_changed(user, &cancelled).await;
        Ok(cancelled)
    }

    // ============ Admin ============

    pub async fn list_all_orders(
        &self,
        status: Option<OrderStatus>,
        page: u64,
        page_size: u64,
    ) -> Result<Page<Order>> {
        self.storage
            .list_orders(None, status, page, effective_page_size(page_size))
            .await
    }

    pub async fn update_status(&self, id: i32, next: OrderStatus) -> Result<Order> {
        let order = self
            .storage
            .get_order(id)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("Order {} not found", id)))?;

        if !order.status.can_transition_to(next) {
            return Err(BookhavenError::invalid_order_transition(format!(
                "Cannot move order {} from {} to {}",
                order.order_number, order.status, next
            )));
        }

        let updated = self.storage.transition_order(id, order.status, next).await?;

        match self.storage.find_user_by_id(updated.user_id).await? {
            Some(customer) => self.notifier.order_status_changed(&customer, &updated).await,
            None => warn!(
                "Order {} has no customer account, skipping notification",
                updated.order_number
            ),
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn payment(card: &str, month: u32, year: i32) -> PaymentDetails {
        PaymentDetails {
            card_number: card.into(),
            exp_month: month,
            exp_year: year,
            cvc: "123".into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    #[test]
    fn test_payment_accepts_test_card() {
        let last4 = simulate_payment(&payment("4242 4242 4242 4242", 12, 2030), today()).unwrap();
        assert_eq!(last4, "4242");
        // 当月到期仍然有效
        assert!(simulate_payment(&payment("4242424242424242", 6, 2026), today()).is_ok());
    }

    #[test]
    fn test_payment_rejections() {
        let err = simulate_payment(&payment("4242424242424241", 12, 2030), today()).unwrap_err();
        assert!(matches!(err, BookhavenError::Validation(_)));

        let err = simulate_payment(&payment("4242424242424242", 5, 2026), today()).unwrap_err();
        assert!(matches!(err, BookhavenError::PaymentDeclined(_)));

        let err = simulate_payment(&payment("4000000000000002", 12, 2030), today()).unwrap_err();
        assert!(matches!(err, BookhavenError::PaymentDeclined(_)));

        let mut p = payment("4242424242424242", 12, 2030);
        p.cvc = "12".into();
        assert!(simulate_payment(&p, today()).is_err());

        assert!(simulate_payment(&payment("4242", 12, 2030), today()).is_err());
    }

    #[test]
    fn test_validate_address() {
        let address = ShippingAddress {
            name: " Reader ".into(),
            line1: "1 Main St".into(),
            line2: Some("  ".into()),
            city: "Springfield".into(),
            postal_code: "12345".into(),
            country: "US".into(),
        };
        let cleaned = validate_address(&address).unwrap();
        assert_eq!(cleaned.name, "Reader");
        assert_eq!(cleaned.line2, None);

        let mut missing = address;
        missing.city = String::new();
        assert!(validate_address(&missing).is_err());
    }
}
