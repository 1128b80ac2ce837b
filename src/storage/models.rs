use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;

/// 用户角色
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

/// 订单状态
///
/// Pending → Paid | Cancelled
/// Paid → Shipped | Cancelled
/// Shipped → Delivered
/// Delivered / Cancelled 为终态
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// 顾客自助取消只允许在发货前
    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

/// 优惠券类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TS,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[ts(export, export_to = TS_EXPORT_PATH)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DiscountType {
    /// value 为 1..=100 的百分比
    Percentage,
    /// value 为固定金额（分）
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: Option<String>,
    pub oauth_provider: Option<String>,
    #[serde(skip)]
    #[ts(skip)]
    pub oauth_subject: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// 新用户（写入前）
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: UserRole,
    pub oauth_provider: Option<String>,
    pub oauth_subject: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: String,
    pub genre: String,
    #[ts(type = "number")]
    pub price_cents: i64,
    pub stock: i32,
    pub cover_url: Option<String>,
    pub published_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// 图书写入数据（创建或覆盖导入）
#[derive(Debug, Clone, PartialEq)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub description: String,
    pub genre: String,
    pub price_cents: i64,
    pub stock: i32,
    pub cover_url: Option<String>,
    pub published_year: Option<i32>,
}

/// 购物车行（存储层）
#[derive(Debug, Clone)]
pub struct CartEntry {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct WishlistEntry {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    #[ts(type = "number")]
    pub value: i64,
    #[ts(type = "number")]
    pub min_order_cents: i64,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CouponDraft {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_order_cents: i64,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// 订单行快照（下单时的标题、作者、单价）
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct OrderItem {
    pub book_id: i32,
    pub title: String,
    pub author: String,
    #[ts(type = "number")]
    pub unit_price_cents: i64,
    pub quantity: i32,
}

impl OrderItem {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub user_id: i32,
    pub status: OrderStatus,
    #[ts(type = "number")]
    pub subtotal_cents: i64,
    #[ts(type = "number")]
    pub discount_cents: i64,
    #[ts(type = "number")]
    pub shipping_cents: i64,
    #[ts(type = "number")]
    pub tax_cents: i64,
    #[ts(type = "number")]
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub payment_last4: String,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 结账时写入的订单（事务内一次性落库）
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: String,
    pub user_id: i32,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub shipping_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub coupon_code: Option<String>,
    pub shipping_address: ShippingAddress,
    pub payment_last4: String,
    pub items: Vec<OrderItem>,
}

/// 分页结果
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// 后台统计
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct StoreStats {
    pub total_users: u64,
    pub total_books: u64,
    pub total_orders: u64,
    #[ts(type = "number")]
    pub revenue_cents: i64,
    pub low_stock_books: u64,
    pub pending_orders: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Paid.can_transition_to(Shipped));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(Shipped.can_transition_to(Delivered));

        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Paid));
        assert!(Delivered.is_terminal());
        assert!(!Shipped.is_cancellable());
    }

    #[test]
    fn test_enum_string_forms() {
        assert_eq!(OrderStatus::Cancelled.as_ref(), "cancelled");
        assert_eq!(OrderStatus::from_str("Shipped").ok(), Some(OrderStatus::Shipped));
        assert_eq!(UserRole::from_str("ADMIN").ok(), Some(UserRole::Admin));
        assert_eq!(DiscountType::Percentage.to_string(), "percentage");
        assert!(DiscountType::from_str("bogo").is_err());
    }

    #[test]
    fn test_page_total_pages() {
        let page: Page<i32> = Page {
            items: vec![],
            total: 41,
            page: 1,
            page_size: 20,
        };
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn test_user_serialization_hides_secrets() {
        let user = User {
            id: 1,
            email: "reader@example.com".into(),
            name: "Reader".into(),
            role: UserRole::Customer,
            password_hash: Some("$argon2id$secret".into()),
            oauth_provider: None,
            oauth_subject: Some("subject".into()),
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).expect("serialize");
        assert!(!json.contains("argon2"));
        assert!(!json.contains("subject"));
        assert!(json.contains("\"role\":\"customer\""));
    }
}
