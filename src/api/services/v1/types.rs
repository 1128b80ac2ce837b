//! API v1 请求 / 响应类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::services::{AuthSession, CouponInput, ImportMode};
use crate::storage::{BookFilter, BookSort, DiscountType, OrderStatus, Page, User, UserRole};

/// 统一响应包装
#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 分页响应
#[derive(Serialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct PaginationInfo {
    #[ts(type = "number")]
    pub page: u64,
    #[ts(type = "number")]
    pub page_size: u64,
    #[ts(type = "number")]
    pub total: u64,
    #[ts(type = "number")]
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let pagination = PaginationInfo {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            items: page.items,
            pagination,
        }
    }
}

// ============ Auth ============

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// refresh token 可以放在 body 中，也可以走 cookie
#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    #[ts(type = "number")]
    pub expires_in: u64,
}

impl From<AuthSession> for AuthResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            user: session.user,
            access_token: session.tokens.access_token,
            refresh_token: session.tokens.refresh_token,
            expires_in: session.tokens.expires_in,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct OAuthCallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// 用户在提供方页面拒绝授权时返回
    #[serde(default)]
    pub error: Option<String>,
}

// ============ Account ============

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// 空字符串表示清除头像
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
}

// ============ Books ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct BookListQuery {
    pub search: Option<String>,
    pub genre: Option<String>,
    pub author: Option<String>,
    #[ts(type = "number | null")]
    pub min_price: Option<i64>,
    #[ts(type = "number | null")]
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    /// newest | price_asc | price_desc | title
    pub sort: Option<String>,
    #[ts(type = "number | null")]
    pub page: Option<u64>,
    #[ts(type = "number | null")]
    pub page_size: Option<u64>,
}

impl BookListQuery {
    pub fn to_filter(&self) -> Result<BookFilter, String> {
        let sort = match self.sort.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => s
                .parse::<BookSort>()
                .map_err(|_| format!("Invalid sort '{}'. Valid: newest, price_asc, price_desc, title", s))?,
            None => BookSort::default(),
        };
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Ok(BookFilter {
            search: non_empty(&self.search),
            genre: non_empty(&self.genre),
            author: non_empty(&self.author),
            min_price_cents: self.min_price,
            max_price_cents: self.max_price,
            in_stock: self.in_stock.unwrap_or(false),
            sort,
        })
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ImportQuery {
    #[serde(default)]
    pub mode: Option<ImportMode>,
}

// ============ Cart / wishlist ============

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct AddCartItemRequest {
    pub book_id: i32,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SetQuantityRequest {
    pub quantity: i32,
}

// ============ Coupons ============

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CouponPreviewRequest {
    pub code: String,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CouponRequest {
    pub code: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    #[ts(type = "number")]
    pub value: i64,
    #[serde(default)]
    #[ts(type = "number")]
    pub min_order_cents: i64,
    #[serde(default)]
    pub max_uses: Option<i32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl From<CouponRequest> for CouponInput {
    fn from(req: CouponRequest) -> Self {
        Self {
            code: req.code,
            description: req.description,
            discount_type: req.discount_type,
            value: req.value,
            min_order_cents: req.min_order_cents,
            max_uses: req.max_uses,
            expires_at: req.expires_at,
            active: req.active,
        }
    }
}

// ============ Orders ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct OrderListQuery {
    #[ts(type = "number | null")]
    pub page: Option<u64>,
    #[ts(type = "number | null")]
    pub page_size: Option<u64>,
    /// 仅后台使用
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

// ============ Admin ============

#[derive(Deserialize, Clone, Debug, Default, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct UserListQuery {
    pub search: Option<String>,
    #[ts(type = "number | null")]
    pub page: Option<u64>,
    #[ts(type = "number | null")]
    pub page_size: Option<u64>,
}

#[derive(Deserialize, Clone, Debug, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_query_to_filter() {
        let query = BookListQuery {
            search: Some("  ".into()),
            genre: Some("Fantasy".into()),
            sort: Some("price_desc".into()),
            in_stock: Some(true),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert_eq!(filter.search, None);
        assert_eq!(filter.genre.as_deref(), Some("Fantasy"));
        assert_eq!(filter.sort, BookSort::PriceDesc);
        assert!(filter.in_stock);

        let bad = BookListQuery {
            sort: Some("random".into()),
            ..Default::default()
        };
        assert!(bad.to_filter().is_err());
    }

    #[test]
    fn test_paginated_response_from_page() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 23,
            page: 2,
            page_size: 10,
        };
        let resp = PaginatedResponse::from(page);
        assert_eq!(resp.pagination.total_pages, 3);
        assert_eq!(resp.items.len(), 3);
    }
}
