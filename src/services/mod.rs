//! Service layer for business logic
//!
//! HTTP handlers 与 CLI 共用同一套服务，服务之间通过 `Arc` 组合。

mod admin_service;
mod auth_service;
mod book_service;
mod cart_service;
pub mod coupon_service;
pub mod mail;
pub mod oauth;
mod order_service;
pub mod pricing;

use std::sync::Arc;

use crate::config::StaticConfig;
use crate::errors::Result;
use crate::storage::SeaOrmStorage;

pub use admin_service::AdminService;
pub use auth_service::{AuthService, AuthSession, AuthTokens};
pub use book_service::*;
pub use cart_service::{CartLine, CartService, CartView, WishlistLine};
pub use coupon_service::{CouponInput, CouponPreview, CouponService};
pub use mail::{Mailer, Notifier, create_mailer};
pub use oauth::{HttpOAuthExchange, OAuthExchange, OAuthProfile};
pub use order_service::{CheckoutRequest, OrderService, PaymentDetails};
pub use pricing::{PriceQuote, PricingRules};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

/// 0 表示使用默认分页大小
pub(crate) fn effective_page_size(page_size: u64) -> u64 {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size.min(MAX_PAGE_SIZE)
    }
}

/// 全部业务服务
#[derive(Clone)]
pub struct AppServices {
    pub storage: Arc<SeaOrmStorage>,
    pub auth: Arc<AuthService>,
    pub books: Arc<BookService>,
    pub cart: Arc<CartService>,
    pub coupons: Arc<CouponService>,
    pub orders: Arc<OrderService>,
    pub admin: Arc<AdminService>,
}

impl AppServices {
    /// 按配置组装；mailer 与 OAuth 交换实现由调用方注入
    pub fn build(
        config: &StaticConfig,
        storage: Arc<SeaOrmStorage>,
        mailer: Arc<dyn Mailer>,
        oauth_exchange: Arc<dyn OAuthExchange>,
    ) -> Self {
        let notifier = Notifier::new(mailer, &config.server.frontend_url, &config.shop.currency);

        let cart = Arc::new(CartService::new(
            storage.clone(),
            config.shop.max_quantity_per_item,
        ));
        let pricing = PricingRules::from(&config.shop);
        let coupons = Arc::new(CouponService::new(storage.clone(), cart.clone(), pricing));
        let orders = Arc::new(OrderService::new(
            storage.clone(),
            cart.clone(),
            coupons.clone(),
            notifier.clone(),
            pricing,
        ));
        let auth = Arc::new(AuthService::new(
            storage.clone(),
            notifier,
            config.oauth.clone(),
            oauth_exchange,
            config.auth.min_password_length,
        ));

        Self {
            books: Arc::new(BookService::new(storage.clone())),
            admin: Arc::new(AdminService::new(
                storage.clone(),
                config.shop.low_stock_threshold,
            )),
            storage,
            auth,
            cart,
            coupons,
            orders,
        }
    }

    /// 使用全局配置与配置中的 mailer
    pub fn from_config(storage: Arc<SeaOrmStorage>) -> Result<Self> {
        let config = crate::config::get_config();
        let mailer = create_mailer(&config.mail)?;
        let exchange: Arc<dyn OAuthExchange> =
            Arc::new(HttpOAuthExchange::new(oauth::HTTP_TIMEOUT_SECS));
        Ok(Self::build(&config, storage, mailer, exchange))
    }
}
