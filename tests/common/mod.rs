//! 集成测试公共环境
//!
//! 每个测试使用独立的 SQLite 文件；配置与 JWT 密钥在进程内共享。

#![allow(dead_code)]

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, web};
use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use bookhaven::api::services::{AppStartTime, health_routes, v1};
use bookhaven::config::{OAuthProviderConfig, StaticConfig, init_config_with};
use bookhaven::errors::Result;
use bookhaven::services::mail::MemoryMailer;
use bookhaven::services::{AppServices, AuthSession, BookInput, OAuthExchange, OAuthProfile};
use bookhaven::storage::{Book, SeaOrmStorage};

pub const ADMIN_EMAIL: &str = "admin@bookhaven.test";
pub const PASSWORD: &str = "correct-horse-42";
pub const FRONTEND_URL: &str = "http://localhost:3000";
pub const GOOD_CARD: &str = "4242424242424242";

pub fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.auth.jwt_secret = "integration-test-secret-with-enough-length".to_string();
    config.server.frontend_url = FRONTEND_URL.to_string();
    config.shop.shipping_flat_cents = 499;
    config.shop.free_shipping_threshold_cents = 3500;
    config.shop.tax_rate_bps = 0;
    config.oauth.google = Some(OAuthProviderConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        auth_url: "https://accounts.example.com/authorize".to_string(),
        token_url: "https://accounts.example.com/token".to_string(),
        userinfo_url: "https://accounts.example.com/userinfo".to_string(),
        redirect_url: "http://localhost:8080/api/v1/auth/oauth/google/callback".to_string(),
        scopes: vec!["openid".to_string(), "email".to_string()],
    });
    config
}

/// 不访问网络的 OAuth 交换：code 即为 subject
pub struct FakeExchange;

#[async_trait]
impl OAuthExchange for FakeExchange {
    async fn exchange(
        &self,
        _provider: &str,
        _config: &OAuthProviderConfig,
        code: &str,
    ) -> Result<OAuthProfile> {
        Ok(OAuthProfile {
            subject: code.to_string(),
            email: Some(format!("{}@oauth.example", code)),
            email_verified: true,
            name: Some("OAuth Reader".to_string()),
            avatar_url: None,
        })
    }
}

pub struct TestContext {
    _dir: TempDir,
    pub services: AppServices,
    pub mailer: Arc<MemoryMailer>,
    /// 管理员（第一个注册的账号）
    pub admin: AuthSession,
}

impl TestContext {
    pub async fn new() -> Self {
        let config = test_config();
        init_config_with(config.clone());

        let dir = TempDir::new().expect("创建临时目录失败");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let storage = Arc::new(
            SeaOrmStorage::new(&db_url, "sqlite")
                .await
                .expect("创建存储失败"),
        );

        let mailer = Arc::new(MemoryMailer::new());
        let services = AppServices::build(&config, storage, mailer.clone(), Arc::new(FakeExchange));

        let admin = services
            .auth
            .register(ADMIN_EMAIL, "Admin", PASSWORD)
            .await
            .expect("注册管理员失败");
        assert!(admin.user.is_admin());
        mailer.clear();

        Self {
            _dir: dir,
            services,
            mailer,
            admin,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody + use<>>,
            Error = actix_web::Error,
            InitError = (),
        > + use<>,
    > {
        App::new()
            .app_data(web::Data::new(AppStartTime {
                start_datetime: chrono::Utc::now(),
            }))
            .configure(v1::configure(&self.services))
            .service(health_routes())
    }

    /// 直接通过服务注册顾客
    pub async fn customer(&self, email: &str) -> AuthSession {
        self.services
            .auth
            .register(email, "Reader", PASSWORD)
            .await
            .expect("注册顾客失败")
    }

    pub async fn book(&self, title: &str, price_cents: i64, stock: i32) -> Book {
        self.services
            .books
            .create(BookInput {
                title: title.to_string(),
                author: "Test Author".to_string(),
                isbn: None,
                description: String::new(),
                genre: "Fiction".to_string(),
                price_cents,
                stock,
                cover_url: None,
                published_year: None,
            })
            .await
            .expect("创建图书失败")
    }
}

pub fn bearer(session: &AuthSession) -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", session.tokens.access_token),
    )
}

pub fn checkout_body(card: &str, coupon: Option<&str>) -> Value {
    serde_json::json!({
        "shipping_address": {
            "name": "Reader",
            "line1": "1 Main St",
            "city": "Springfield",
            "postal_code": "12345",
            "country": "US"
        },
        "payment": {
            "card_number": card,
            "exp_month": 12,
            "exp_year": 2099,
            "cvc": "123"
        },
        "coupon_code": coupon
    })
}
