//! 认证端点集成测试
//!
//! 注册、登录、刷新、登出、找回密码、OAuth 回调，以及 Bearer / Cookie 两种认证方式。

mod common;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use bookhaven::api::constants::{
    ACCESS_COOKIE_NAME, CSRF_COOKIE_NAME, CSRF_HEADER_NAME, REFRESH_COOKIE_NAME,
};
use common::{FRONTEND_URL, PASSWORD, TestContext, bearer};

fn cookie_value<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

#[actix_rt::test]
async fn test_register_sets_session_cookies() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "Reader@Example.com", "name": "Reader", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(cookie_value(&resp, ACCESS_COOKIE_NAME).is_some());
    assert!(cookie_value(&resp, REFRESH_COOKIE_NAME).is_some());
    assert!(cookie_value(&resp, CSRF_COOKIE_NAME).is_some_and(|v| !v.is_empty()));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["user"]["email"], "reader@example.com");
    // 管理员已存在，新账号为普通顾客
    assert_eq!(body["data"]["user"]["role"], "customer");
    assert!(body["data"]["user"].get("password_hash").is_none());

    // 欢迎邮件
    assert_eq!(ctx.mailer.sent_to("reader@example.com").len(), 1);
}

#[actix_rt::test]
async fn test_register_rejects_duplicates_and_weak_passwords() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": common::ADMIN_EMAIL, "name": "Again", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1009);

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "short@example.com", "name": "Short", "password": "abc"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "not-an-email", "name": "X", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 缺少字段由 JsonConfig 转为统一错误
    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "x@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1000);
}

#[actix_rt::test]
async fn test_login_success_and_failure() {
    let ctx = TestContext::new().await;
    ctx.customer("reader@example.com").await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "reader@example.com", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["data"]["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["data"]["expires_in"], 15 * 60);

    let req = TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "reader@example.com", "password": "wrong-password"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 2000);

    // 未知邮箱与错误密码返回相同错误
    let req = TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "nobody@example.com", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_login_rate_limited_after_burst() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    // 请求体不完整，避免密码哈希拖慢请求而让令牌回补
    let mut statuses = Vec::new();
    for _ in 0..6 {
        let req = TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({}))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }
    assert!(statuses[..5].iter().all(|s| *s == StatusCode::BAD_REQUEST));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[actix_rt::test]
async fn test_account_requires_authentication() {
    let ctx = TestContext::new().await;
    let session = ctx.customer("reader@example.com").await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::get().uri("/api/v1/account").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1001);

    let req = TestRequest::get()
        .uri("/api/v1/account")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 2002);

    // Bearer
    let req = TestRequest::get()
        .uri("/api/v1/account")
        .insert_header(bearer(&session))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["email"], "reader@example.com");

    // Cookie
    let req = TestRequest::get()
        .uri("/api/v1/account")
        .cookie(Cookie::new(
            ACCESS_COOKIE_NAME,
            session.tokens.access_token.clone(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // refresh token 不能当作 access token 使用
    let req = TestRequest::get()
        .uri("/api/v1/account")
        .insert_header((
            "Authorization",
            format!("Bearer {}", session.tokens.refresh_token),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_update_profile_and_change_password() {
    let ctx = TestContext::new().await;
    let session = ctx.customer("reader@example.com").await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::put()
        .uri("/api/v1/account")
        .insert_header(bearer(&session))
        .set_json(json!({"name": "Book Worm"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["name"], "Book Worm");

    let req = TestRequest::put()
        .uri("/api/v1/account/password")
        .insert_header(bearer(&session))
        .set_json(json!({"current_password": "wrong-password", "new_password": "another-pass-99"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::put()
        .uri("/api/v1/account/password")
        .insert_header(bearer(&session))
        .set_json(json!({"current_password": PASSWORD, "new_password": "another-pass-99"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert!(
        ctx.services
            .auth
            .login("reader@example.com", "another-pass-99")
            .await
            .is_ok()
    );
    assert!(
        ctx.services
            .auth
            .login("reader@example.com", PASSWORD)
            .await
            .is_err()
    );
}

#[actix_rt::test]
async fn test_refresh_from_body_and_cookie() {
    let ctx = TestContext::new().await;
    let session = ctx.customer("reader@example.com").await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({"refresh_token": session.tokens.refresh_token}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(cookie_value(&resp, ACCESS_COOKIE_NAME).is_some());

    let req = TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .cookie(Cookie::new(
            REFRESH_COOKIE_NAME,
            session.tokens.refresh_token.clone(),
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // access token 不能用于刷新
    let req = TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({"refresh_token": session.tokens.access_token}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = TestRequest::post().uri("/api/v1/auth/refresh").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_logout_expires_cookies() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post().uri("/api/v1/auth/logout").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<_> = resp.response().cookies().collect();
    for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, CSRF_COOKIE_NAME] {
        let cookie = cookies
            .iter()
            .find(|c| c.name() == name)
            .expect("cookie should be cleared");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::ZERO));
    }
}

/// 从邮件正文中取出 reset token
fn reset_token_from(body: &str) -> String {
    let start = body.find("token=").expect("reset link") + "token=".len();
    body[start..]
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[actix_rt::test]
async fn test_password_reset_flow() {
    let ctx = TestContext::new().await;
    ctx.customer("reader@example.com").await;
    ctx.mailer.clear();
    let app = test::init_service(ctx.app()).await;

    // 未注册邮箱同样返回成功，且不发邮件
    let req = TestRequest::post()
        .uri("/api/v1/auth/password/forgot")
        .set_json(json!({"email": "ghost@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(ctx.mailer.outbox().is_empty());

    let req = TestRequest::post()
        .uri("/api/v1/auth/password/forgot")
        .set_json(json!({"email": "reader@example.com"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let sent = ctx.mailer.sent_to("reader@example.com");
    assert_eq!(sent.len(), 1);
    let token = reset_token_from(&sent[0].body);

    let req = TestRequest::post()
        .uri("/api/v1/auth/password/reset")
        .set_json(json!({"token": token, "new_password": "brand-new-pass-1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert!(
        ctx.services
            .auth
            .login("reader@example.com", "brand-new-pass-1")
            .await
            .is_ok()
    );

    // 同一链接只能使用一次
    let req = TestRequest::post()
        .uri("/api/v1/auth/password/reset")
        .set_json(json!({"token": token, "new_password": "another-pass-2"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_oauth_login_flow() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::get().uri("/api/v1/auth/providers").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"], json!(["google"]));

    let req = TestRequest::get()
        .uri("/api/v1/auth/oauth/github")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = TestRequest::get()
        .uri("/api/v1/auth/oauth/google")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp
        .headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .expect("Location header")
        .to_string();
    let url = url::Url::parse(&location).unwrap();
    assert!(location.starts_with("https://accounts.example.com/authorize"));
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .expect("state parameter");

    let req = TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/oauth/google/callback?code=reader42&state={}",
            state
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get("Location").unwrap(),
        &format!("{}/oauth/callback", FRONTEND_URL)
    );
    assert!(cookie_value(&resp, ACCESS_COOKIE_NAME).is_some());

    let user = ctx
        .services
        .storage
        .find_user_by_email("reader42@oauth.example")
        .await
        .unwrap()
        .expect("OAuth user created");
    assert_eq!(user.oauth_provider.as_deref(), Some("google"));
    assert!(!user.is_admin());

    // state 只能使用一次
    let req = TestRequest::get()
        .uri(&format!(
            "/api/v1/auth/oauth/google/callback?code=reader42&state={}",
            state
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    let location = resp.headers().get("Location").unwrap().to_str().unwrap();
    assert!(location.starts_with(&format!("{}/oauth/callback?error=", FRONTEND_URL)));
}

#[actix_rt::test]
async fn test_cookie_session_writes_require_csrf_token() {
    let ctx = TestContext::new().await;
    let book = ctx.book("Alpha", 1000, 5).await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "reader@example.com", "name": "Reader", "password": PASSWORD}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let access = cookie_value(&resp, ACCESS_COOKIE_NAME).unwrap();
    let csrf = cookie_value(&resp, CSRF_COOKIE_NAME).unwrap();

    // 跨站表单：只有浏览器自动附带的 Cookie
    let req = TestRequest::post()
        .uri("/api/v1/cart/items")
        .insert_header(("Origin", "https://evil.example"))
        .cookie(Cookie::new(ACCESS_COOKIE_NAME, access.clone()))
        .cookie(Cookie::new(CSRF_COOKIE_NAME, csrf.clone()))
        .set_json(json!({"book_id": book.id, "quantity": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 2003);

    // header 与 Cookie 不一致
    let req = TestRequest::post()
        .uri("/api/v1/cart/items")
        .cookie(Cookie::new(ACCESS_COOKIE_NAME, access.clone()))
        .cookie(Cookie::new(CSRF_COOKIE_NAME, csrf.clone()))
        .insert_header((CSRF_HEADER_NAME, "forged"))
        .set_json(json!({"book_id": book.id, "quantity": 1}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    // 读操作不需要 CSRF
    let req = TestRequest::get()
        .uri("/api/v1/cart")
        .cookie(Cookie::new(ACCESS_COOKIE_NAME, access.clone()))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["item_count"], 0);

    let req = TestRequest::post()
        .uri("/api/v1/cart/items")
        .cookie(Cookie::new(ACCESS_COOKIE_NAME, access))
        .cookie(Cookie::new(CSRF_COOKIE_NAME, csrf.clone()))
        .insert_header((CSRF_HEADER_NAME, csrf))
        .set_json(json!({"book_id": book.id, "quantity": 1}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["item_count"], 1);
}

#[actix_rt::test]
async fn test_bearer_writes_skip_csrf_check() {
    let ctx = TestContext::new().await;
    let session = ctx.customer("reader@example.com").await;
    let book = ctx.book("Alpha", 1000, 5).await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::post()
        .uri(&format!("/api/v1/wishlist/{}", book.id))
        .insert_header(bearer(&session))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}
