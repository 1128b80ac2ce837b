//! 后台统计、用户管理与健康检查集成测试

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::{Value, json};

use common::{ADMIN_EMAIL, GOOD_CARD, TestContext, bearer};

#[actix_rt::test]
async fn test_store_stats() {
    let ctx = TestContext::new().await;
    let reader = ctx.customer("reader@example.com").await;
    let alpha = ctx.book("Alpha", 1000, 10).await;
    ctx.book("Beta", 1500, 2).await;

    ctx.services
        .cart
        .add_item(reader.user.id, alpha.id, 1)
        .await
        .unwrap();
    let req = serde_json::from_value(common::checkout_body(GOOD_CARD, None)).unwrap();
    let first = ctx.services.orders.checkout(&reader.user, req).await.unwrap();

    ctx.services
        .cart
        .add_item(reader.user.id, alpha.id, 2)
        .await
        .unwrap();
    let req = serde_json::from_value(common::checkout_body(GOOD_CARD, None)).unwrap();
    ctx.services.orders.checkout(&reader.user, req).await.unwrap();
    ctx.services
        .orders
        .cancel_order(&reader.user, first.id)
        .await
        .unwrap();

    let app = test::init_service(ctx.app()).await;
    let req = TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header(bearer(&ctx.admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let stats = &body["data"];
    assert_eq!(stats["total_users"], 2);
    assert_eq!(stats["total_books"], 2);
    assert_eq!(stats["total_orders"], 2);
    // 取消的订单不计入营收
    assert_eq!(stats["revenue_cents"], 2000 + 499);
    assert_eq!(stats["pending_orders"], 1);
    assert_eq!(stats["low_stock_books"], 1);
}

#[actix_rt::test]
async fn test_admin_routes_reject_customers() {
    let ctx = TestContext::new().await;
    let reader = ctx.customer("reader@example.com").await;
    let app = test::init_service(ctx.app()).await;

    for uri in ["/api/v1/admin/stats", "/api/v1/admin/users", "/api/v1/admin/orders"] {
        let req = TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&reader))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], 1003);
    }

    let req = TestRequest::get().uri("/api/v1/admin/stats").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn test_list_users_and_search() {
    let ctx = TestContext::new().await;
    ctx.customer("alice@example.com").await;
    ctx.customer("bob@example.com").await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::get()
        .uri("/api/v1/admin/users")
        .insert_header(bearer(&ctx.admin))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["data"]["pagination"]["total"], 3);
    // 密码哈希不出现在响应中
    assert!(body["data"]["items"][0].get("password_hash").is_none());

    let req = TestRequest::get()
        .uri("/api/v1/admin/users?search=alice")
        .insert_header(bearer(&ctx.admin))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["email"], "alice@example.com");
}

#[actix_rt::test]
async fn test_role_changes_take_effect_immediately() {
    let ctx = TestContext::new().await;
    let helper = ctx.customer("helper@example.com").await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::put()
        .uri(&format!("/api/v1/admin/users/{}/role", helper.user.id))
        .insert_header(bearer(&ctx.admin))
        .set_json(json!({"role": "admin"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["role"], "admin");

    // 旧 token 中角色仍为 customer，中间件按 token 拦截
    let req = TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header(bearer(&helper))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    // 重新登录后拿到管理员 token
    let promoted = ctx
        .services
        .auth
        .login("helper@example.com", common::PASSWORD)
        .await
        .unwrap();
    let req = TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header(bearer(&promoted))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // 降级后，仍持有管理员 token 也会被数据库复核拒绝
    let req = TestRequest::put()
        .uri(&format!("/api/v1/admin/users/{}/role", helper.user.id))
        .insert_header(bearer(&ctx.admin))
        .set_json(json!({"role": "customer"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header(bearer(&promoted))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1003);
}

#[actix_rt::test]
async fn test_admin_cannot_demote_self() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::put()
        .uri(&format!("/api/v1/admin/users/{}/role", ctx.admin.user.id))
        .insert_header(bearer(&ctx.admin))
        .set_json(json!({"role": "customer"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = TestRequest::put()
        .uri("/api/v1/admin/users/9999/role")
        .insert_header(bearer(&ctx.admin))
        .set_json(json!({"role": "admin"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = TestRequest::put()
        .uri(&format!("/api/v1/admin/users/{}/role", ctx.admin.user.id))
        .insert_header(bearer(&ctx.admin))
        .set_json(json!({"role": "superuser"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::BAD_REQUEST
    );

    let admin = ctx
        .services
        .auth
        .login(ADMIN_EMAIL, common::PASSWORD)
        .await
        .unwrap();
    assert!(admin.user.is_admin());
}

#[actix_rt::test]
async fn test_health_endpoints() {
    let ctx = TestContext::new().await;
    let app = test::init_service(ctx.app()).await;

    let req = TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["storage"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["storage"]["backend"], "sqlite");

    let req = TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(body.as_ref(), b"OK");

    let req = TestRequest::get().uri("/health/live").to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );
}
