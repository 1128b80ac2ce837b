//! API v1 路由配置

use actix_web::web;

use crate::api::middleware::{CsrfGuard, UserAuth};

use super::account::{change_password, get_account, update_account};
use super::admin::{get_stats, list_users, set_user_role};
use super::auth::{
    auth_rate_limiter, forgot_password, login, logout, oauth_callback, oauth_providers,
    oauth_start, refresh, register, reset_password,
};
use super::books::{
    create_book, delete_book, export_books, get_book, import_books, list_books, list_genres,
    update_book,
};
use super::cart::{
    add_item, add_to_wishlist, clear_cart, get_cart, get_wishlist, move_to_cart,
    remove_from_wishlist, remove_item, set_quantity,
};
use super::coupons::{create_coupon, delete_coupon, list_coupons, preview_coupon, update_coupon};
use super::orders::{
    cancel_order, checkout, get_order, list_all_orders, list_orders, update_order_status,
};

/// 认证路由 `/auth`（公开）
///
/// 注册、登录、忘记密码带限流
pub fn auth_routes() -> actix_web::Scope {
    web::scope("/auth")
        .route("/register", web::post().to(register).wrap(auth_rate_limiter()))
        .route("/login", web::post().to(login).wrap(auth_rate_limiter()))
        .route("/refresh", web::post().to(refresh))
        .route("/logout", web::post().to(logout))
        .route(
            "/password/forgot",
            web::post().to(forgot_password).wrap(auth_rate_limiter()),
        )
        .route("/password/reset", web::post().to(reset_password))
        .route("/providers", web::get().to(oauth_providers))
        .route("/oauth/{provider}", web::get().to(oauth_start))
        .route("/oauth/{provider}/callback", web::get().to(oauth_callback))
}

/// 图书目录 `/books`（公开）
pub fn books_routes() -> actix_web::Scope {
    web::scope("/books")
        .route("", web::get().to(list_books))
        .route("/genres", web::get().to(list_genres))
        .route("/{id}", web::get().to(get_book))
}

pub fn account_routes() -> actix_web::Scope {
    web::scope("/account")
        .route("", web::get().to(get_account))
        .route("", web::put().to(update_account))
        .route("/password", web::put().to(change_password))
}

pub fn cart_routes() -> actix_web::Scope {
    web::scope("/cart")
        .route("", web::get().to(get_cart))
        .route("", web::delete().to(clear_cart))
        .route("/items", web::post().to(add_item))
        .route("/items/{book_id}", web::put().to(set_quantity))
        .route("/items/{book_id}", web::delete().to(remove_item))
}

pub fn wishlist_routes() -> actix_web::Scope {
    web::scope("/wishlist")
        .route("", web::get().to(get_wishlist))
        .route("/{book_id}", web::post().to(add_to_wishlist))
        .route("/{book_id}", web::delete().to(remove_from_wishlist))
        .route("/{book_id}/move-to-cart", web::post().to(move_to_cart))
}

pub fn coupon_routes() -> actix_web::Scope {
    web::scope("/coupons")
        .route("/preview", web::post().to(preview_coupon))
}

pub fn order_routes() -> actix_web::Scope {
    web::scope("/orders")
        .route("", web::get().to(list_orders))
        .route("/checkout", web::post().to(checkout))
        .route("/{id}", web::get().to(get_order))
        .route("/{id}/cancel", web::post().to(cancel_order))
}

/// 后台路由 `/admin`
///
/// 包含：
/// - GET /admin/stats - 统计
/// - POST/PUT/DELETE /admin/books[/{id}] - 图书维护
/// - GET /admin/books/export, POST /admin/books/import - CSV
/// - /admin/coupons - 优惠券 CRUD
/// - GET /admin/orders, PUT /admin/orders/{id}/status - 订单
/// - GET /admin/users, PUT /admin/users/{id}/role - 用户
pub fn admin_routes() -> actix_web::Scope {
    web::scope("/admin")
        .route("/stats", web::get().to(get_stats))
        .route("/books", web::post().to(create_book))
        // export/import 必须在 /{id} 之前
        .route("/books/export", web::get().to(export_books))
        .route("/books/import", web::post().to(import_books))
        .route("/books/{id}", web::put().to(update_book))
        .route("/books/{id}", web::delete().to(delete_book))
        .route("/coupons", web::get().to(list_coupons))
        .route("/coupons", web::post().to(create_coupon))
        .route("/coupons/{id}", web::put().to(update_coupon))
        .route("/coupons/{id}", web::delete().to(delete_coupon))
        .route("/orders", web::get().to(list_all_orders))
        .route("/orders/{id}/status", web::put().to(update_order_status))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}/role", web::put().to(set_user_role))
}

/// API v1 路由
///
/// 受保护的 scope 在挂载时套上中间件：UserAuth 在外层先写入认证方式，
/// CsrfGuard 再据此校验 Cookie 会话的写操作。
pub fn api_v1_routes() -> actix_web::Scope {
    web::scope(crate::api::constants::API_PREFIX)
        .service(auth_routes())
        .service(books_routes())
        .service(
            account_routes()
                .wrap(CsrfGuard)
                .wrap(UserAuth::customer()),
        )
        .service(cart_routes().wrap(CsrfGuard).wrap(UserAuth::customer()))
        .service(
            wishlist_routes()
                .wrap(CsrfGuard)
                .wrap(UserAuth::customer()),
        )
        .service(coupon_routes().wrap(CsrfGuard).wrap(UserAuth::customer()))
        .service(order_routes().wrap(CsrfGuard).wrap(UserAuth::customer()))
        .service(admin_routes().wrap(CsrfGuard).wrap(UserAuth::admin()))
}
