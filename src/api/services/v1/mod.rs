//! REST API v1
//!
//! 所有响应使用统一的 `{ code, message, data }` 包装，
//! `code` 为 [`ErrorCode`]，成功时为 0。

mod account;
mod admin;
pub mod auth;
mod books;
mod cart;
mod coupons;
pub mod error_code;
pub mod helpers;
mod orders;
pub mod routes;
pub mod types;

use actix_web::web;

use crate::services::AppServices;

pub use error_code::ErrorCode;
pub use helpers::{
    CookieBuilder, api_result, error_from_bookhaven, error_response, json_response,
    success_response,
};
pub use routes::api_v1_routes;
pub use types::*;

/// 注册服务到 app_data，并挂载 `/api/v1`
///
/// 集成测试与 `run_server` 共用此函数。
pub fn configure(services: &AppServices) -> impl FnOnce(&mut web::ServiceConfig) + '_ {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(services.storage.clone()))
            .app_data(web::Data::new(services.auth.clone()))
            .app_data(web::Data::new(services.books.clone()))
            .app_data(web::Data::new(services.cart.clone()))
            .app_data(web::Data::new(services.coupons.clone()))
            .app_data(web::Data::new(services.orders.clone()))
            .app_data(web::Data::new(services.admin.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    error_response(
                        actix_web::http::StatusCode::BAD_REQUEST,
                        ErrorCode::BadRequest,
                        &message,
                    ),
                )
                .into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    error_response(
                        actix_web::http::StatusCode::BAD_REQUEST,
                        ErrorCode::BadRequest,
                        &message,
                    ),
                )
                .into()
            }))
            .service(api_v1_routes());
    }
}
