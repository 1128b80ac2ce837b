//! 下单与订单查询端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::info;

use crate::api::middleware::{AdminUser, CurrentUser};
use crate::services::{CheckoutRequest, OrderService};

use super::helpers::{api_result, created_response, error_from_bookhaven};
use super::types::{OrderListQuery, PaginatedResponse, UpdateOrderStatusRequest};

pub async fn checkout(
    CurrentUser(user): CurrentUser,
    body: web::Json<CheckoutRequest>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    match orders.checkout(&user, body.into_inner()).await {
        Ok(order) => {
            info!(
                "API: user {} checked out order {}",
                user.id, order.order_number
            );
            Ok(created_response(order))
        }
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

pub async fn list_orders(
    CurrentUser(user): CurrentUser,
    query: web::Query<OrderListQuery>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let result = orders
        .list_orders(
            &user,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or_default(),
        )
        .await
        .map(PaginatedResponse::from);
    Ok(api_result(result))
}

pub async fn get_order(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(orders.get_order(&user, path.into_inner()).await))
}

pub async fn cancel_order(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        orders.cancel_order(&user, path.into_inner()).await,
    ))
}

// ============ Admin ============

pub async fn list_all_orders(
    AdminUser(_): AdminUser,
    query: web::Query<OrderListQuery>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let result = orders
        .list_all_orders(
            query.status,
            query.page.unwrap_or(1),
            query.page_size.unwrap_or_default(),
        )
        .await
        .map(PaginatedResponse::from);
    Ok(api_result(result))
}

pub async fn update_order_status(
    AdminUser(admin): AdminUser,
    path: web::Path<i32>,
    body: web::Json<UpdateOrderStatusRequest>,
    orders: web::Data<Arc<OrderService>>,
) -> ActixResult<impl Responder> {
    let id = path.into_inner();
    info!("Admin {} sets order {} to {}", admin.id, id, body.status);
    Ok(api_result(orders.update_status(id, body.status).await))
}
