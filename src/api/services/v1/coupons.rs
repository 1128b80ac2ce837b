//! 优惠券端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;
use tracing::info;

use crate::api::middleware::{AdminUser, CurrentUser};
use crate::services::CouponService;

use super::helpers::{api_result, created_response, error_from_bookhaven};
use super::types::{CouponPreviewRequest, CouponRequest, MessageResponse};

/// 按当前购物车试算优惠
pub async fn preview_coupon(
    CurrentUser(user): CurrentUser,
    body: web::Json<CouponPreviewRequest>,
    coupons: web::Data<Arc<CouponService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(coupons.preview(user.id, &body.code).await))
}

pub async fn list_coupons(
    AdminUser(_): AdminUser,
    coupons: web::Data<Arc<CouponService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(coupons.list().await))
}

pub async fn create_coupon(
    AdminUser(admin): AdminUser,
    body: web::Json<CouponRequest>,
    coupons: web::Data<Arc<CouponService>>,
) -> ActixResult<impl Responder> {
    match coupons.create(body.into_inner().into()).await {
        Ok(coupon) => {
            info!("Admin {} created coupon {}", admin.id, coupon.code);
            Ok(created_response(coupon))
        }
        Err(e) => Ok(error_from_bookhaven(&e)),
    }
}

pub async fn update_coupon(
    AdminUser(_): AdminUser,
    path: web::Path<i32>,
    body: web::Json<CouponRequest>,
    coupons: web::Data<Arc<CouponService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        coupons
            .update(path.into_inner(), body.into_inner().into())
            .await,
    ))
}

pub async fn delete_coupon(
    AdminUser(_): AdminUser,
    path: web::Path<i32>,
    coupons: web::Data<Arc<CouponService>>,
) -> ActixResult<impl Responder> {
    let result = coupons
        .delete(path.into_inner())
        .await
        .map(|()| MessageResponse::new("Coupon deleted"));
    Ok(api_result(result))
}
