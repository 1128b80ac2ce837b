//! 购物车与收藏夹端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::api::middleware::CurrentUser;
use crate::services::CartService;

use super::helpers::api_result;
use super::types::{AddCartItemRequest, MessageResponse, SetQuantityRequest};

pub async fn get_cart(
    CurrentUser(user): CurrentUser,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(cart.get_cart(user.id).await))
}

pub async fn add_item(
    CurrentUser(user): CurrentUser,
    body: web::Json<AddCartItemRequest>,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        cart.add_item(user.id, body.book_id, body.quantity).await,
    ))
}

pub async fn set_quantity(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    body: web::Json<SetQuantityRequest>,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        cart.set_quantity(user.id, path.into_inner(), body.quantity)
            .await,
    ))
}

pub async fn remove_item(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(cart.remove_item(user.id, path.into_inner()).await))
}

pub async fn clear_cart(
    CurrentUser(user): CurrentUser,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    let result = cart
        .clear(user.id)
        .await
        .map(|()| MessageResponse::new("Cart cleared"));
    Ok(api_result(result))
}

// ============ Wishlist ============

pub async fn get_wishlist(
    CurrentUser(user): CurrentUser,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(cart.wishlist(user.id).await))
}

pub async fn add_to_wishlist(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        cart.add_to_wishlist(user.id, path.into_inner()).await,
    ))
}

pub async fn remove_from_wishlist(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        cart.remove_from_wishlist(user.id, path.into_inner()).await,
    ))
}

/// 加入购物车并移出收藏夹，返回最新购物车
pub async fn move_to_cart(
    CurrentUser(user): CurrentUser,
    path: web::Path<i32>,
    cart: web::Data<Arc<CartService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(cart.move_to_cart(user.id, path.into_inner()).await))
}
