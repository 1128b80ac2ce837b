//! 账户资料端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::api::middleware::CurrentUser;
use crate::services::AuthService;

use super::helpers::{api_result, success_response};
use super::types::{ChangePasswordRequest, MessageResponse, UpdateProfileRequest};

pub async fn get_account(CurrentUser(user): CurrentUser) -> ActixResult<impl Responder> {
    Ok(success_response(user))
}

pub async fn update_account(
    CurrentUser(user): CurrentUser,
    body: web::Json<UpdateProfileRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    let result = auth
        .update_profile(user.id, body.name.as_deref(), body.avatar_url.as_deref())
        .await;
    Ok(api_result(result))
}

pub async fn change_password(
    CurrentUser(user): CurrentUser,
    body: web::Json<ChangePasswordRequest>,
    auth: web::Data<Arc<AuthService>>,
) -> ActixResult<impl Responder> {
    let result = auth
        .change_password(
            user.id,
            body.current_password.as_deref(),
            &body.new_password,
        )
        .await
        .map(|()| MessageResponse::new("Password updated"));
    Ok(api_result(result))
}
