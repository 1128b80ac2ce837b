//! 后台统计与用户管理端点

use actix_web::{Responder, Result as ActixResult, web};
use std::sync::Arc;

use crate::api::middleware::AdminUser;
use crate::services::AdminService;

use super::helpers::api_result;
use super::types::{PaginatedResponse, SetRoleRequest, UserListQuery};

pub async fn get_stats(
    AdminUser(_): AdminUser,
    admin: web::Data<Arc<AdminService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(admin.stats().await))
}

pub async fn list_users(
    AdminUser(_): AdminUser,
    query: web::Query<UserListQuery>,
    admin: web::Data<Arc<AdminService>>,
) -> ActixResult<impl Responder> {
    let result = admin
        .list_users(
            query.search.as_deref(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or_default(),
        )
        .await
        .map(PaginatedResponse::from);
    Ok(api_result(result))
}

pub async fn set_user_role(
    AdminUser(actor): AdminUser,
    path: web::Path<i32>,
    body: web::Json<SetRoleRequest>,
    admin: web::Data<Arc<AdminService>>,
) -> ActixResult<impl Responder> {
    Ok(api_result(
        admin.set_role(&actor, path.into_inner(), body.role).await,
    ))
}
