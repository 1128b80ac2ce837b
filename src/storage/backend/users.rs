//! 用户表读写

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, Condition, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::info;

use super::converters::model_to_user;
use super::{SeaOrmStorage, page_bounds, retry, write_error};
use crate::errors::{BookhavenError, Result};
use crate::storage::models::{NewUser, Page, User, UserRole};

use migration::entities::user;

impl SeaOrmStorage {
    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("find_user({})", id), self.retry_config, || async {
            user::Entity::find_by_id(id).one(db).await
        })
        .await?;
        Ok(model.map(model_to_user))
    }

    /// email 需已规范化为小写
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_email", self.retry_config, || async {
            user::Entity::find()
                .filter(user::Column::Email.eq(email))
                .one(db)
                .await
        })
        .await?;
        Ok(model.map(model_to_user))
    }

    pub async fn find_user_by_oauth(&self, provider: &str, subject: &str) -> Result<Option<User>> {
        let db = &self.db;
        let model = retry::with_retry("find_user_by_oauth", self.retry_config, || async {
            user::Entity::find()
                .filter(user::Column::OauthProvider.eq(provider))
                .filter(user::Column::OauthSubject.eq(subject))
                .one(db)
                .await
        })
        .await?;
        Ok(model.map(model_to_user))
    }

    /// 创建用户
    ///
    /// `promote_if_no_admin` 为 true 时，若库中尚无管理员则该用户成为管理员。
    /// 检查与插入在同一事务中完成。
    pub async fn create_user(&self, new_user: NewUser, promote_if_no_admin: bool) -> Result<User> {
        let txn = self.db.begin().await?;

        let mut role = new_user.role;
        if promote_if_no_admin && role != UserRole::Admin {
            let admins = user::Entity::find()
                .filter(user::Column::Role.eq(UserRole::Admin.as_ref()))
                .count(&txn)
                .await?;
            if admins == 0 {
                role = UserRole::Admin;
            }
        }

        let now = Utc::now();
        let model = user::ActiveModel {
            id: NotSet,
            email: Set(new_user.email.clone()),
            name: Set(new_user.name),
            password_hash: Set(new_user.password_hash),
            role: Set(role.as_ref().to_string()),
            oauth_provider: Set(new_user.oauth_provider),
            oauth_subject: Set(new_user.oauth_subject),
            avatar_url: Set(new_user.avatar_url),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| write_error(e, "Email already registered"))?;

        txn.commit().await?;

        info!("User created: id={} role={}", model.id, role);
        Ok(model_to_user(model))
    }

    /// 更新资料；`avatar_url` 为 Some(None) 表示清除头像
    pub async fn update_user_profile(
        &self,
        id: i32,
        name: Option<String>,
        avatar_url: Option<Option<String>>,
    ) -> Result<User> {
        let mut active: user::ActiveModel = self.require_user_model(id).await?.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(avatar_url) = avatar_url {
            active.avatar_url = Set(avatar_url);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&self.db).await?;
        Ok(model_to_user(model))
    }

    pub async fn set_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        let mut active: user::ActiveModel = self.require_user_model(id).await?.into();
        active.password_hash = Set(Some(password_hash));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;
        info!("Password updated for user {}", id);
        Ok(())
    }

    /// 绑定第三方账号
    pub async fn link_oauth_identity(
        &self,
        id: i32,
        provider: &str,
        subject: &str,
        avatar_url: Option<String>,
    ) -> Result<User> {
        let existing = self.require_user_model(id).await?;
        let keep_avatar = existing.avatar_url.is_some();
        let mut active: user::ActiveModel = existing.into();
        active.oauth_provider = Set(Some(provider.to_string()));
        active.oauth_subject = Set(Some(subject.to_string()));
        if !keep_avatar && avatar_url.is_some() {
            active.avatar_url = Set(avatar_url);
        }
        active.updated_at = Set(Utc::now());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| write_error(e, "OAuth identity already linked"))?;
        info!("Linked {} identity to user {}", provider, id);
        Ok(model_to_user(model))
    }

    pub async fn set_user_role(&self, id: i32, role: UserRole) -> Result<User> {
        let mut active: user::ActiveModel = self.require_user_model(id).await?.into();
        active.role = Set(role.as_ref().to_string());
        active.updated_at = Set(Utc::now());
        let model = active.update(&self.db).await?;
        info!("User {} role set to {}", id, role);
        Ok(model_to_user(model))
    }

    /// 分页列出用户，search 匹配 email / name
    pub async fn list_users(
        &self,
        search: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<Page<User>> {
        let mut condition = Condition::all();
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            condition = condition.add(
                Condition::any()
                    .add(user::Column::Email.contains(search))
                    .add(user::Column::Name.contains(search)),
            );
        }

        let db = &self.db;
        let (index, size) = page_bounds(page, page_size);
        let paginator = user::Entity::find()
            .filter(condition)
            .order_by_asc(user::Column::Id)
            .paginate(db, size);

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(index).await?;

        Ok(Page {
            items: models.into_iter().map(model_to_user).collect(),
            total,
            page: index + 1,
            page_size: size,
        })
    }

    async fn require_user_model(&self, id: i32) -> Result<user::Model> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("User {} not found", id)))
    }
}
