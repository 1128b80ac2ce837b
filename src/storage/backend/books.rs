//! 图书表读写

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait,
};
use tracing::{error, info};

use super::converters::{book_draft_to_active_model, model_to_book};
use super::{BookFilter, BookSort, SeaOrmStorage, page_bounds, retry, write_error};
use crate::errors::{BookhavenError, Result};
use crate::storage::models::{Book, BookDraft, Page};
use crate::utils::validation::normalize_isbn;

use migration::entities::{book, cart_item, wishlist_item};

fn filter_condition(filter: &BookFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        let mut any = Condition::any()
            .add(book::Column::Title.contains(search))
            .add(book::Column::Author.contains(search));
        // ISBN 以规范化形式存储（无连字符）
        let isbn = normalize_isbn(search);
        if !isbn.is_empty() {
            any = any.add(book::Column::Isbn.contains(isbn));
        }
        condition = condition.add(any);
    }

    if let Some(genre) = filter.genre.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(book::Column::Genre.eq(genre));
    }

    if let Some(author) = filter.author.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(book::Column::Author.contains(author));
    }

    if let Some(min) = filter.min_price_cents {
        condition = condition.add(book::Column::PriceCents.gte(min));
    }

    if let Some(max) = filter.max_price_cents {
        condition = condition.add(book::Column::PriceCents.lte(max));
    }

    if filter.in_stock {
        condition = condition.add(book::Column::Stock.gt(0));
    }

    condition
}

fn apply_sort(query: Select<book::Entity>, sort: BookSort) -> Select<book::Entity> {
    // 次级排序用 id，保证分页稳定
    match sort {
        BookSort::Newest => query
            .order_by_desc(book::Column::CreatedAt)
            .order_by_desc(book::Column::Id),
        BookSort::PriceAsc => query
            .order_by_asc(book::Column::PriceCents)
            .order_by_asc(book::Column::Id),
        BookSort::PriceDesc => query
            .order_by_desc(book::Column::PriceCents)
            .order_by_asc(book::Column::Id),
        BookSort::Title => query
            .order_by_asc(book::Column::Title)
            .order_by_asc(book::Column::Id),
    }
}

impl SeaOrmStorage {
    pub async fn list_books(
        &self,
        filter: &BookFilter,
        page: u64,
        page_size: u64,
    ) -> Result<Page<Book>> {
        let db = &self.db;
        let condition = filter_condition(filter);
        let (index, size) = page_bounds(page, page_size);

        let total = retry::with_retry("list_books(count)", self.retry_config, || async {
            book::Entity::find()
                .filter(condition.clone())
                .count(db)
                .await
        })
        .await?;

        let models = retry::with_retry("list_books(data)", self.retry_config, || async {
            apply_sort(book::Entity::find().filter(condition.clone()), filter.sort)
                .paginate(db, size)
                .fetch_page(index)
                .await
        })
        .await?;

        Ok(Page {
            items: models.into_iter().map(model_to_book).collect(),
            total,
            page: index + 1,
            page_size: size,
        })
    }

    pub async fn get_book(&self, id: i32) -> Result<Option<Book>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_book({})", id), self.retry_config, || async {
            book::Entity::find_by_id(id).one(db).await
        })
        .await?;
        Ok(model.map(model_to_book))
    }

    /// 批量获取图书（购物车、心愿单展示）
    pub async fn get_books_by_ids(&self, ids: &[i32]) -> Result<HashMap<i32, Book>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let db = &self.db;
        let models = retry::with_retry("get_books_by_ids", self.retry_config, || async {
            book::Entity::find()
                .filter(book::Column::Id.is_in(ids.iter().copied()))
                .all(db)
                .await
        })
        .await?;

        Ok(models
            .into_iter()
            .map(|m| (m.id, model_to_book(m)))
            .collect())
    }

    pub async fn find_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let model = book::Entity::find()
            .filter(book::Column::Isbn.eq(isbn))
            .one(&self.db)
            .await?;
        Ok(model.map(model_to_book))
    }

    /// 按 ISBN 批量查找（导入用）
    pub async fn find_books_by_isbns(&self, isbns: &[String]) -> Result<HashMap<String, Book>> {
        if isbns.is_empty() {
            return Ok(HashMap::new());
        }
        let models = book::Entity::find()
            .filter(book::Column::Isbn.is_in(isbns.iter().cloned()))
            .all(&self.db)
            .await?;
        Ok(models
            .into_iter()
            .filter_map(|m| {
                let book = model_to_book(m);
                book.isbn.clone().map(|isbn| (isbn, book))
            })
            .collect())
    }

    /// 所有分类（去重、排序）
    pub async fn list_genres(&self) -> Result<Vec<String>> {
        let db = &self.db;
        let genres: Vec<String> = retry::with_retry("list_genres", self.retry_config, || async {
            book::Entity::find()
                .select_only()
                .column(book::Column::Genre)
                .distinct()
                .order_by_asc(book::Column::Genre)
                .into_tuple::<String>()
                .all(db)
                .await
        })
        .await?;
        Ok(genres.into_iter().filter(|g| !g.is_empty()).collect())
    }

    /// 全部图书（导出）
    pub async fn all_books(&self) -> Result<Vec<Book>> {
        match book::Entity::find()
            .order_by_asc(book::Column::Id)
            .all(&self.db)
            .await
        {
            Ok(models) => Ok(models.into_iter().map(model_to_book).collect()),
            Err(e) => {
                error!("加载全部图书失败: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn create_book(&self, draft: &BookDraft) -> Result<Book> {
        let model = book_draft_to_active_model(draft, true)
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "A book with this ISBN already exists"))?;
        info!("Book created: id={} title={}", model.id, model.title);
        Ok(model_to_book(model))
    }

    /// 以完整的 draft 覆盖图书字段
    pub async fn update_book(&self, id: i32, draft: &BookDraft) -> Result<Book> {
        let mut active = book_draft_to_active_model(draft, false);
        active.id = Set(id);
        let model = active.update(&self.db).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => {
                BookhavenError::not_found(format!("Book {} not found", id))
            }
            other => write_error(other, "A book with this ISBN already exists"),
        })?;
        info!("Book updated: id={}", id);
        Ok(model_to_book(model))
    }

    /// 删除图书，同时清理购物车与心愿单中的引用
    ///
    /// 订单行保存的是快照，不受影响
    pub async fn delete_book(&self, id: i32) -> Result<()> {
        let txn = self.db.begin().await?;

        let result = book::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(BookhavenError::not_found(format!("Book {} not found", id)));
        }

        let carts = cart_item::Entity::delete_many()
            .filter(cart_item::Column::BookId.eq(id))
            .exec(&txn)
            .await?;
        let wishlists = wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::BookId.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            "Book {} deleted (removed from {} carts, {} wishlists)",
            id, carts.rows_affected, wishlists.rows_affected
        );
        Ok(())
    }

    /// 批量导入：新增与覆盖在同一事务中
    ///
    /// 返回 (inserted, updated)
    pub async fn import_books(
        &self,
        inserts: Vec<BookDraft>,
        overwrites: Vec<(i32, BookDraft)>,
    ) -> Result<(usize, usize)> {
        let txn = self.db.begin().await?;
        let (inserted, updated) = (inserts.len(), overwrites.len());

        for draft in &inserts {
            book_draft_to_active_model(draft, true)
                .insert(&txn)
                .await
                .map_err(|e| write_error(e, "Duplicate ISBN in import"))?;
        }

        for (id, draft) in &overwrites {
            let mut active = book_draft_to_active_model(draft, false);
            active.id = Set(*id);
            active.update(&txn).await?;
        }

        txn.commit().await?;
        info!(
            "Book import committed: {} inserted, {} updated",
            inserted, updated
        );
        Ok((inserted, updated))
    }
}
