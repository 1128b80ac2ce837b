//! Shopping cart and wishlist

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use ts_rs::TS;

use crate::config::TS_EXPORT_PATH;
use crate::errors::{BookhavenError, Result};
use crate::storage::{Book, SeaOrmStorage};

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CartLine {
    pub book: Book,
    pub quantity: i32,
    #[ts(type = "number")]
    pub line_total_cents: i64,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct CartView {
    pub items: Vec<CartLine>,
    /// 所有行的数量之和
    pub item_count: i32,
    #[ts(type = "number")]
    pub subtotal_cents: i64,
}

impl CartView {
    fn from_lines(items: Vec<CartLine>) -> Self {
        let item_count = items.iter().map(|l| l.quantity).sum();
        let subtotal_cents = items.iter().map(|l| l.line_total_cents).sum();
        Self {
            items,
            item_count,
            subtotal_cents,
        }
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export, export_to = TS_EXPORT_PATH)]
pub struct WishlistLine {
    pub book: Book,
    pub added_at: DateTime<Utc>,
}

pub struct CartService {
    storage: Arc<SeaOrmStorage>,
    max_quantity: i32,
}

impl CartService {
    pub fn new(storage: Arc<SeaOrmStorage>, max_quantity: i32) -> Self {
        Self {
            storage,
            max_quantity: max_quantity.max(1),
        }
    }

    async fn require_book(&self, book_id: i32) -> Result<Book> {
        self.storage
            .get_book(book_id)
            .await?
            .ok_or_else(|| BookhavenError::not_found(format!("Book {} not found", book_id)))
    }

    /// 数量范围与库存检查
    fn check_quantity(&self, book: &Book, quantity: i32) -> Result<()> {
        if quantity < 1 || quantity > self.max_quantity {
            return Err(BookhavenError::validation(format!(
                "Quantity must be between 1 and {}",
                self.max_quantity
            )));
        }
        if quantity > book.stock {
            return Err(BookhavenError::out_of_stock(format!(
                "Only {} copies of \"{}\" left in stock",
                book.stock.max(0),
                book.title
            )));
        }
        Ok(())
    }

    pub async fn get_cart(&self, user_id: i32) -> Result<CartView> {
        let entries = self.storage.cart_entries(user_id).await?;
        let ids: Vec<i32> = entries.iter().map(|e| e.book_id).collect();
        let books = self.storage.get_books_by_ids(&ids).await?;

        // 已删除的图书在 delete_book 时一并清理，这里只做兜底过滤
        let lines = entries
            .into_iter()
            .filter_map(|entry| {
                books.get(&entry.book_id).map(|book| CartLine {
                    line_total_cents: book.price_cents * entry.quantity as i64,
                    book: book.clone(),
                    quantity: entry.quantity,
                })
            })
            .collect();
        Ok(CartView::from_lines(lines))
    }

    /// 加入购物车，已有该书时累加数量
    pub async fn add_item(&self, user_id: i32, book_id: i32, quantity: i32) -> Result<CartView> {
        if quantity < 1 {
            return Err(BookhavenError::validation("Quantity must be at least 1"));
        }
        let book = self.require_book(book_id).await?;
        let current = self
            .storage
            .find_cart_entry(user_id, book_id)
            .await?
            .map_or(0, |e| e.quantity);

        let total = current.saturating_add(quantity);
        self.check_quantity(&book, total)?;
        self.storage.set_cart_quantity(user_id, book_id, total).await?;

        info!("Cart: user {} added book {} (now x{})", user_id, book_id, total);
        self.get_cart(user_id).await
    }

    /// 设置数量；0 表示移除
    pub async fn set_quantity(&self, user_id: i32, book_id: i32, quantity: i32) -> Result<CartView> {
        if self.storage.find_cart_entry(user_id, book_id).await?.is_none() {
            return Err(BookhavenError::not_found(format!(
                "Book {} is not in your cart",
                book_id
            )));
        }

        if quantity == 0 {
            self.storage.remove_cart_entry(user_id, book_id).await?;
        } else {
            let book = self.require_book(book_id).await?;
            self.check_quantity(&book, quantity)?;
            self.storage.set_cart_quantity(user_id, book_id, quantity).await?;
        }
        self.get_cart(user_id).await
    }

    pub async fn remove_item(&self, user_id: i32, book_id: i32) -> Result<CartView> {
        if !self.storage.remove_cart_entry(user_id, book_id).await? {
            return Err(BookhavenError::not_found(format!(
                "Book {} is not in your cart",
                book_id
            )));
        }
        self.get_cart(user_id).await
    }

    pub async fn clear(&self, user_id: i32) -> Result<()> {
        let removed = self.storage.clear_cart(user_id).await?;
        info!("Cart: user {} cleared {} lines", user_id, removed);
        Ok(())
    }

    // ============ Wishlist ============

    pub async fn wishlist(&self, user_id: i32) -> Result<Vec<WishlistLine>> {
        let entries = self.storage.wishlist_entries(user_id).await?;
        let ids: Vec<i32> = entries.iter().map(|e| e.book_id).collect();
        let books = self.storage.get_books_by_ids(&ids).await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| {
                books.get(&entry.book_id).map(|book| WishlistLine {
                    book: book.clone(),
                    added_at: entry.added_at,
                })
            })
            .collect())
    }

    /// 重复添加不报错
    pub async fn add_to_wishlist(&self, user_id: i32, book_id: i32) -> Result<Vec<WishlistLine>> {
        self.require_book(book_id).await?;
        if self.storage.add_wishlist_entry(user_id, book_id).await? {
            info!("Wishlist: user {} added book {}", user_id, book_id);
        }
        self.wishlist(user_id).await
    }

    pub async fn remove_from_wishlist(
        &self,
        user_id: i32,
        book_id: i32,
    ) -> Result<Vec<WishlistLine>> {
        if !self.storage.remove_wishlist_entry(user_id, book_id).await? {
            return Err(BookhavenError::not_found(format!(
                "Book {} is not in your wishlist",
                book_id
            )));
        }
        self.wishlist(user_id).await
    }

    /// 购物车数量 +1，再从心愿单移除
    pub async fn move_to_cart(&self, user_id: i32, book_id: i32) -> Result<CartView> {
        let in_wishlist = self
            .storage
            .wishlist_entries(user_id)
            .await?
            .iter()
            .any(|e| e.book_id == book_id);
        if !in_wishlist {
            return Err(BookhavenError::not_found(format!(
                "Book {} is not in your wishlist",
                book_id
            )));
        }

        let book = self.require_book(book_id).await?;
        let current = self
            .storage
            .find_cart_entry(user_id, book_id)
            .await?
            .map_or(0, |e| e.quantity);
        let total = current.saturating_add(1);
        self.check_quantity(&book, total)?;

        self.storage
            .move_wishlist_entry_to_cart(user_id, book_id, total)
            .await?;
        info!("Wishlist: user {} moved book {} to cart", user_id, book_id);
        self.get_cart(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(price_cents: i64, stock: i32) -> Book {
        Book {
            id: 7,
            title: "Emma".into(),
            author: "Jane Austen".into(),
            isbn: None,
            description: String::new(),
            genre: "Classics".into(),
            price_cents,
            stock,
            cover_url: None,
            published_year: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::from_lines(vec![
            CartLine {
                book: book(1000, 5),
                quantity: 2,
                line_total_cents: 2000,
            },
            CartLine {
                book: book(499, 5),
                quantity: 1,
                line_total_cents: 499,
            },
        ]);
        assert_eq!(view.item_count, 3);
        assert_eq!(view.subtotal_cents, 2499);
    }
}
