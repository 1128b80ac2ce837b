//! SeaORM Model 与领域模型互转
//!
//! 枚举在库里以小写字符串保存，无法识别的值回退到最保守的取值并记录日志。

use std::str::FromStr;

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::storage::models::{
    Book, BookDraft, CartEntry, Coupon, DiscountType, Order, OrderItem, OrderStatus,
    ShippingAddress, User, UserRole, WishlistEntry,
};
use migration::entities::{book, book_order, cart_item, coupon, order_item, user, wishlist_item};

pub fn model_to_user(model: user::Model) -> User {
    let role = UserRole::from_str(&model.role).unwrap_or_else(|_| {
        warn!("Unknown role '{}' for user {}, treating as customer", model.role, model.id);
        UserRole::Customer
    });
    User {
        id: model.id,
        email: model.email,
        name: model.name,
        role,
        password_hash: model.password_hash,
        oauth_provider: model.oauth_provider,
        oauth_subject: model.oauth_subject,
        avatar_url: model.avatar_url,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub fn model_to_book(model: book::Model) -> Book {
    Book {
        id: model.id,
        title: model.title,
        author: model.author,
        isbn: model.isbn,
        description: model.description,
        genre: model.genre,
        price_cents: model.price_cents,
        stock: model.stock.max(0),
        cover_url: model.cover_url,
        published_year: model.published_year,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

/// BookDraft 转 ActiveModel
///
/// 新建时写入 created_at，覆盖更新时保留原值
pub fn book_draft_to_active_model(draft: &BookDraft, is_new: bool) -> book::ActiveModel {
    let now = Utc::now();
    book::ActiveModel {
        id: NotSet,
        title: Set(draft.title.clone()),
        author: Set(draft.author.clone()),
        isbn: Set(draft.isbn.clone()),
        description: Set(draft.description.clone()),
        genre: Set(draft.genre.clone()),
        price_cents: Set(draft.price_cents),
        stock: Set(draft.stock),
        cover_url: Set(draft.cover_url.clone()),
        published_year: Set(draft.published_year),
        created_at: if is_new { Set(now) } else { NotSet },
        updated_at: Set(now),
    }
}

pub fn model_to_cart_entry(model: cart_item::Model) -> CartEntry {
    CartEntry {
        id: model.id,
        user_id: model.user_id,
        book_id: model.book_id,
        quantity: model.quantity,
        added_at: model.added_at,
    }
}

pub fn model_to_wishlist_entry(model: wishlist_item::Model) -> WishlistEntry {
    WishlistEntry {
        id: model.id,
        user_id: model.user_id,
        book_id: model.book_id,
        added_at: model.added_at,
    }
}

pub fn model_to_coupon(model: coupon::Model) -> Coupon {
    let discount_type = DiscountType::from_str(&model.discount_type).unwrap_or_else(|_| {
        warn!(
            "Unknown discount type '{}' for coupon {}, treating as fixed",
            model.discount_type, model.code
        );
        DiscountType::Fixed
    });
    Coupon {
        id: model.id,
        code: model.code,
        description: model.description,
        discount_type,
        value: model.value,
        min_order_cents: model.min_order_cents,
        max_uses: model.max_uses,
        used_count: model.used_count,
        expires_at: model.expires_at,
        active: model.active,
        created_at: model.created_at,
    }
}

pub fn model_to_order_item(model: order_item::Model) -> OrderItem {
    OrderItem {
        book_id: model.book_id,
        title: model.title,
        author: model.author,
        unit_price_cents: model.unit_price_cents,
        quantity: model.quantity,
    }
}

pub fn model_to_order(model: book_order::Model, items: Vec<order_item::Model>) -> Order {
    let status = OrderStatus::from_str(&model.status).unwrap_or_else(|_| {
        warn!(
            "Unknown status '{}' for order {}, treating as pending",
            model.status, model.order_number
        );
        OrderStatus::Pending
    });
    Order {
        id: model.id,
        order_number: model.order_number,
        user_id: model.user_id,
        status,
        subtotal_cents: model.subtotal_cents,
        discount_cents: model.discount_cents,
        shipping_cents: model.shipping_cents,
        tax_cents: model.tax_cents,
        total_cents: model.total_cents,
        coupon_code: model.coupon_code,
        shipping_address: ShippingAddress {
            name: model.ship_name,
            line1: model.ship_line1,
            line2: model.ship_line2,
            city: model.ship_city,
            postal_code: model.ship_postal_code,
            country: model.ship_country,
        },
        payment_last4: model.payment_last4,
        items: items.into_iter().map(model_to_order_item).collect(),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::ActiveValue;

    fn sample_user_model(role: &str) -> user::Model {
        user::Model {
            id: 7,
            email: "reader@example.com".to_string(),
            name: "Reader".to_string(),
            password_hash: None,
            role: role.to_string(),
            oauth_provider: Some("github".to_string()),
            oauth_subject: Some("12345".to_string()),
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_model_to_user_roles() {
        assert_eq!(model_to_user(sample_user_model("admin")).role, UserRole::Admin);
        assert_eq!(
            model_to_user(sample_user_model("customer")).role,
            UserRole::Customer
        );
        // 未知角色不应提升权限
        assert_eq!(
            model_to_user(sample_user_model("superuser")).role,
            UserRole::Customer
        );
    }

    #[test]
    fn test_model_to_book_clamps_negative_stock() {
        let model = book::Model {
            id: 1,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            isbn: None,
            description: String::new(),
            genre: "Science Fiction".to_string(),
            price_cents: 1299,
            stock: -3,
            cover_url: None,
            published_year: Some(1965),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let book = model_to_book(model);
        assert_eq!(book.stock, 0);
        assert!(!book.in_stock());
    }

    #[test]
    fn test_book_draft_to_active_model_update_keeps_created_at() {
        let draft = BookDraft {
            title: "Emma".to_string(),
            author: "Jane Austen".to_string(),
            isbn: Some("9780141439587".to_string()),
            description: String::new(),
            genre: "Classics".to_string(),
            price_cents: 899,
            stock: 4,
            cover_url: None,
            published_year: None,
        };

        let created = book_draft_to_active_model(&draft, true);
        assert!(matches!(created.created_at, ActiveValue::Set(_)));
        assert!(matches!(created.id, ActiveValue::NotSet));

        let updated = book_draft_to_active_model(&draft, false);
        assert!(matches!(updated.created_at, ActiveValue::NotSet));
        if let ActiveValue::Set(price) = updated.price_cents {
            assert_eq!(price, 899);
        }
    }

    #[test]
    fn test_model_to_order_unknown_status() {
        let model = book_order::Model {
            id: 1,
            order_number: "BH-TEST".to_string(),
            user_id: 1,
            status: "lost".to_string(),
            subtotal_cents: 1000,
            discount_cents: 0,
            shipping_cents: 499,
            tax_cents: 0,
            total_cents: 1499,
            coupon_code: None,
            ship_name: "Reader".to_string(),
            ship_line1: "1 Main St".to_string(),
            ship_line2: None,
            ship_city: "Springfield".to_string(),
            ship_postal_code: "12345".to_string(),
            ship_country: "US".to_string(),
            payment_last4: "4242".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![order_item::Model {
            id: 1,
            order_id: 1,
            book_id: 3,
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            unit_price_cents: 500,
            quantity: 2,
        }];
        let order = model_to_order(model, items);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].line_total_cents(), 1000);
        assert_eq!(order.shipping_address.city, "Springfield");
    }
}
