pub mod book;
pub mod book_order;
pub mod cart_item;
pub mod coupon;
pub mod order_item;
pub mod user;
pub mod wishlist_item;

pub use book::Entity as BookEntity;
pub use book_order::Entity as OrderEntity;
pub use cart_item::Entity as CartItemEntity;
pub use coupon::Entity as CouponEntity;
pub use order_item::Entity as OrderItemEntity;
pub use user::Entity as UserEntity;
pub use wishlist_item::Entity as WishlistItemEntity;
