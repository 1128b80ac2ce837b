pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260901_000001_users_and_books;
mod m20260901_000002_carts_and_orders;
mod m20260915_000001_wishlists_and_coupons;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_users_and_books::Migration),
            Box::new(m20260901_000002_carts_and_orders::Migration),
            Box::new(m20260915_000001_wishlists_and_coupons::Migration),
        ]
    }
}
