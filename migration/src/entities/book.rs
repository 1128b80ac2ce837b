use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: String,
    #[sea_orm(unique)]
    pub isbn: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub genre: String,
    pub price_cents: i64,
    pub stock: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub cover_url: Option<String>,
    pub published_year: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
