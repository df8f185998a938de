use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set, Unchanged};

use crate::models::{normalize_price, Product};

/// Sea-ORM Entity for Products table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Product {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            // SQLite hands decimals back through a float
            price: normalize_price(model.price),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl ActiveModel {
    /// Row for a newly added product; the database assigns the id
    pub fn for_insert(product: Product) -> Self {
        Self {
            id: NotSet,
            name: Set(product.name),
            price: Set(product.price),
            created_at: Set(product.created_at),
            updated_at: Set(product.updated_at),
        }
    }

    /// Changed columns of a modified product; `created_at` is never written
    pub fn for_update(product: Product) -> Self {
        Self {
            id: Unchanged(product.id),
            name: Set(product.name),
            price: Set(product.price),
            created_at: NotSet,
            updated_at: Set(product.updated_at),
        }
    }
}
