use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Article code, unique across the catalog
    #[sea_orm(unique)]
    pub article: String,

    /// Product name
    pub name: String,

    /// Unit of measure (e.g. "шт.")
    pub unit: String,

    /// Base price
    pub price: Decimal,

    /// Active discount, 0 when none
    pub discount: Decimal,

    /// Quantity in stock
    pub quantity: i32,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// Relative path of the product photo
    pub photo: Option<String>,

    pub category_id: i32,
    pub manufacturer_id: i32,
    pub supplier_id: i32,
}

/// Product entity relations
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::manufacturer::Entity",
        from = "Column::ManufacturerId",
        to = "super::manufacturer::Column::Id"
    )]
    Manufacturer,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::manufacturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manufacturer.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Price fits the `decimal(12, 2)` column: non-negative, at most two
/// fractional digits and ten integer digits.
pub fn price_fits(price: Decimal) -> bool {
    !price.is_sign_negative()
        && price.normalize().scale() <= 2
        && price < Decimal::new(10_000_000_000, 0)
}

/// Discount is a percentage with at most two fractional digits.
pub fn discount_fits(discount: Decimal) -> bool {
    !discount.is_sign_negative()
        && discount.normalize().scale() <= 2
        && discount <= Decimal::ONE_HUNDRED
}
