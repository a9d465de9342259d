use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Enum representing the possible statuses of an order.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Maps a status label from the order export. Unknown or blank labels
    /// fall back to `Pending`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Новый" | "В обработке" => OrderStatus::Pending,
            "Завершен" => OrderStatus::Completed,
            "Отменен" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        }
    }
}

/// The `orders` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_number: i32,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub delivery_point_id: Option<i32>,
    pub customer_name: String,
    /// Code the customer presents at the pickup point.
    pub pickup_code: i32,
    pub status: OrderStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::delivery_point::Entity",
        from = "Column::DeliveryPointId",
        to = "super::delivery_point::Column::Id"
    )]
    DeliveryPoint,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::delivery_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryPoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
