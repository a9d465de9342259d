use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use validator::Validate;

use super::authorize;
use super::importer::LineItem;
use crate::auth::{Permission, Role};
use crate::db::DbPool;
use crate::entities::{delivery_point, order, order_item, product, OrderStatus};
use crate::errors::ServiceError;

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub article: String,
    pub quantity: i32,
}

impl From<LineItem> for OrderLine {
    fn from(item: LineItem) -> Self {
        Self {
            article: item.article,
            quantity: item.quantity,
        }
    }
}

/// An order with its lines and pickup address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: i32,
    pub order_number: i32,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub delivery_address: Option<String>,
    pub customer_name: String,
    pub pickup_code: i32,
    pub status: OrderStatus,
    pub items: Vec<OrderLine>,
}

/// An order as entered by an administrator. Lines name products by article.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderInput {
    #[validate(range(min = 1))]
    pub order_number: i32,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub delivery_point_id: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub customer_name: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub pickup_code: i32,
    #[serde(default = "default_status")]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

fn default_status() -> OrderStatus {
    OrderStatus::Pending
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Orders newest first. Requires [`Permission::ViewOrders`].
    #[instrument(skip(self))]
    pub async fn list_orders(&self, role: Role) -> Result<Vec<OrderView>, ServiceError> {
        authorize(role, Permission::ViewOrders, "view orders")?;

        let db = &*self.db;
        let orders = order::Entity::find()
            .find_also_related(delivery_point::Entity)
            .order_by_desc(order::Column::OrderDate)
            .order_by_desc(order::Column::Id)
            .all(db)
            .await?;

        debug!(orders = orders.len(), "loaded orders");
        views(db, orders).await
    }

    /// Creates an order with its lines in one transaction.
    #[instrument(skip(self, input), fields(order_number = input.order_number))]
    pub async fn create_order(
        &self,
        role: Role,
        input: OrderInput,
    ) -> Result<OrderView, ServiceError> {
        authorize(role, Permission::ManageOrders, "create orders")?;
        check_input(&input)?;

        let txn = self.db.begin().await?;
        let mut active = <order::ActiveModel as Default>::default();
        apply_header(&txn, &mut active, &input).await?;
        let created = active.insert(&txn).await?;
        insert_lines(&txn, created.id, &input.items).await?;
        let view = view_of(&txn, created.id).await?;
        txn.commit().await?;

        info!(id = view.id, order_number = view.order_number, "created order");
        Ok(view)
    }

    /// Replaces the header and every line of order `id`.
    #[instrument(skip(self, input))]
    pub async fn update_order(
        &self,
        role: Role,
        id: i32,
        input: OrderInput,
    ) -> Result<OrderView, ServiceError> {
        authorize(role, Permission::ManageOrders, "edit orders")?;
        check_input(&input)?;

        let txn = self.db.begin().await?;
        let existing = order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {}", id)))?;

        let mut active: order::ActiveModel = existing.into();
        apply_header(&txn, &mut active, &input).await?;
        active.update(&txn).await?;

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?;
        insert_lines(&txn, id, &input.items).await?;
        let view = view_of(&txn, id).await?;
        txn.commit().await?;

        info!(id, items = view.items.len(), "updated order");
        Ok(view)
    }

    /// Deletes order `id` together with its lines.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, role: Role, id: i32) -> Result<(), ServiceError> {
        authorize(role, Permission::ManageOrders, "delete orders")?;

        let txn = self.db.begin().await?;
        let existing = order::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {}", id)))?;

        let removed = order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;
        existing.delete(&txn).await?;
        txn.commit().await?;

        info!(id, items = removed, "deleted order");
        Ok(())
    }
}

fn check_input(input: &OrderInput) -> Result<(), ServiceError> {
    input.validate()?;
    if let Some(line) = input.items.iter().find(|line| line.quantity <= 0) {
        return Err(ServiceError::ValidationError(format!(
            "quantity for '{}' must be positive",
            line.article
        )));
    }
    Ok(())
}

async fn apply_header<C: ConnectionTrait>(
    db: &C,
    active: &mut order::ActiveModel,
    input: &OrderInput,
) -> Result<(), ServiceError> {
    if let Some(point_id) = input.delivery_point_id {
        delivery_point::Entity::find_by_id(point_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("delivery point {}", point_id)))?;
    }

    active.order_number = Set(input.order_number);
    active.order_date = Set(input.order_date);
    active.delivery_date = Set(input.delivery_date);
    active.delivery_point_id = Set(input.delivery_point_id);
    active.customer_name = Set(input.customer_name.clone());
    active.pickup_code = Set(input.pickup_code);
    active.status = Set(input.status);
    Ok(())
}

/// Unknown articles fail the whole operation.
async fn insert_lines<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    lines: &[OrderLine],
) -> Result<(), ServiceError> {
    for line in lines {
        let product = product::Entity::find()
            .filter(product::Column::Article.eq(line.article.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{}'", line.article)))?;

        order_item::ActiveModel {
            order_id: Set(order_id),
            product_id: Set(product.id),
            quantity: Set(line.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn view_of<C: ConnectionTrait>(db: &C, id: i32) -> Result<OrderView, ServiceError> {
    let found = order::Entity::find_by_id(id)
        .find_also_related(delivery_point::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("order {}", id)))?;

    views(db, vec![found])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::NotFound(format!("order {}", id)))
}

/// Attaches lines to each order, keeping the input order.
async fn views<C: ConnectionTrait>(
    db: &C,
    orders: Vec<(order::Model, Option<delivery_point::Model>)>,
) -> Result<Vec<OrderView>, ServiceError> {
    let order_ids: Vec<i32> = orders.iter().map(|(o, _)| o.id).collect();
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .find_also_related(product::Entity)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;

    let mut lines: HashMap<i32, Vec<OrderLine>> = HashMap::new();
    for (item, product) in items {
        let Some(product) = product else {
            continue;
        };
        lines.entry(item.order_id).or_default().push(OrderLine {
            article: product.article,
            quantity: item.quantity,
        });
    }

    Ok(orders
        .into_iter()
        .map(|(o, point)| OrderView {
            items: lines.remove(&o.id).unwrap_or_default(),
            id: o.id,
            order_number: o.order_number,
            order_date: o.order_date,
            delivery_date: o.delivery_date,
            delivery_address: point.map(|p| p.address),
            customer_name: o.customer_name,
            pickup_code: o.pickup_code,
            status: o.status,
        })
        .collect())
}
