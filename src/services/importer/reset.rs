use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::debug;

use crate::auth::{user, user_profile};
use crate::entities::{category, delivery_point, manufacturer, order, order_item, product, supplier};
use crate::errors::ServiceError;

/// Deletes everything the importer owns, children before parents.
///
/// Superusers created outside the importer are kept; users the importer
/// created earlier are removed even when elevated.
pub async fn reset<C: ConnectionTrait>(db: &C) -> Result<(), ServiceError> {
    let removed = order_item::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted order items");

    let removed = order::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted orders");

    let removed = product::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted products");

    let removed = delivery_point::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted delivery points");

    let removed = user_profile::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted profiles");

    let removed = user::Entity::delete_many()
        .filter(
            Condition::any()
                .add(user::Column::IsSuperuser.eq(false))
                .add(user::Column::Imported.eq(true)),
        )
        .exec(db)
        .await?;
    debug!(rows = removed.rows_affected, "deleted users");

    let removed = category::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted categories");

    let removed = manufacturer::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted manufacturers");

    let removed = supplier::Entity::delete_many().exec(db).await?;
    debug!(rows = removed.rows_affected, "deleted suppliers");

    Ok(())
}
