use std::collections::HashMap;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, Set,
};

use crate::entities::{category, manufacturer, supplier};

/// Name → id maps for the three name-keyed entities, filled as product rows
/// are imported. Names are matched exactly, case included.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    categories: HashMap<String, i32>,
    manufacturers: HashMap<String, i32>,
    suppliers: HashMap<String, i32>,
}

impl ReferenceCache {
    pub async fn category<C: ConnectionTrait>(&mut self, db: &C, name: &str) -> Result<i32, DbErr> {
        if let Some(id) = self.categories.get(name) {
            return Ok(*id);
        }
        let created = find_or_insert::<category::Entity, _, _, _>(
            db,
            category::Column::Name,
            name,
            || category::ActiveModel {
                name: Set(name.to_string()),
                ..Default::default()
            },
        )
        .await?;
        self.categories.insert(name.to_string(), created.id);
        Ok(created.id)
    }

    pub async fn manufacturer<C: ConnectionTrait>(
        &mut self,
        db: &C,
        name: &str,
    ) -> Result<i32, DbErr> {
        if let Some(id) = self.manufacturers.get(name) {
            return Ok(*id);
        }
        let created = find_or_insert::<manufacturer::Entity, _, _, _>(
            db,
            manufacturer::Column::Name,
            name,
            || manufacturer::ActiveModel {
                name: Set(name.to_string()),
                ..Default::default()
            },
        )
        .await?;
        self.manufacturers.insert(name.to_string(), created.id);
        Ok(created.id)
    }

    pub async fn supplier<C: ConnectionTrait>(&mut self, db: &C, name: &str) -> Result<i32, DbErr> {
        if let Some(id) = self.suppliers.get(name) {
            return Ok(*id);
        }
        let created = find_or_insert::<supplier::Entity, _, _, _>(
            db,
            supplier::Column::Name,
            name,
            || supplier::ActiveModel {
                name: Set(name.to_string()),
                ..Default::default()
            },
        )
        .await?;
        self.suppliers.insert(name.to_string(), created.id);
        Ok(created.id)
    }
}

/// Look up a row by an exact column match, inserting `create()` when absent.
async fn find_or_insert<E, A, C, F>(
    db: &C,
    column: E::Column,
    value: &str,
    create: F,
) -> Result<E::Model, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: IntoActiveModel<A>,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
    F: FnOnce() -> A,
{
    if let Some(found) = E::find().filter(column.eq(value)).one(db).await? {
        return Ok(found);
    }
    create().insert(db).await
}
