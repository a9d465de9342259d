use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::{Validate, ValidationError};

use super::authorize;
use super::importer::references::ReferenceCache;
use crate::auth::{Permission, Role};
use crate::db::DbPool;
use crate::entities::{category, manufacturer, order_item, product, supplier};
use crate::errors::ServiceError;

/// Direction for ordering the product list by stock.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum QuantitySort {
    Asc,
    Desc,
}

/// Filters for [`CatalogService::list_products`]. Ignored for roles
/// without [`Permission::SearchCatalog`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Case-insensitive substring over article, name, description and the
    /// three reference names
    pub search: Option<String>,
    pub supplier_id: Option<i32>,
    pub sort_quantity: Option<QuantitySort>,
}

/// A product with its reference names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub article: String,
    pub name: String,
    pub unit: String,
    pub price: Decimal,
    pub discount: Decimal,
    pub quantity: i32,
    pub description: String,
    pub photo: Option<String>,
    pub category: String,
    pub manufacturer: String,
    pub supplier: String,
}

impl ProductView {
    fn from_parts(
        p: product::Model,
        category: String,
        manufacturer: String,
        supplier: String,
    ) -> Self {
        Self {
            id: p.id,
            article: p.article,
            name: p.name,
            unit: p.unit,
            price: p.price,
            discount: p.discount,
            quantity: p.quantity,
            description: p.description,
            photo: p.photo,
            category,
            manufacturer,
            supplier,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        [
            &self.article,
            &self.name,
            &self.description,
            &self.category,
            &self.manufacturer,
            &self.supplier,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

/// A product as entered by an administrator. Category, manufacturer and
/// supplier are given by name and created on first use.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 255))]
    pub article: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub unit: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(custom = "validate_discount")]
    pub discount: Decimal,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[serde(default)]
    pub description: String,
    pub photo: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    #[validate(length(min = 1, max = 255))]
    pub manufacturer: String,
    #[validate(length(min = 1, max = 255))]
    pub supplier: String,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if product::price_fits(*price) {
        Ok(())
    } else {
        let mut err = ValidationError::new("price");
        err.message = Some("Must be non-negative with at most two decimals".into());
        Err(err)
    }
}

fn validate_discount(discount: &Decimal) -> Result<(), ValidationError> {
    if product::discount_fits(*discount) {
        Ok(())
    } else {
        let mut err = ValidationError::new("discount");
        err.message = Some("Must be a percentage between 0 and 100".into());
        Err(err)
    }
}

/// Catalog queries and product administration.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        role: Role,
        query: ProductQuery,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let db = &*self.db;
        let query = if role.has_permission(Permission::SearchCatalog) {
            query
        } else {
            ProductQuery::default()
        };

        let mut select = product::Entity::find();
        if let Some(supplier_id) = query.supplier_id {
            select = select.filter(product::Column::SupplierId.eq(supplier_id));
        }
        select = match query.sort_quantity {
            Some(QuantitySort::Asc) => select.order_by_asc(product::Column::Quantity),
            Some(QuantitySort::Desc) => select.order_by_desc(product::Column::Quantity),
            None => select,
        };
        let products = select.order_by_asc(product::Column::Article).all(db).await?;

        let categories = names::<category::Entity, _>(db, |m| (m.id, m.name.clone())).await?;
        let manufacturers =
            names::<manufacturer::Entity, _>(db, |m| (m.id, m.name.clone())).await?;
        let suppliers = names::<supplier::Entity, _>(db, |m| (m.id, m.name.clone())).await?;

        let lookup =
            |map: &HashMap<i32, String>, id: i32| map.get(&id).cloned().unwrap_or_default();

        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let views = products
            .into_iter()
            .map(|p| {
                let category = lookup(&categories, p.category_id);
                let manufacturer = lookup(&manufacturers, p.manufacturer_id);
                let supplier = lookup(&suppliers, p.supplier_id);
                ProductView::from_parts(p, category, manufacturer, supplier)
            })
            .filter(|view| needle.as_deref().map_or(true, |n| view.matches(n)))
            .collect();

        Ok(views)
    }

    /// All suppliers ordered by name, for the supplier filter.
    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        let suppliers = supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(suppliers)
    }

    /// Adds a product. The article must not be taken.
    #[instrument(skip(self, input), fields(article = %input.article))]
    pub async fn create_product(
        &self,
        role: Role,
        input: ProductInput,
    ) -> Result<ProductView, ServiceError> {
        authorize(role, Permission::ManageProducts, "create products")?;
        input.validate()?;

        let txn = self.db.begin().await?;
        if find_by_article(&txn, &input.article).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "product '{}' already exists",
                input.article
            )));
        }

        let mut active = <product::ActiveModel as Default>::default();
        apply_input(&txn, &mut active, input).await?;
        let created = active.insert(&txn).await?;
        let view = view_of(&txn, created).await?;
        txn.commit().await?;

        info!(article = %view.article, "created product");
        Ok(view)
    }

    /// Replaces every field of the product currently stored under
    /// `article`. Renaming onto another product's article is a conflict.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        role: Role,
        article: &str,
        input: ProductInput,
    ) -> Result<ProductView, ServiceError> {
        authorize(role, Permission::ManageProducts, "edit products")?;
        input.validate()?;

        let txn = self.db.begin().await?;
        let existing = find_by_article(&txn, article)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{}'", article)))?;
        if input.article != existing.article
            && find_by_article(&txn, &input.article).await?.is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "product '{}' already exists",
                input.article
            )));
        }

        let mut active: product::ActiveModel = existing.into();
        apply_input(&txn, &mut active, input).await?;
        let updated = active.update(&txn).await?;
        let view = view_of(&txn, updated).await?;
        txn.commit().await?;

        info!(article, new_article = %view.article, "updated product");
        Ok(view)
    }

    /// Deletes a product that no order references.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, role: Role, article: &str) -> Result<(), ServiceError> {
        authorize(role, Permission::ManageProducts, "delete products")?;

        let db = &*self.db;
        let product = find_by_article(db, article)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product '{}'", article)))?;

        let references = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(product.id))
            .count(db)
            .await?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "product '{}' is used in {} order item(s)",
                article, references
            )));
        }

        product.delete(db).await?;
        info!(article, "deleted product");
        Ok(())
    }
}

async fn find_by_article<C: ConnectionTrait>(
    db: &C,
    article: &str,
) -> Result<Option<product::Model>, ServiceError> {
    let found = product::Entity::find()
        .filter(product::Column::Article.eq(article))
        .one(db)
        .await?;
    Ok(found)
}

/// Copies `input` onto `active`, resolving reference names to ids.
async fn apply_input<C: ConnectionTrait>(
    db: &C,
    active: &mut product::ActiveModel,
    input: ProductInput,
) -> Result<(), ServiceError> {
    let mut references = ReferenceCache::default();
    active.category_id = Set(references.category(db, &input.category).await?);
    active.manufacturer_id = Set(references.manufacturer(db, &input.manufacturer).await?);
    active.supplier_id = Set(references.supplier(db, &input.supplier).await?);

    active.article = Set(input.article);
    active.name = Set(input.name);
    active.unit = Set(input.unit);
    active.price = Set(input.price);
    active.discount = Set(input.discount);
    active.quantity = Set(input.quantity);
    active.description = Set(input.description);
    active.photo = Set(input.photo.filter(|p| !p.trim().is_empty()));
    Ok(())
}

async fn view_of<C: ConnectionTrait>(
    db: &C,
    p: product::Model,
) -> Result<ProductView, ServiceError> {
    let category = p.find_related(category::Entity).one(db).await?;
    let manufacturer = p.find_related(manufacturer::Entity).one(db).await?;
    let supplier = p.find_related(supplier::Entity).one(db).await?;
    Ok(ProductView::from_parts(
        p,
        category.map(|m| m.name).unwrap_or_default(),
        manufacturer.map(|m| m.name).unwrap_or_default(),
        supplier.map(|m| m.name).unwrap_or_default(),
    ))
}

/// id → name for one of the reference tables.
async fn names<E, F>(
    db: &DatabaseConnection,
    pick: F,
) -> Result<HashMap<i32, String>, ServiceError>
where
    E: EntityTrait,
    F: Fn(&E::Model) -> (i32, String),
{
    let rows = E::find().all(db).await?;
    Ok(rows.iter().map(pick).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn view(article: &str, supplier: &str) -> ProductView {
        ProductView {
            id: 1,
            article: article.to_string(),
            name: "Ботинки".to_string(),
            unit: "шт.".to_string(),
            price: Decimal::ONE,
            discount: Decimal::ZERO,
            quantity: 1,
            description: "Женские ботинки демисезонные".to_string(),
            photo: None,
            category: "Женская обувь".to_string(),
            manufacturer: "Kari".to_string(),
            supplier: supplier.to_string(),
        }
    }

    #[test]
    fn search_matches_cyrillic_case_insensitively() {
        let v = view("A112T4", "Обувь для вас");
        assert!(v.matches("ботинки"));
        assert!(v.matches(&"ОБУВЬ ДЛЯ".to_lowercase()));
        assert!(v.matches("a112"));
        assert!(v.matches("kari"));
        assert!(!v.matches("кеды"));
    }

    fn input() -> ProductInput {
        ProductInput {
            article: "L001T1".to_string(),
            name: "Кеды".to_string(),
            unit: "шт.".to_string(),
            price: Decimal::new(150000, 2),
            discount: Decimal::ZERO,
            quantity: 4,
            description: String::new(),
            photo: None,
            category: "Детская обувь".to_string(),
            manufacturer: "CROSBY".to_string(),
            supplier: "Kari".to_string(),
        }
    }

    #[test]
    fn product_input_validation() {
        assert!(input().validate().is_ok());

        let mut blank = input();
        blank.article = String::new();
        assert!(blank.validate().is_err());

        let mut precise = input();
        precise.price = Decimal::new(19999, 3);
        assert!(precise.validate().is_err());

        let mut discount = input();
        discount.discount = Decimal::from(150);
        assert!(discount.validate().is_err());

        let mut stock = input();
        stock.quantity = -1;
        assert!(stock.validate().is_err());
    }

    #[test]
    fn parses_sort_direction() {
        assert_eq!(QuantitySort::from_str("asc").unwrap(), QuantitySort::Asc);
        assert_eq!(QuantitySort::from_str("DESC").unwrap(), QuantitySort::Desc);
        assert!(QuantitySort::from_str("up").is_err());
    }
}
