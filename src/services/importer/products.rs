use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set};
use tracing::{debug, info};

use super::csv_source::{CsvTable, Row};
use super::references::ReferenceCache;
use super::summary::ImportSummary;
use crate::config::ImportConfig;
use crate::entities::{category, manufacturer, product, supplier};
use crate::errors::ServiceError;

pub const ARTICLE: &str = "Артикул";
pub const NAME: &str = "Наименование товара";
pub const UNIT: &str = "Единица измерения";
pub const PRICE: &str = "Цена";
pub const SUPPLIER: &str = "Поставщик";
pub const MANUFACTURER: &str = "Производитель";
pub const CATEGORY: &str = "Категория товара";
pub const DISCOUNT: &str = "Действующая скидка";
pub const QUANTITY: &str = "Кол-во на складе";
pub const DESCRIPTION: &str = "Описание товара";
pub const PHOTO: &str = "Фото";

const REQUIRED: &[&str] = &[ARTICLE, NAME, UNIT, PRICE, SUPPLIER, MANUFACTURER, CATEGORY];

/// A product row with every field parsed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProductRecord<'a> {
    pub article: &'a str,
    pub name: &'a str,
    pub unit: String,
    pub price: Decimal,
    pub discount: Decimal,
    pub quantity: i32,
    pub description: &'a str,
    pub photo: Option<String>,
    pub category: &'a str,
    pub manufacturer: &'a str,
    pub supplier: &'a str,
}

/// `None` when the row must be skipped: article or price missing, a
/// numeric field that does not parse, or a price or discount the product
/// columns cannot hold.
pub(crate) fn parse_row<'a>(row: &Row<'a>, config: &ImportConfig) -> Option<ProductRecord<'a>> {
    let article = row.get(ARTICLE)?;
    let price = parse_decimal(row.get(PRICE)?).filter(|p| product::price_fits(*p))?;
    let discount = match row.get(DISCOUNT) {
        Some(raw) => parse_decimal(raw).filter(|d| product::discount_fits(*d))?,
        None => Decimal::ZERO,
    };
    let quantity = match row.get(QUANTITY) {
        Some(raw) => raw.parse::<i32>().ok()?,
        None => 0,
    };

    Some(ProductRecord {
        article,
        name: row.text(NAME),
        unit: row
            .get(UNIT)
            .unwrap_or(config.default_unit.as_str())
            .to_string(),
        price,
        discount,
        quantity,
        description: row.text(DESCRIPTION),
        photo: config.photo_path(row.text(PHOTO)),
        category: row.text(CATEGORY),
        manufacturer: row.text(MANUFACTURER),
        supplier: row.text(SUPPLIER),
    })
}

/// Accepts a decimal comma as well as a point.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    let normalized = raw.replace(',', ".");
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Imports the product table, creating categories, manufacturers and
/// suppliers on first sight.
pub async fn import_products<C: ConnectionTrait>(
    db: &C,
    path: &Path,
    config: &ImportConfig,
    summary: &mut ImportSummary,
) -> Result<(), ServiceError> {
    let table = CsvTable::read_with_headers(path).await?;
    table.require_columns(REQUIRED)?;

    let mut references = ReferenceCache::default();
    let mut count = 0u64;

    for row in table.rows() {
        let Some(record) = parse_row(&row, config) else {
            debug!(line = row.line(), "skipping product row");
            summary.skipped_products += 1;
            continue;
        };

        let category_id = references.category(db, record.category).await?;
        let manufacturer_id = references.manufacturer(db, record.manufacturer).await?;
        let supplier_id = references.supplier(db, record.supplier).await?;

        product::ActiveModel {
            article: Set(record.article.to_string()),
            name: Set(record.name.to_string()),
            unit: Set(record.unit),
            price: Set(record.price),
            discount: Set(record.discount),
            quantity: Set(record.quantity),
            description: Set(record.description.to_string()),
            photo: Set(record.photo),
            category_id: Set(category_id),
            manufacturer_id: Set(manufacturer_id),
            supplier_id: Set(supplier_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        count += 1;
    }

    summary.products = count;
    summary.categories = category::Entity::find().count(db).await?;
    summary.manufacturers = manufacturer::Entity::find().count(db).await?;
    summary.suppliers = supplier::Entity::find().count(db).await?;

    info!("  Imported products: {}", summary.products);
    info!("  Categories: {}", summary.categories);
    info!("  Manufacturers: {}", summary.manufacturers);
    info!("  Suppliers: {}", summary.suppliers);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "Артикул,Наименование товара,Единица измерения,Цена,Поставщик,Производитель,Категория товара,Действующая скидка,Кол-во на складе,Описание товара,Фото";

    fn parse_one(line: &str) -> Option<(String, String, Decimal, Decimal, i32, Option<String>)> {
        let data = format!("{HEADER}\n{line}\n");
        let table = CsvTable::parse_for_tests(&data);
        let row = table.rows().next().unwrap();
        parse_row(&row, &ImportConfig::default()).map(|r| {
            (
                r.article.to_string(),
                r.unit,
                r.price,
                r.discount,
                r.quantity,
                r.photo,
            )
        })
    }

    #[test]
    fn parses_complete_row() {
        let parsed = parse_one(
            "A112T4,Ботинки,шт.,4990,Kari,Kari,Женская обувь,3,6,Женские ботинки,1.jpg",
        )
        .unwrap();
        assert_eq!(parsed.0, "A112T4");
        assert_eq!(parsed.2, dec!(4990));
        assert_eq!(parsed.3, dec!(3));
        assert_eq!(parsed.4, 6);
        assert_eq!(parsed.5.as_deref(), Some("products/1.jpg"));
    }

    #[test]
    fn fills_defaults_for_blank_optional_fields() {
        let parsed = parse_one("F635R4,Туфли,,1200.50,Kari,Marco Tozzi,Женская обувь,,,,").unwrap();
        assert_eq!(parsed.1, "шт.");
        assert_eq!(parsed.2, dec!(1200.50));
        assert_eq!(parsed.3, Decimal::ZERO);
        assert_eq!(parsed.4, 0);
        assert_eq!(parsed.5, None);
    }

    #[test]
    fn accepts_decimal_comma() {
        let parsed = parse_one("H782T5,Кеды,шт.,\"990,5\",Обувь для вас,Рос,Мужская обувь,,,,").unwrap();
        assert_eq!(parsed.2, dec!(990.5));
    }

    #[test]
    fn skips_rows_without_article_or_price() {
        assert!(parse_one(",Ботинки,шт.,4990,Kari,Kari,Женская обувь,,,,").is_none());
        assert!(parse_one("A112T4,Ботинки,шт.,,Kari,Kari,Женская обувь,,,,").is_none());
        assert!(parse_one("   ,Ботинки,шт.,  ,Kari,Kari,Женская обувь,,,,").is_none());
    }

    #[test]
    fn skips_rows_with_malformed_numbers() {
        assert!(parse_one("A1,Ботинки,шт.,дорого,Kari,Kari,Обувь,,,,").is_none());
        assert!(parse_one("A1,Ботинки,шт.,100,Kari,Kari,Обувь,x,,,").is_none());
        assert!(parse_one("A1,Ботинки,шт.,100,Kari,Kari,Обувь,,2.5,,").is_none());
    }

    #[test]
    fn skips_rows_with_out_of_range_amounts() {
        // more decimals than the price column keeps
        assert!(parse_one("A1,Ботинки,шт.,19.999,Kari,Kari,Обувь,,,,").is_none());
        assert!(parse_one("A1,Ботинки,шт.,-5,Kari,Kari,Обувь,,,,").is_none());
        assert!(parse_one("A1,Ботинки,шт.,100,Kari,Kari,Обувь,1000,,,").is_none());
        assert!(parse_one("A1,Ботинки,шт.,100,Kari,Kari,Обувь,2.125,,,").is_none());
        // trailing zeros are not extra precision
        let parsed = parse_one("A1,Ботинки,шт.,100.500,Kari,Kari,Обувь,100,,,").unwrap();
        assert_eq!(parsed.2, dec!(100.5));
        assert_eq!(parsed.3, dec!(100));
    }
}
