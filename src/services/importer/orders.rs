use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Set};
use tracing::{debug, info, warn};

use super::csv_source::{CsvTable, Row};
use super::delivery_points::{ordered_ids, resolve_position};
use super::line_items::parse_line_items;
use super::summary::{ImportSummary, UnresolvedArticle};
use crate::entities::{order, order_item, product, OrderStatus};
use crate::errors::ServiceError;

pub const ORDER_NUMBER: &str = "Номер заказа";
pub const LINE_ITEMS: &str = "Артикул заказа";
pub const ORDER_DATE: &str = "Дата заказа";
pub const DELIVERY_DATE: &str = "Дата доставки";
pub const DELIVERY_POINT: &str = "Адрес пункта выдачи";
pub const CUSTOMER: &str = "ФИО авторизированного клиента";
pub const PICKUP_CODE: &str = "Код для получения";
pub const STATUS: &str = "Статус заказа";

const REQUIRED: &[&str] = &[ORDER_NUMBER, ORDER_DATE, DELIVERY_DATE, DELIVERY_POINT];

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Order header fields of one row, before the delivery point is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderRecord<'a> {
    pub order_number: i32,
    pub order_date: DateTime<Utc>,
    pub delivery_date: DateTime<Utc>,
    pub delivery_point: &'a str,
    pub customer_name: &'a str,
    pub pickup_code: i32,
    pub status: OrderStatus,
    pub line_items: &'a str,
}

/// `None` when the row is skipped: number or order date blank, either
/// timestamp unparseable, or a non-integer number or pickup code.
pub(crate) fn parse_row<'a>(row: &Row<'a>) -> Option<OrderRecord<'a>> {
    let raw_number = row.get(ORDER_NUMBER)?;
    let raw_order_date = row.get(ORDER_DATE)?;

    let order_number = raw_number.parse::<i32>().ok()?;
    let order_date = parse_timestamp(raw_order_date)?;
    let delivery_date = parse_timestamp(row.text(DELIVERY_DATE))?;
    let pickup_code = match row.get(PICKUP_CODE) {
        Some(raw) => raw.parse::<i32>().ok()?,
        None => 0,
    };

    Some(OrderRecord {
        order_number,
        order_date,
        delivery_date,
        delivery_point: row.text(DELIVERY_POINT),
        customer_name: row.text(CUSTOMER),
        pickup_code,
        status: OrderStatus::from_label(row.text(STATUS)),
        line_items: row.text(LINE_ITEMS),
    })
}

/// Parses `2025-02-27 00:00:00` as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Imports orders and their line items. Must run after products and
/// delivery points.
pub async fn import_orders<C: ConnectionTrait>(
    db: &C,
    path: &Path,
    summary: &mut ImportSummary,
) -> Result<(), ServiceError> {
    let table = CsvTable::read_with_headers(path).await?;
    table.require_columns(REQUIRED)?;

    let points = ordered_ids(db).await?;
    let articles = article_index(db).await?;

    let mut count = 0u64;
    for row in table.rows() {
        let Some(record) = parse_row(&row) else {
            debug!(line = row.line(), "skipping order row");
            summary.skipped_orders += 1;
            continue;
        };

        let delivery_point_id = resolve_position(&points, record.delivery_point);
        if delivery_point_id.is_none() && !record.delivery_point.is_empty() {
            debug!(
                order_number = record.order_number,
                position = record.delivery_point,
                "delivery point position does not resolve"
            );
        }

        let created = order::ActiveModel {
            order_number: Set(record.order_number),
            order_date: Set(record.order_date),
            delivery_date: Set(record.delivery_date),
            delivery_point_id: Set(delivery_point_id),
            customer_name: Set(record.customer_name.to_string()),
            pickup_code: Set(record.pickup_code),
            status: Set(record.status),
            ..Default::default()
        }
        .insert(db)
        .await?;
        count += 1;

        let parsed = parse_line_items(record.line_items);
        summary.skipped_line_items += parsed.invalid_quantities as u64;

        for item in parsed.items {
            let Some(&product_id) = articles.get(&item.article) else {
                warn!("Product {} not found for order {}", item.article, record.order_number);
                summary.unresolved_articles.push(UnresolvedArticle {
                    order_number: record.order_number,
                    article: item.article,
                });
                continue;
            };

            order_item::ActiveModel {
                order_id: Set(created.id),
                product_id: Set(product_id),
                quantity: Set(item.quantity),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    summary.orders = count;
    summary.order_items = order_item::Entity::find().count(db).await?;

    info!("  Imported orders: {}", summary.orders);
    info!("  Order items: {}", summary.order_items);

    Ok(())
}

async fn article_index<C: ConnectionTrait>(db: &C) -> Result<HashMap<String, i32>, ServiceError> {
    let pairs = product::Entity::find()
        .select_only()
        .column(product::Column::Article)
        .column(product::Column::Id)
        .into_tuple::<(String, i32)>()
        .all(db)
        .await?;
    Ok(pairs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const HEADER: &str = "Номер заказа,Артикул заказа,Дата заказа,Дата доставки,Адрес пункта выдачи,ФИО авторизированного клиента,Код для получения,Статус заказа";

    fn parse_one(line: &str) -> Option<(i32, i32, OrderStatus, String, String)> {
        let data = format!("{HEADER}\n{line}\n");
        let table = CsvTable::parse_for_tests(&data);
        let row = table.rows().next().unwrap();
        parse_row(&row).map(|r| {
            (
                r.order_number,
                r.pickup_code,
                r.status,
                r.delivery_point.to_string(),
                r.line_items.to_string(),
            )
        })
    }

    #[test]
    fn parses_timestamp_as_utc() {
        let ts = parse_timestamp("2025-02-27 14:30:05").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2025, 2, 27));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 30, 5));
    }

    #[test]
    fn rejects_other_timestamp_shapes() {
        assert!(parse_timestamp("27.02.2025").is_none());
        assert!(parse_timestamp("2025-02-27").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn parses_complete_row() {
        let parsed = parse_one(
            "1,\"A112T4, 2, F635R4, 2\",2025-02-27 00:00:00,2025-04-20 00:00:00,25,Степанов Михаил Артёмович,901,Завершен",
        )
        .unwrap();
        assert_eq!(parsed.0, 1);
        assert_eq!(parsed.1, 901);
        assert_eq!(parsed.2, OrderStatus::Completed);
        assert_eq!(parsed.3, "25");
        assert_eq!(parsed.4, "A112T4, 2, F635R4, 2");
    }

    #[test]
    fn blank_pickup_code_and_status_take_defaults() {
        let parsed = parse_one("7,,2025-02-27 00:00:00,2025-04-20 00:00:00,,,,").unwrap();
        assert_eq!(parsed.1, 0);
        assert_eq!(parsed.2, OrderStatus::Pending);
        assert_eq!(parsed.4, "");
    }

    #[test]
    fn skips_malformed_rows() {
        // blank number
        assert!(parse_one(",A1,2025-02-27 00:00:00,2025-04-20 00:00:00,1,X,1,Новый").is_none());
        // blank order date
        assert!(parse_one("1,A1,,2025-04-20 00:00:00,1,X,1,Новый").is_none());
        // bad delivery date
        assert!(parse_one("1,A1,2025-02-27 00:00:00,20.04.2025,1,X,1,Новый").is_none());
        // non-integer number and pickup code
        assert!(parse_one("1a,A1,2025-02-27 00:00:00,2025-04-20 00:00:00,1,X,1,Новый").is_none());
        assert!(parse_one("1,A1,2025-02-27 00:00:00,2025-04-20 00:00:00,1,X,код,Новый").is_none());
    }
}
