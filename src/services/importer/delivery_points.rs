use std::path::Path;

use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use tracing::info;

use super::csv_source::CsvTable;
use super::summary::ImportSummary;
use crate::entities::delivery_point;
use crate::errors::ServiceError;

/// Imports the headerless delivery point list. Row order is significant:
/// orders refer to points by their 1-based position in this file.
pub async fn import_delivery_points<C: ConnectionTrait>(
    db: &C,
    path: &Path,
    summary: &mut ImportSummary,
) -> Result<(), ServiceError> {
    let table = CsvTable::read_headerless(path).await?;

    let mut count = 0u64;
    for address in table.first_column() {
        delivery_point::ActiveModel {
            address: Set(address.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        count += 1;
    }

    summary.delivery_points = count;
    info!("  Imported delivery points: {}", count);

    Ok(())
}

/// Ids of every delivery point in insertion order, i.e. file order.
pub async fn ordered_ids<C: ConnectionTrait>(db: &C) -> Result<Vec<i32>, ServiceError> {
    let ids = delivery_point::Entity::find()
        .select_only()
        .column(delivery_point::Column::Id)
        .order_by_asc(delivery_point::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?;
    Ok(ids)
}

/// Resolves a 1-based position against `ordered`. Blank, non-numeric, zero
/// and out-of-range positions resolve to no point.
pub fn resolve_position(ordered: &[i32], raw: &str) -> Option<i32> {
    let position = raw.trim().parse::<usize>().ok()?;
    let index = position.checked_sub(1)?;
    ordered.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const IDS: [i32; 3] = [40, 41, 57];

    #[rstest]
    #[case("1", Some(40))]
    #[case("2", Some(41))]
    #[case(" 3 ", Some(57))]
    #[case("0", None)]
    #[case("4", None)]
    #[case("99", None)]
    #[case("-1", None)]
    #[case("abc", None)]
    #[case("", None)]
    fn resolves_positions_not_ids(#[case] raw: &str, #[case] expected: Option<i32>) {
        assert_eq!(resolve_position(&IDS, raw), expected);
    }

    #[test]
    fn empty_list_resolves_nothing() {
        assert_eq!(resolve_position(&[], "1"), None);
    }
}
