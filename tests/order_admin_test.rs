mod common;

use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use rstest::rstest;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use shop_import::{
    auth::Role,
    entities::{delivery_point, order, order_item, OrderStatus},
    services::orders::{OrderInput, OrderLine, OrderService},
    ServiceError,
};

use common::TestEnv;

async fn imported() -> (TestEnv, OrderService) {
    let env = TestEnv::new().await;
    env.importer().run().await.unwrap();
    let service = OrderService::new(env.db.clone());
    (env, service)
}

fn line(article: &str, quantity: i32) -> OrderLine {
    OrderLine {
        article: article.to_string(),
        quantity,
    }
}

fn new_order(items: Vec<OrderLine>) -> OrderInput {
    OrderInput {
        order_number: 8,
        order_date: Utc.with_ymd_and_hms(2025, 3, 30, 10, 0, 0).unwrap(),
        delivery_date: Utc.with_ymd_and_hms(2025, 4, 30, 0, 0, 0).unwrap(),
        delivery_point_id: None,
        customer_name: "Михайлюк Анна Вячеславовна".to_string(),
        pickup_code: 908,
        status: OrderStatus::Pending,
        items,
    }
}

async fn first_point(env: &TestEnv) -> delivery_point::Model {
    delivery_point::Entity::find()
        .order_by_asc(delivery_point::Column::Id)
        .one(&*env.db)
        .await
        .unwrap()
        .unwrap()
}

async fn order_id(env: &TestEnv, number: i32) -> i32 {
    order::Entity::find()
        .filter(order::Column::OrderNumber.eq(number))
        .one(&*env.db)
        .await
        .unwrap()
        .unwrap()
        .id
}

#[rstest]
#[case(Role::Manager)]
#[case(Role::Client)]
#[case(Role::Guest)]
#[tokio::test]
async fn only_admins_manage_orders(#[case] role: Role) {
    let (env, orders) = imported().await;
    let id = order_id(&env, 1).await;

    assert_matches!(
        orders.create_order(role, new_order(Vec::new())).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        orders.update_order(role, id, new_order(Vec::new())).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(orders.delete_order(role, id).await, Err(ServiceError::Forbidden(_)));
    assert_eq!(order::Entity::find().count(&*env.db).await.unwrap(), 5);
}

#[tokio::test]
async fn create_stores_header_point_and_lines() {
    let (env, orders) = imported().await;
    let point = first_point(&env).await;
    let mut input = new_order(vec![line("K345R4", 1), line("A112T4", 3)]);
    input.delivery_point_id = Some(point.id);

    let view = orders.create_order(Role::Admin, input).await.unwrap();

    assert_eq!(view.order_number, 8);
    assert_eq!(view.delivery_address.as_deref(), Some(point.address.as_str()));
    assert_eq!(view.items, vec![line("K345R4", 1), line("A112T4", 3)]);
    assert_eq!(order_item::Entity::find().count(&*env.db).await.unwrap(), 8);

    let listed = orders.list_orders(Role::Manager).await.unwrap();
    assert_eq!(listed[0].id, view.id);
}

#[tokio::test]
async fn create_with_unknown_article_or_point_leaves_nothing_behind() {
    let (env, orders) = imported().await;

    let unknown_article = new_order(vec![line("A112T4", 1), line("NOPE", 1)]);
    assert_matches!(
        orders.create_order(Role::Admin, unknown_article).await,
        Err(ServiceError::NotFound(_))
    );

    let mut unknown_point = new_order(Vec::new());
    unknown_point.delivery_point_id = Some(999);
    assert_matches!(
        orders.create_order(Role::Admin, unknown_point).await,
        Err(ServiceError::NotFound(_))
    );

    assert_eq!(order::Entity::find().count(&*env.db).await.unwrap(), 5);
    assert_eq!(order_item::Entity::find().count(&*env.db).await.unwrap(), 6);
}

#[tokio::test]
async fn create_rejects_non_positive_quantity() {
    let (_env, orders) = imported().await;

    let result = orders
        .create_order(Role::Admin, new_order(vec![line("A112T4", 0)]))
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn update_replaces_header_and_lines() {
    let (env, orders) = imported().await;
    let id = order_id(&env, 1).await;
    let mut input = new_order(vec![line("H782T5", 4)]);
    input.order_number = 1;
    input.status = OrderStatus::Cancelled;

    let view = orders.update_order(Role::Admin, id, input).await.unwrap();

    assert_eq!(view.id, id);
    assert_eq!(view.status, OrderStatus::Cancelled);
    assert_eq!(view.delivery_address, None);
    assert_eq!(view.items, vec![line("H782T5", 4)]);
    // order 1 had two lines, now one
    assert_eq!(order_item::Entity::find().count(&*env.db).await.unwrap(), 5);
}

#[tokio::test]
async fn update_with_unknown_article_keeps_previous_lines() {
    let (env, orders) = imported().await;
    let id = order_id(&env, 1).await;

    let result = orders
        .update_order(Role::Admin, id, new_order(vec![line("NOPE", 1)]))
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(_)));
    let kept = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(id))
        .count(&*env.db)
        .await
        .unwrap();
    assert_eq!(kept, 2);
    let header = order::Entity::find_by_id(id)
        .one(&*env.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.pickup_code, 901);
}

#[tokio::test]
async fn delete_removes_order_and_its_lines() {
    let (env, orders) = imported().await;
    let id = order_id(&env, 1).await;

    orders.delete_order(Role::Admin, id).await.unwrap();

    assert!(order::Entity::find_by_id(id)
        .one(&*env.db)
        .await
        .unwrap()
        .is_none());
    let orphaned = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(id))
        .count(&*env.db)
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
    assert_eq!(order_item::Entity::find().count(&*env.db).await.unwrap(), 4);

    assert_matches!(
        orders.delete_order(Role::Admin, id).await,
        Err(ServiceError::NotFound(_))
    );
}
