mod common;

use assert_matches::assert_matches;
use rstest::rstest;
use shop_import::{
    auth::{AuthService, Permission, Role},
    entities::OrderStatus,
    services::orders::{OrderLine, OrderService},
    ServiceError,
};

use common::{fast_hasher, TestEnv};

#[rstest]
#[case(Role::Guest)]
#[case(Role::Client)]
#[tokio::test]
async fn order_list_requires_view_orders(#[case] role: Role) {
    let env = TestEnv::new().await;
    env.importer().run().await.unwrap();

    let result = OrderService::new(env.db.clone()).list_orders(role).await;

    assert_matches!(result, Err(ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn orders_are_listed_newest_first_with_items() {
    let env = TestEnv::new().await;
    env.importer().run().await.unwrap();

    let orders = OrderService::new(env.db.clone())
        .list_orders(Role::Manager)
        .await
        .unwrap();

    let numbers: Vec<i32> = orders.iter().map(|o| o.order_number).collect();
    assert_eq!(numbers, vec![3, 1, 5, 4, 2]);

    let first = &orders[1];
    assert_eq!(first.status, OrderStatus::Completed);
    assert_eq!(first.pickup_code, 901);
    assert_eq!(
        first.delivery_address.as_deref(),
        Some("125061, г. Лесной, ул. Подгорная, 8")
    );
    assert_eq!(
        first.items,
        vec![
            OrderLine {
                article: "A112T4".to_string(),
                quantity: 2
            },
            OrderLine {
                article: "F635R4".to_string(),
                quantity: 2
            },
        ]
    );

    let blank = &orders[2];
    assert!(blank.items.is_empty());
    assert_eq!(blank.delivery_address, None);
}

#[tokio::test]
async fn imported_users_can_log_in() {
    let env = TestEnv::new().await;
    env.importer().run().await.unwrap();
    let auth = AuthService::new(env.db.clone()).with_hasher(fast_hasher());

    let admin = auth
        .authenticate("94d5ous@gmail.com", "uzWC67")
        .await
        .unwrap()
        .expect("admin credentials are valid");
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(admin.full_name, "Никифорова Весения Николаевна");
    assert!(admin.is_superuser);
    assert!(admin.role.has_permission(Permission::ManageProducts));

    let client = auth
        .authenticate("yzls62@outlook.com", "JlFRCZ")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.role, Role::Client);
    assert!(!client.role.has_permission(Permission::ViewOrders));
}

#[tokio::test]
async fn wrong_password_or_unknown_user_is_rejected() {
    let env = TestEnv::new().await;
    env.importer().run().await.unwrap();
    let auth = AuthService::new(env.db.clone()).with_hasher(fast_hasher());

    assert!(auth
        .authenticate("uth4iz@mail.com", "wrong")
        .await
        .unwrap()
        .is_none());
    assert!(auth
        .authenticate("nobody@mail.com", "2L6KZG")
        .await
        .unwrap()
        .is_none());
    // skipped row: no password
    assert!(auth
        .authenticate("nopass@mail.com", "")
        .await
        .unwrap()
        .is_none());
}
