//! Storage tests against a real `PostgreSQL` database.
//!
//! These tests require `DATABASE_URL` pointing at a scratch database; the
//! migrations are applied on connect. Run with:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/rockland_test cargo test -p rockland-api -- --ignored
//! ```

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use rockland_api::db::{AccountStore, OrderStore, PgStorage, RepositoryError};
use rockland_api::models::{NewAccount, NewOrderDetail, NewUserOrder, ShippingAddress};
use rockland_core::{Amount, Email, OrderStatus, ProductId, ShippingOptionId};

async fn storage() -> PgStorage {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    PgStorage::new(pool)
}

fn new_account(tag: &str) -> NewAccount {
    NewAccount {
        username: format!("user-{tag}"),
        email: Email::parse(&format!("{tag}@example.com")).unwrap(),
        first_name: "A".to_string(),
        middle_name: None,
        last_name: "B".to_string(),
        suffix: None,
        address1: "1 Main".to_string(),
        address2: None,
        city: "X".to_string(),
        state: "NY".to_string(),
        postal_code: "10001".to_string(),
        time_zone_id: "UTC".to_string(),
        opt_in_account_notices: false,
        opt_in_product_notices: false,
    }
}

async fn seed_catalog(pool: &PgPool) -> (ShippingOptionId, ProductId) {
    let option: i32 = sqlx::query_scalar(
        "INSERT INTO shipping_option (type, description, amount) VALUES ('Ground', 'slow', $1) RETURNING id",
    )
    .bind(Decimal::new(1000, 2))
    .fetch_one(pool)
    .await
    .unwrap();
    let product: i32 = sqlx::query_scalar(
        "INSERT INTO product (name, description, price) VALUES ('Widget', 'w', $1) RETURNING id",
    )
    .bind(Decimal::new(5000, 2))
    .fetch_one(pool)
    .await
    .unwrap();
    (ShippingOptionId::new(option), ProductId::new(product))
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_dropped_registration_rolls_back() {
    let storage = storage().await;
    let tag = Uuid::new_v4().simple().to_string();

    let pending = storage
        .begin_registration(new_account(&tag), "hash".to_string())
        .await
        .unwrap();
    drop(pending);

    assert!(storage.find_by_username(&format!("user-{tag}")).await.unwrap().is_none());

    let pending = storage
        .begin_registration(new_account(&tag), "hash".to_string())
        .await
        .unwrap();
    let account = pending.commit().await.unwrap();

    let duplicate = storage
        .begin_registration(new_account(&tag), "hash".to_string())
        .await;
    assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

    assert!(storage.confirm_email(account.id).await.unwrap());
    assert!(!storage.confirm_email(account.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_order_round_trip_and_rollback() {
    let storage = storage().await;
    let tag = Uuid::new_v4().simple().to_string();
    let account = storage
        .begin_registration(new_account(&tag), "hash".to_string())
        .await
        .unwrap()
        .commit()
        .await
        .unwrap();
    let (shipping_option_id, product_id) = seed_catalog(storage.pool()).await;

    let order = |product_id| NewUserOrder {
        account_id: account.id,
        shipping_option_id,
        details: vec![NewOrderDetail {
            product_id,
            quantity: 2,
            total_price: Amount::from_cents(10_000),
        }],
        purchase_order_pdf: b"%PDF-1.4".to_vec(),
        order_total: Amount::from_cents(11_000),
        shipping_address: ShippingAddress {
            address1: "1 Main".to_string(),
            address2: None,
            city: "X".to_string(),
            state: "NY".to_string(),
            postal_code: "10001".to_string(),
        },
        order_date: Utc::now(),
        status: OrderStatus::New,
    };

    let stored = storage.insert_order(order(product_id)).await.unwrap();
    let loaded = storage.order(stored.id).await.unwrap().unwrap();
    assert_eq!(loaded.details.len(), 1);
    assert_eq!(loaded.order_total, Amount::from_cents(11_000));
    assert_eq!(loaded.purchase_order_pdf, b"%PDF-1.4");

    // A detail referencing a missing product fails the foreign key and
    // takes the parent row with it.
    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_order WHERE account_id = $1")
        .bind(account.id)
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert!(storage.insert_order(order(ProductId::new(i32::MAX))).await.is_err());
    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_order WHERE account_id = $1")
        .bind(account.id)
        .fetch_one(storage.pool())
        .await
        .unwrap();
    assert_eq!(before, after);
}
