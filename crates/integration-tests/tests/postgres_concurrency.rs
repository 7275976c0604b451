//! Stock, coupon and cart limits hold under concurrent checkouts on `PostgreSQL`.
//!
//! Each test runs against its own database and returns early when
//! `DATABASE_URL` is unset.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinSet;

use orchard_core::cart::CartOwner;
use orchard_integration_tests::order_request;
use orchard_integration_tests::postgres::PgShop;
use orchard_storefront::models::CurrentUser;
use orchard_storefront::services::{CheckoutError, PlacedOrder};

/// Every customer checks out at the same time; results in completion order.
async fn race(
    shop: &PgShop,
    customers: Vec<CurrentUser>,
    code: Option<&'static str>,
) -> Vec<Result<PlacedOrder, CheckoutError>> {
    let mut tasks = JoinSet::new();
    for customer in customers {
        let checkout = shop.state.checkout().clone();
        tasks.spawn(async move {
            checkout
                .place_order(
                    &customer,
                    &CartOwner::User(customer.id),
                    order_request(code),
                    None,
                )
                .await
        });
    }
    tasks.join_all().await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checkouts_never_oversell() {
    let Some(shop) = PgShop::connect().await else {
        return;
    };
    let product = shop.product("Walnut Desk Lamp", Decimal::from(40), 5).await;

    let mut customers = Vec::new();
    for n in 0..6 {
        let customer = shop.customer(&format!("shopper{n}@orchard.test")).await;
        shop.fill_cart(&customer, product, 2).await;
        customers.push(customer);
    }

    let results = race(&shop, customers, None).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, CheckoutError::InsufficientStock { .. }),
                "unexpected error: {err}"
            );
        }
    }
    assert_eq!(shop.stock(product).await, 1);
    assert_eq!(shop.orders_and_payments().await, (2, 2));

    shop.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemptions_respect_max_uses() {
    let Some(shop) = PgShop::connect().await else {
        return;
    };
    shop.percent_coupon("FIRST3", 15, Some(3)).await;
    let product = shop.product("Linen Throw", Decimal::from(30), 100).await;

    let mut customers = Vec::new();
    for n in 0..8 {
        let customer = shop.customer(&format!("shopper{n}@orchard.test")).await;
        shop.fill_cart(&customer, product, 1).await;
        customers.push(customer);
    }

    let results = race(&shop, customers, Some("FIRST3")).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, CheckoutError::CouponUnavailable(_)),
                "unexpected error: {err}"
            );
        }
    }
    assert_eq!(shop.coupon_uses("FIRST3").await, 3);
    assert_eq!(shop.stock(product).await, 97);
    assert_eq!(shop.orders_and_payments().await, (3, 3));

    shop.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_submit_places_one_order() {
    let Some(shop) = PgShop::connect().await else {
        return;
    };
    let product = shop.product("Oak Shelf", Decimal::from(25), 10).await;
    let customer = shop.customer("shopper@orchard.test").await;
    shop.fill_cart(&customer, product, 2).await;

    // Hold the product row so both submissions are in flight together.
    let mut blocker = shop.pool.begin().await.unwrap();
    sqlx::query("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
        .bind(product.as_i32())
        .execute(&mut *blocker)
        .await
        .unwrap();

    let mut submissions = JoinSet::new();
    for _ in 0..2 {
        let checkout = shop.state.checkout().clone();
        let customer = customer.clone();
        submissions.spawn(async move {
            checkout
                .place_order(
                    &customer,
                    &CartOwner::User(customer.id),
                    order_request(None),
                    None,
                )
                .await
        });
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    blocker.commit().await.unwrap();
    let results = submissions.join_all().await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(CheckoutError::EmptyCart))),
        "unexpected results: {results:?}"
    );
    assert_eq!(shop.stock(product).await, 8);
    assert_eq!(shop.orders_and_payments().await, (1, 1));

    shop.close().await;
}
