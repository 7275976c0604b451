//! Stock and coupon limits hold when many shoppers check out at once.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use tokio::task::JoinSet;

use orchard_core::cart::CartOwner;
use orchard_core::StoreSettings;
use orchard_integration_tests::{Shop, order_request, percent_coupon};
use orchard_storefront::services::{CheckoutError, PlacedOrder};

/// Every customer checks out at the same time; results in completion order.
async fn race(
    shop: &Shop,
    customers: Vec<orchard_storefront::models::CurrentUser>,
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
    let shop = Shop::new(StoreSettings::default());
    let product = shop
        .store
        .seed(|s| s.add_product("Walnut Desk Lamp", Decimal::from(40), 5))
        .await;

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

    shop.store
        .inspect(|s| {
            let sold: i32 = s
                .orders()
                .flat_map(|order| s.items_of_order(order.id))
                .map(|item| item.quantity)
                .sum();
            assert_eq!(sold, 4);
            assert_eq!(s.product(product).unwrap().stock, 1);
            assert_eq!(s.orders().count(), 2);
            assert_eq!(s.payments().count(), 2);
        })
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_redemptions_respect_max_uses() {
    let shop = Shop::new(StoreSettings::default());
    let (product, coupon) = shop
        .store
        .seed(|s| {
            let coupon = s.add_coupon(percent_coupon("FIRST3", 15, Some(3)));
            (s.add_product("Linen Throw", Decimal::from(30), 100), coupon)
        })
        .await;

    let mut customers = Vec::new();
    for n in 0..8 {
        let customer = shop.customer(&format!("shopper{n}@orchard.test")).await;
        shop.fill_cart(&customer, product, 1).await;
        customers.push(customer);
    }

    let results = race(&shop, customers, Some("FIRST3")).await;

    let redeemed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(redeemed, 3);
    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(err, CheckoutError::CouponUnavailable(_)),
                "unexpected error: {err}"
            );
        }
    }

    shop.store
        .inspect(|s| {
            assert_eq!(s.coupon(coupon).unwrap().used_count, 3);
            assert_eq!(
                s.orders().filter(|o| o.coupon_id == Some(coupon)).count(),
                3
            );
            assert_eq!(s.product(product).unwrap().stock, 97);
        })
        .await;
}
