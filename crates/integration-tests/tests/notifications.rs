//! Notifications go out after commit, with stock alerts from the
//! pre-decrement stock.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use orchard_core::cart::CartOwner;
use orchard_core::{OrderStatus, StoreSettings};
use orchard_integration_tests::{Sent, Shop, order_request};
use orchard_storefront::db::FailPoint;

#[tokio::test]
async fn test_order_placement_notifies_admin_customer_and_stock() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let (lamp, throw, mug) = shop
        .store
        .seed(|s| {
            (
                s.add_product("Walnut Desk Lamp", Decimal::from(40), 7),
                s.add_product("Linen Throw", Decimal::from(30), 2),
                s.add_product("Stoneware Mug", Decimal::from(12), 50),
            )
        })
        .await;
    shop.fill_cart(&customer, lamp, 3).await;
    shop.fill_cart(&customer, throw, 2).await;
    shop.fill_cart(&customer, mug, 1).await;

    let placed = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(None),
            None,
        )
        .await
        .unwrap();

    let sent = shop.notifier.sent();
    let number = placed.order.order_number;
    assert!(sent.contains(&Sent::AdminNewOrder {
        order_number: number.clone()
    }));
    assert!(sent.contains(&Sent::OrderPlaced {
        email: "sam@orchard.test".to_owned(),
        order_number: number,
    }));
    assert!(sent.contains(&Sent::LowStock {
        product: "Walnut Desk Lamp".to_owned(),
        stock: 4,
    }));
    assert!(sent.contains(&Sent::OutOfStock {
        product: "Linen Throw".to_owned(),
    }));
    assert!(
        !sent
            .iter()
            .any(|s| matches!(s, Sent::LowStock { product, .. } if product == "Stoneware Mug"))
    );
}

#[tokio::test]
async fn test_rolled_back_checkout_sends_nothing() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let product = shop
        .store
        .seed(|s| s.add_product("Linen Throw", Decimal::from(30), 1))
        .await;
    shop.fill_cart(&customer, product, 1).await;
    shop.store
        .seed(|s| s.fail_at(Some(FailPoint::ClearCart)))
        .await;

    let result = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(None),
            None,
        )
        .await;

    assert!(result.is_err());
    assert!(shop.notifier.sent().is_empty());
    shop.store
        .inspect(|s| {
            assert_eq!(s.orders().count(), 0);
            assert_eq!(s.product(product).unwrap().stock, 1);
        })
        .await;
}

#[tokio::test]
async fn test_status_change_notifies_customer() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let admin = shop.admin().await;
    let product = shop
        .store
        .seed(|s| s.add_product("Stoneware Mug", Decimal::from(12), 50))
        .await;
    shop.fill_cart(&customer, product, 1).await;
    let order = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(None),
            None,
        )
        .await
        .unwrap()
        .order;

    shop.state
        .payments()
        .confirm_payment(order.id, &admin)
        .await
        .unwrap();
    shop.state
        .payments()
        .update_order_status(order.id, OrderStatus::OrderComplete, &admin)
        .await
        .unwrap();

    let statuses: Vec<OrderStatus> = shop
        .notifier
        .sent()
        .into_iter()
        .filter_map(|s| match s {
            Sent::StatusChanged { status, .. } => Some(status),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![OrderStatus::PaymentComplete, OrderStatus::OrderComplete]
    );
}
