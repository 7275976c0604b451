//! Orders, their frozen items, and payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use orchard_core::pricing::OrderTotals;
use orchard_core::{
    AddressId, AffiliateId, CouponId, OrderId, OrderItemId, OrderStatus, PaymentId,
    PaymentMethod, PaymentStatus, ProductId, ShippingAddress, UserId, VariantId,
};

/// Contact details for a customer, used for notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Customer {
    pub id: UserId,
    pub email: String,
    pub name: String,
}

/// A placed order.
///
/// Money fields are a snapshot taken at placement; only `status` and
/// `admin_notes` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
    pub affiliate_id: Option<AffiliateId>,
    pub coupon_id: Option<CouponId>,
    pub applied_code: Option<String>,
    pub address_id: AddressId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of an order, copied from the catalog at placement time.
///
/// `product_id` becomes `None` if the product is later deleted; the copied
/// name, sku and price stay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Order to insert, with its items.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub totals: OrderTotals,
    pub affiliate_id: Option<AffiliateId>,
    pub coupon_id: Option<CouponId>,
    pub applied_code: Option<String>,
    pub address_id: AddressId,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub sku: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// The single payment record of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: Decimal,
    pub transaction_ref: Option<String>,
    pub confirmed_by: Option<UserId>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
