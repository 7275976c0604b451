//! Newtype IDs for type-safe entity references.
//!
//! Every table in the store is keyed by a `SERIAL` integer. Wrapping each key in
//! its own type keeps an `OrderId` from being passed where a `ProductId` is
//! expected.

/// Macro to define a type-safe ID wrapper around an `i32` primary key.
///
/// The generated type is `Copy`, ordered, hashable, serializes transparently
/// and, with the `postgres` feature, binds directly as an `INTEGER` column.
///
/// # Example
///
/// ```rust
/// # use orchard_core::define_id;
/// define_id!(WidgetId);
///
/// let id = WidgetId::new(7);
/// assert_eq!(id.as_i32(), 7);
/// assert_eq!("7".parse::<WidgetId>().ok(), Some(id));
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw key.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw key.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Identity
define_id!(UserId);

// Catalog
define_id!(ProductId);
define_id!(VariantId);
define_id!(CategoryId);

// Cart
define_id!(CartId);
define_id!(CartItemId);

// Orders and payments
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(PaymentId);
define_id!(AddressId);

// Discounts and affiliates
define_id!(CouponId);
define_id!(AffiliateId);
define_id!(CommissionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_parse_from_path_segments() {
        assert_eq!("42".parse::<OrderId>().unwrap(), OrderId::new(42));
        assert_eq!(" 9 ".parse::<CouponId>().unwrap(), CouponId::new(9));
        assert!("abc".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&AffiliateId::new(5)).unwrap();
        assert_eq!(json, "5");

        let id: VariantId = serde_json::from_str("12").unwrap();
        assert_eq!(id.as_i32(), 12);
    }

    #[test]
    fn test_ids_order_by_key() {
        let mut ids = vec![CartItemId::new(3), CartItemId::new(1), CartItemId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![CartItemId::new(1), CartItemId::new(2), CartItemId::new(3)]);
    }
}
